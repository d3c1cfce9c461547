//! Persists accumulated [`cvsps_log::LogEntry`] records to `~/.pycvsps`
//! between invocations, so repeated runs only fetch the CVS log tail that
//! has grown since the last one.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use cvsps_log::LogEntry;

mod error;
mod filename;
mod merge;

pub use error::Error;
pub use filename::cache_filename;
pub use merge::{merge, CacheMode};

/// A resolved cache file location.
pub struct Cache {
    path: PathBuf,
}

impl Cache {
    /// Resolves the cache file for a `(root, directory)` pair under
    /// `~/.pycvsps`, creating the directory if it doesn't exist yet.
    pub fn resolve(root: &str, directory: &str) -> Result<Self, Error> {
        let dir = dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".pycvsps");
        std::fs::create_dir_all(&dir).map_err(Error::CreateDir)?;
        Ok(Self { path: dir.join(cache_filename(root, directory)) })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the cached entries, or an empty log if no cache file exists yet.
    pub fn load(&self) -> Result<Vec<LogEntry>, Error> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(Error::Open)?;
        bincode::deserialize_from(file).map_err(Error::Deserialize)
    }

    pub fn save(&self, entries: &[LogEntry]) -> Result<(), Error> {
        let file = File::create(&self.path).map_err(Error::Open)?;
        bincode::serialize_into(BufWriter::new(file), entries).map_err(Error::Serialize)
    }
}
