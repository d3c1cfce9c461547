use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot determine home directory for cvsps cache")]
    NoHomeDir,

    #[error("cannot create cache directory: {0}")]
    CreateDir(std::io::Error),

    #[error("cannot open cache file: {0}")]
    Open(std::io::Error),

    #[error("cannot read cache file: {0}")]
    Deserialize(bincode::Error),

    #[error("cannot write cache file: {0}")]
    Serialize(bincode::Error),

    #[error("log cache overlaps with new log entries, re-run without cache")]
    Overlap,
}
