use cvsps_log::LogEntry;

use crate::error::Error;

/// Which of the three `-u`/`-x`/(default) cache behaviors is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// `-x`: ignore any existing cache and overwrite it.
    Write,
    /// default: read the cache and trust it, only fetching newer entries.
    Read,
    /// `-u`: read the cache, fetch newer entries, and rewrite it.
    Update,
}

impl CacheMode {
    /// Whether a fresh `cvs log`/`rlog` invocation should run at all, vs.
    /// trusting the cache entirely.
    pub fn fetches_new_entries(self) -> bool {
        !matches!(self, CacheMode::Read)
    }
}

/// Joins a freshly-fetched `newlog` onto a cached `oldlog`, as `createlog`
/// does when writing the cache back out. Entries in `newlog` are expected to
/// postdate every entry in `oldlog` (since the fetch is itself bounded with
/// `-d>DATE` using the cache's last date): an overlap means the cache and
/// the live CVS history have diverged and must not be silently merged.
pub fn merge(oldlog: Vec<LogEntry>, mut newlog: Vec<LogEntry>) -> Result<Vec<LogEntry>, Error> {
    if newlog.is_empty() {
        return Ok(oldlog);
    }

    newlog.sort_by_key(|e| e.date);

    if let (Some(last_old), Some(first_new)) = (oldlog.last(), newlog.first()) {
        if last_old.date >= first_new.date {
            return Err(Error::Overlap);
        }
    }

    let mut merged = oldlog;
    merged.extend(newlog);
    Ok(merged)
}
