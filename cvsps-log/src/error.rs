use thiserror::Error;

/// Errors surfaced by the log parser: CVS reported an error, or the rlog
/// output was malformed in a way that indicates we're not actually looking
/// at `cvs log`/`cvs rlog` output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct Error(pub String);

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
