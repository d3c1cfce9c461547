use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a CVS sandbox")]
    NotASandbox,

    #[error("error spawning cvs: {0}")]
    Spawn(std::io::Error),

    #[error("error reading cvs output: {0}")]
    Read(std::io::Error),

    #[error("cvs exited with status {0}")]
    ExitStatus(i32),
}
