//! Spawns and streams the `cvs log`/`cvs rlog` subprocess, and detects
//! whether the current directory is a CVS working copy.

mod error;
mod process;
mod sandbox;

pub use error::Error;
pub use process::{build_args, LogProcess};
pub use sandbox::{detect as detect_sandbox, Sandbox};
