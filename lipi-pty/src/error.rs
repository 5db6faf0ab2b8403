//! Error type for PTY operations.
//!
//! Only the PTY lifecycle can fail for real: everything downstream of a
//! successful spawn recovers locally. Spawn errors are fatal and surface
//! to the host.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("failed to open PTY master: {0}")]
    OpenMaster(#[source] io::Error),

    #[error("failed to prepare PTY slave: {0}")]
    PrepareSlave(#[source] io::Error),

    #[error("failed to fork child process: {0}")]
    Fork(#[source] nix::Error),

    #[error("failed to set PTY window size: {0}")]
    WindowSize(#[source] io::Error),

    #[error("invalid shell command {0:?}")]
    BadCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
