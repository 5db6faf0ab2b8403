//! lipi PTY management
//!
//! Linux pseudo-terminal plumbing for the terminal emulator:
//! - PTY master/slave pairs via the POSIX APIs
//! - Forking the shell with the slave as its controlling terminal
//! - Short-timeout output polling with an EOT sentinel on shell exit
//! - Window size changes with SIGWINCH delivery

pub mod child;
pub mod error;
pub mod pty;
pub mod size;

pub use child::{Child, ChildBuilder};
pub use error::PtyError;
pub use pty::{Pty, EOT};
pub use size::PtySize;
