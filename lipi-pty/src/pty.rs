//! PTY master management.
//!
//! Opens a master/slave pair with `posix_openpt` and exposes the host
//! side of the adapter contract: a short-timeout `poll_output` that never
//! blocks the frame loop, writes for keystrokes and reports, and window
//! size changes.

use std::ffi::CStr;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use nix::poll::{poll, PollFd, PollFlags};

use crate::size::PtySize;

/// The sentinel byte surfaced to the terminal when the shell side is gone
pub const EOT: u8 = 0x04;

/// How long one output poll may block, in milliseconds
const POLL_TIMEOUT_MS: i32 = 10;

/// A PTY master file descriptor
#[derive(Debug)]
pub struct Pty {
    master: File,
    slave_path: String,
}

impl Pty {
    /// Open a new PTY master
    pub fn open() -> io::Result<Self> {
        let master_fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        if master_fd < 0 {
            return Err(io::Error::last_os_error());
        }

        if unsafe { libc::grantpt(master_fd) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(master_fd) };
            return Err(err);
        }

        if unsafe { libc::unlockpt(master_fd) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(master_fd) };
            return Err(err);
        }

        let slave_path = unsafe {
            let ptr = libc::ptsname(master_fd);
            if ptr.is_null() {
                let err = io::Error::last_os_error();
                libc::close(master_fd);
                return Err(err);
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        };

        let master = unsafe { File::from_raw_fd(master_fd) };
        Ok(Pty { master, slave_path })
    }

    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    pub fn slave_path(&self) -> &str {
        &self.slave_path
    }

    /// Open the slave device (used by the forked child)
    pub fn open_slave(&self) -> io::Result<File> {
        use std::os::unix::fs::OpenOptionsExt;
        std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&self.slave_path)
    }

    pub fn set_size(&self, size: PtySize) -> io::Result<()> {
        size.apply_to(self.master_fd())
    }

    pub fn get_size(&self) -> io::Result<PtySize> {
        PtySize::read_from(self.master_fd())
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        let fd = self.master_fd();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let new_flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        if unsafe { libc::fcntl(fd, libc::F_SETFL, new_flags) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Poll the master for shell output.
    ///
    /// Returns an empty chunk when no data arrived within the timeout, and
    /// the single EOT byte once the slave side has closed (EIO or HUP), so
    /// the terminal can shut down.
    pub fn poll_output(&mut self) -> io::Result<Vec<u8>> {
        let revents = {
            let mut fds = [PollFd::new(&self.master, PollFlags::POLLIN)];
            match poll(&mut fds, POLL_TIMEOUT_MS) {
                Ok(0) => return Ok(Vec::new()),
                Ok(_) => fds[0].revents().unwrap_or(PollFlags::empty()),
                Err(e) => return Err(io::Error::from(e)),
            }
        };

        if revents.contains(PollFlags::POLLIN) {
            let mut buf = [0u8; 4096];
            return match self.master.read(&mut buf) {
                Ok(0) => Ok(vec![EOT]),
                Ok(n) => Ok(buf[..n].to_vec()),
                Err(ref e) if e.raw_os_error() == Some(libc::EIO) => Ok(vec![EOT]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }
        if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
            return Ok(vec![EOT]);
        }
        Ok(Vec::new())
    }

    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.master.write_all(buf)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.master.flush()
    }
}

impl AsRawFd for Pty {
    fn as_raw_fd(&self) -> RawFd {
        self.master_fd()
    }
}

impl Read for Pty {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.master.read(buf)
    }
}

impl Write for Pty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.master.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.master.flush()
    }
}
