//! PTY window size plumbing.

use std::os::unix::io::RawFd;

/// Terminal dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    pub rows: u16,
    pub cols: u16,
}

impl PtySize {
    pub fn new(rows: u16, cols: u16) -> Self {
        PtySize { rows, cols }
    }

    /// Set this size on a PTY master via TIOCSWINSZ
    pub fn apply_to(&self, fd: RawFd) -> std::io::Result<()> {
        let ws = libc::winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        if unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &ws) } == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Read the current size from a PTY master via TIOCGWINSZ
    pub fn read_from(fd: RawFd) -> std::io::Result<Self> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) } == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(PtySize {
                rows: ws.ws_row,
                cols: ws.ws_col,
            })
        }
    }
}

impl Default for PtySize {
    fn default() -> Self {
        PtySize::new(24, 80)
    }
}
