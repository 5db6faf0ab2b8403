//! Shell child process attached to a PTY.
//!
//! Forks, creates a session with the PTY slave as the controlling
//! terminal, wires the slave onto stdin/stdout/stderr, and execs the
//! shell. The parent keeps the master side.

use std::ffi::{CStr, CString, OsStr};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, RawFd};

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::PtyError;
use crate::pty::Pty;
use crate::size::PtySize;

/// A child process attached to a PTY
pub struct Child {
    pty: Pty,
    pid: Pid,
}

/// Builder for spawning the shell
pub struct ChildBuilder {
    program: CString,
    args: Vec<CString>,
    env: Vec<CString>,
    cwd: Option<CString>,
    size: PtySize,
}

impl ChildBuilder {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Result<Self, PtyError> {
        let bytes = program.as_ref().as_bytes();
        let program = CString::new(bytes)
            .map_err(|_| PtyError::BadCommand(String::from_utf8_lossy(bytes).into_owned()))?;

        Ok(ChildBuilder {
            program: program.clone(),
            args: vec![program],
            env: Self::inherited_env(),
            cwd: None,
            size: PtySize::default(),
        })
    }

    /// Build for `$SHELL`, falling back to /bin/bash
    pub fn default_shell() -> Result<Self, PtyError> {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());
        Self::new(&shell)
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Result<Self, PtyError> {
        let bytes = arg.as_ref().as_bytes();
        let arg = CString::new(bytes)
            .map_err(|_| PtyError::BadCommand(String::from_utf8_lossy(bytes).into_owned()))?;
        self.args.push(arg);
        Ok(self)
    }

    pub fn current_dir<S: AsRef<OsStr>>(mut self, dir: S) -> Result<Self, PtyError> {
        let bytes = dir.as_ref().as_bytes();
        let dir = CString::new(bytes)
            .map_err(|_| PtyError::BadCommand(String::from_utf8_lossy(bytes).into_owned()))?;
        self.cwd = Some(dir);
        Ok(self)
    }

    pub fn size(mut self, size: PtySize) -> Self {
        self.size = size;
        self
    }

    /// Parent environment with TERM forced to xterm-256color
    fn inherited_env() -> Vec<CString> {
        let mut env = Vec::new();
        for (key, value) in std::env::vars() {
            if key == "TERM" {
                continue;
            }
            if let Ok(var) = CString::new(format!("{}={}", key, value)) {
                env.push(var);
            }
        }
        if let Ok(term) = CString::new("TERM=xterm-256color") {
            env.push(term);
        }
        env
    }

    /// Spawn the shell. Failure here is the one fatal error of the
    /// terminal's lifetime.
    pub fn spawn(self) -> Result<Child, PtyError> {
        let pty = Pty::open().map_err(PtyError::OpenMaster)?;
        pty.set_size(self.size).map_err(PtyError::WindowSize)?;

        match unsafe { unistd::fork() } {
            Ok(ForkResult::Parent { child }) => Ok(Child { pty, pid: child }),
            Ok(ForkResult::Child) => {
                self.exec_child(&pty);
            }
            Err(e) => Err(PtyError::Fork(e)),
        }
    }

    /// Runs in the forked child; never returns
    fn exec_child(&self, pty: &Pty) -> ! {
        if unistd::setsid().is_err() {
            std::process::exit(1);
        }

        let slave = match pty.open_slave() {
            Ok(s) => s,
            Err(_) => std::process::exit(1),
        };
        let slave_fd = slave.as_raw_fd();

        unsafe {
            if libc::ioctl(slave_fd, libc::TIOCSCTTY, 0) < 0 {
                std::process::exit(1);
            }
        }

        if unistd::dup2(slave_fd, libc::STDIN_FILENO).is_err()
            || unistd::dup2(slave_fd, libc::STDOUT_FILENO).is_err()
            || unistd::dup2(slave_fd, libc::STDERR_FILENO).is_err()
        {
            std::process::exit(1);
        }
        if slave_fd > 2 {
            drop(slave);
        }

        if let Some(ref cwd) = self.cwd {
            let _ = unistd::chdir(cwd.as_c_str());
        }

        unsafe {
            for sig in &[
                Signal::SIGCHLD,
                Signal::SIGHUP,
                Signal::SIGINT,
                Signal::SIGQUIT,
                Signal::SIGTERM,
                Signal::SIGALRM,
            ] {
                let _ = signal::signal(*sig, signal::SigHandler::SigDfl);
            }
        }

        let argv: Vec<&CStr> = self.args.iter().map(|s| s.as_c_str()).collect();
        let envp: Vec<&CStr> = self.env.iter().map(|s| s.as_c_str()).collect();
        let _ = unistd::execve(self.program.as_c_str(), &argv, &envp);
        std::process::exit(1);
    }
}

impl Child {
    /// Spawn `$SHELL` at the given size
    pub fn spawn_shell(size: PtySize) -> Result<Self, PtyError> {
        ChildBuilder::default_shell()?.size(size).spawn()
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn pty(&self) -> &Pty {
        &self.pty
    }

    pub fn pty_mut(&mut self) -> &mut Pty {
        &mut self.pty
    }

    pub fn master_fd(&self) -> RawFd {
        self.pty.master_fd()
    }

    /// Update the window size and notify the child with SIGWINCH
    pub fn resize(&mut self, size: PtySize) -> io::Result<()> {
        self.pty.set_size(size)?;
        signal::kill(self.pid, Signal::SIGWINCH).map_err(io::Error::from)
    }

    /// Non-blocking exit check; Some(code) once the child is gone
    pub fn try_wait(&self) -> Option<i32> {
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Some(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => Some(128 + sig as i32),
            Ok(_) => None,
            // Already reaped
            Err(nix::errno::Errno::ECHILD) => Some(0),
            Err(_) => None,
        }
    }

    pub fn kill(&self) -> io::Result<()> {
        signal::kill(self.pid, Signal::SIGKILL).map_err(io::Error::from)
    }

    pub fn poll_output(&mut self) -> io::Result<Vec<u8>> {
        self.pty.poll_output()
    }

    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.pty.write_all(buf)
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        // Reap to avoid zombies; kill first in case the shell is still up
        let _ = self.kill();
        let _ = waitpid(self.pid, None);
    }
}
