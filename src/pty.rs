//! The child shell and its PTY.
//!
//! The shell named by `$SHELL` (default `/bin/bash`) runs on the slave side
//! with `TERM=xterm-256color` and the grid dimensions as its window size.
//! The slave keeps kernel-default termios: applications negotiate their own
//! raw mode, and forcing one here would break every TUI.
//!
//! The master descriptor is switched to non-blocking so the event loop can
//! drain it to `EAGAIN`; writes stay short (keystrokes and device reports)
//! and their errors are ignored once the shell is gone.

use std::io::Write;
use std::os::fd::RawFd;

use anyhow::{Context, Result, anyhow};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};

const DEFAULT_SHELL: &str = "/bin/bash";

pub struct ShellPty {
    // Held for the lifetime of the session; dropping it closes the master.
    _master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    // Held so the child is not reaped behind the event loop's back.
    _child: Box<dyn Child + Send>,
    raw_fd: RawFd,
    shell: String,
}

impl ShellPty {
    /// Allocate a PTY sized to the grid and spawn the user's shell on it.
    pub fn spawn(cols: usize, rows: usize) -> Result<Self> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: rows as u16,
                cols: cols as u16,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("failed to allocate PTY")?;

        let shell = std::env::var("SHELL").unwrap_or_else(|_| DEFAULT_SHELL.to_string());
        let mut cmd = CommandBuilder::new(&shell);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("failed to spawn {shell}"))?;
        drop(pair.slave);

        let master = pair.master;
        let writer = master.take_writer().context("failed to get PTY writer")?;
        let raw_fd = master
            .as_raw_fd()
            .ok_or_else(|| anyhow!("PTY master has no file descriptor"))?;

        // SAFETY: plain fcntl flag twiddling on a descriptor we own.
        unsafe {
            let flags = libc::fcntl(raw_fd, libc::F_GETFL, 0);
            libc::fcntl(raw_fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }

        tracing::info!("spawned {shell} on a {cols}x{rows} PTY");

        Ok(Self {
            _master: master,
            writer,
            _child: child,
            raw_fd,
            shell,
        })
    }

    pub fn raw_fd(&self) -> RawFd {
        self.raw_fd
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// The write half, lent to the parser for device reports and used by the
    /// event loop for keyboard input.
    pub fn writer(&mut self) -> &mut (dyn Write + Send) {
        &mut *self.writer
    }

    /// Forward input bytes to the shell. Failures are logged and dropped:
    /// a write after the child died is handled by the read side seeing EOF.
    pub fn send(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Err(err) = self.writer.write_all(bytes).and_then(|_| self.writer.flush()) {
            tracing::debug!("PTY write failed: {err}");
        }
    }
}
