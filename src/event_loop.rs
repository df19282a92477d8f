//! The multiplexed event loop.
//!
//! One thread, one `poll(2)` over the input descriptor and the PTY master,
//! with a ~60 Hz timeout so renders never outpace the display. Each turn:
//! drain input to the shell, drain the shell into the parser, and repaint the
//! grid if anything changed. The loop ends on Ctrl+Q, on the shell exiting
//! (zero-length read or SIGCHLD), or on a mapped `Quit` action.
//!
//! The parser is never reset between reads — a control sequence split across
//! two drains must parse as if it arrived whole.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::framebuffer::Framebuffer;
use crate::input::{InputBatch, InputSource};
use crate::keymap::{HostAction, KeyMapper, Mapped};
use crate::parser::Processor;
use crate::pty::ShellPty;
use crate::render::Renderer;
use crate::term::Term;

/// Poll timeout in milliseconds; caps the render rate near 60 Hz.
const POLL_TIMEOUT_MS: libc::c_int = 16;

const PTY_READ_BUF: usize = 4096;

/// Cleared by the SIGCHLD handler; checked at the top of every iteration.
static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn on_sigchld(_signum: libc::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

/// Install the SIGCHLD handler. Must run before the shell is spawned or a
/// fast-exiting child could slip past the flag.
pub fn install_sigchld_handler() {
    // SAFETY: on_sigchld is async-signal-safe (one atomic store).
    unsafe {
        libc::signal(libc::SIGCHLD, on_sigchld as libc::sighandler_t);
    }
}

pub fn run(
    fb: &mut Framebuffer,
    renderer: &mut Renderer,
    term: &mut Term,
    input: &mut InputSource,
    pty: &mut ShellPty,
) -> Result<()> {
    let mut processor = Processor::new();
    let mut mapper = KeyMapper::new();
    let mut read_buf = [0u8; PTY_READ_BUF];
    let mut dirty = true; // paint the initial blank grid

    RUNNING.store(true, Ordering::Relaxed);

    while RUNNING.load(Ordering::Relaxed) {
        let mut fds = [
            libc::pollfd {
                fd: input.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: pty.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        // SAFETY: fds is a live array of the stated length.
        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, POLL_TIMEOUT_MS) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue; // typically SIGCHLD; the flag decides at the top
            }
            return Err(err).context("poll failed");
        }

        if ret > 0 {
            if fds[0].revents & libc::POLLIN != 0 && !forward_input(input, &mut mapper, pty) {
                break;
            }
            if fds[1].revents & (libc::POLLIN | libc::POLLHUP) != 0
                && drain_pty(pty, &mut processor, term, &mut read_buf)
            {
                dirty = true;
            }
        }

        if dirty {
            renderer.draw_grid(fb, term);
            dirty = false;
        }
    }

    tracing::info!("event loop finished");
    Ok(())
}

/// Drain the input source, forwarding mapped bytes to the shell.
/// Returns `false` when the user asked to quit.
fn forward_input(input: &mut InputSource, mapper: &mut KeyMapper, pty: &mut ShellPty) -> bool {
    let mut outgoing: Vec<u8> = Vec::new();
    let mut keep_running = true;

    match input.drain() {
        InputBatch::Keys(events) => {
            for ev in events {
                if ev.is_release() {
                    mapper.key_release(ev.code);
                    continue;
                }
                if !dispatch(mapper.key_press(ev.code), &mut outgoing) {
                    keep_running = false;
                    break;
                }
            }
        }
        InputBatch::Bytes(bytes) => {
            for byte in bytes {
                if !dispatch(mapper.map_byte(byte), &mut outgoing) {
                    keep_running = false;
                    break;
                }
            }
        }
    }

    pty.send(&outgoing);
    keep_running
}

/// Apply one mapping result. Returns `false` on `Quit`.
fn dispatch(mapped: Mapped, outgoing: &mut Vec<u8>) -> bool {
    match mapped {
        Mapped::None => {}
        Mapped::Bytes(bytes) => outgoing.extend_from_slice(&bytes),
        Mapped::Action(HostAction::Quit) => return false,
        Mapped::Action(HostAction::ClearScreen) => {
            // Let the shell repaint; the grid follows its output.
            outgoing.push(0x0C);
        }
        Mapped::Action(action) => {
            // Scroll, copy/paste and font resizing are advisory (the grid has
            // no scrollback and a fixed cell size).
            tracing::debug!("ignoring advisory action {action:?}");
        }
    }
    true
}

/// Read the PTY master dry, feeding every byte through the parser in arrival
/// order. Returns whether anything was consumed (the dirty signal).
fn drain_pty(
    pty: &mut ShellPty,
    processor: &mut Processor,
    term: &mut Term,
    buf: &mut [u8],
) -> bool {
    let fd = pty.raw_fd();
    let mut consumed = false;

    loop {
        // SAFETY: reading into the caller's buffer of the stated length.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n > 0 {
            let n = n as usize;
            processor.advance(term, &buf[..n], pty.writer());
            consumed = true;
            if n < buf.len() {
                break; // short read: the pipe is dry
            }
        } else if n == 0 {
            // EOF: the shell exited.
            tracing::info!("PTY master returned EOF");
            RUNNING.store(false, Ordering::Relaxed);
            break;
        } else {
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::WouldBlock => break,
                io::ErrorKind::Interrupted => continue,
                _ => {
                    // On Linux a closed slave side surfaces as EIO.
                    tracing::info!("PTY read failed: {err}");
                    RUNNING.store(false, Ordering::Relaxed);
                    break;
                }
            }
        }
    }
    consumed
}
