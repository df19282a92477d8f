//! Input source discovery and reading.
//!
//! Two collaborators can feed the key mapper: the first evdev device under
//! `/dev/input` that looks like a keyboard (preferred — it works on a bare
//! console with no controlling terminal), or the host terminal's stdin
//! switched into raw mode. Both are opened non-blocking so the event loop
//! can drain them without stalling.

use std::fs::{File, OpenOptions};
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::keymap::keycodes::{KEY_P, KEY_Q};

const INPUT_DIR: &str = "/dev/input";

const EV_KEY: u32 = 0x01;
const KEY_MAX: usize = 0x2FF;

/// `EVIOCGBIT(ev, len)`: read the capability bitmask for one event type.
const fn eviocgbit(ev: u32, len: usize) -> libc::c_ulong {
    // _IOC(_IOC_READ, 'E', 0x20 + ev, len)
    ((2u64 << 30) | ((len as u64) << 16) | ((b'E' as u64) << 8) | (0x20 + ev as u64))
        as libc::c_ulong
}

/// One evdev key event; `value` is 0 = release, 1 = press, 2 = autorepeat.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    pub code: u16,
    pub value: i32,
}

impl KeyEvent {
    pub fn is_release(&self) -> bool {
        self.value == 0
    }
}

pub enum InputSource {
    Evdev(File),
    Stdin,
}

/// What one drain of the input source produced.
pub enum InputBatch {
    Keys(Vec<KeyEvent>),
    Bytes(Vec<u8>),
}

impl InputSource {
    /// Prefer an evdev keyboard; fall back to the host terminal's stdin.
    pub fn open() -> Self {
        match find_keyboard() {
            Some((file, path)) => {
                eprintln!("Using keyboard: {}", path.display());
                tracing::info!("input source: evdev {}", path.display());
                Self::Evdev(file)
            }
            None => {
                tracing::info!("input source: stdin (no evdev keyboard found)");
                Self::Stdin
            }
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        match self {
            Self::Evdev(file) => file.as_raw_fd(),
            Self::Stdin => libc::STDIN_FILENO,
        }
    }

    /// Drain everything currently readable.
    pub fn drain(&mut self) -> InputBatch {
        match self {
            Self::Evdev(file) => InputBatch::Keys(read_key_events(file)),
            Self::Stdin => InputBatch::Bytes(read_all(libc::STDIN_FILENO)),
        }
    }
}

/// Scan `/dev/input/event*` for a device that reports `EV_KEY` and carries
/// at least one keycode from the top letter row.
fn find_keyboard() -> Option<(File, PathBuf)> {
    let entries = match std::fs::read_dir(INPUT_DIR) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("cannot scan {INPUT_DIR}: {err}");
            return None;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("event"))
        {
            continue;
        }
        let Ok(file) = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
        else {
            continue;
        };
        if is_keyboard(&file, &path) {
            return Some((file, path));
        }
    }
    None
}

fn is_keyboard(file: &File, path: &Path) -> bool {
    let fd = file.as_raw_fd();

    let mut evbits: u64 = 0;
    // SAFETY: EVIOCGBIT writes at most the requested 8 bytes into evbits.
    let res = unsafe { libc::ioctl(fd, eviocgbit(0, mem::size_of::<u64>()), &mut evbits) };
    if res < 0 || evbits & (1 << EV_KEY) == 0 {
        return false;
    }

    let mut keybits = [0u8; KEY_MAX / 8 + 1];
    // SAFETY: as above, bounded by the keybits buffer length.
    let res = unsafe { libc::ioctl(fd, eviocgbit(EV_KEY, keybits.len()), keybits.as_mut_ptr()) };
    if res < 0 {
        return false;
    }

    // The top letter row distinguishes keyboards from power buttons and lid
    // switches, which also advertise EV_KEY.
    let has_letters = (KEY_Q..=KEY_P)
        .any(|code| keybits[code as usize / 8] & (1 << (code % 8)) != 0);
    if has_letters {
        tracing::debug!("{} looks like a keyboard", path.display());
    }
    has_letters
}

/// Read evdev events until the descriptor runs dry, keeping only `EV_KEY`.
fn read_key_events(file: &File) -> Vec<KeyEvent> {
    let fd = file.as_raw_fd();
    let event_size = mem::size_of::<libc::input_event>();
    let mut events = Vec::new();
    let mut buf = vec![0u8; event_size * 64];

    loop {
        // SAFETY: reading into an owned byte buffer of the stated length.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break; // 0, EAGAIN, or a transient error; the poll loop retries
        }
        for chunk in buf[..n as usize].chunks_exact(event_size) {
            // SAFETY: the kernel only ever writes whole input_event records.
            let ev: libc::input_event =
                unsafe { std::ptr::read_unaligned(chunk.as_ptr().cast()) };
            if ev.type_ == EV_KEY as u16 {
                events.push(KeyEvent {
                    code: ev.code,
                    value: ev.value,
                });
            }
        }
        if (n as usize) < buf.len() {
            break;
        }
    }
    events
}

/// Drain a non-blocking descriptor into a byte vector.
fn read_all(fd: RawFd) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        // SAFETY: reading into an owned stack buffer of the stated length.
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }
        out.extend_from_slice(&buf[..n as usize]);
        if (n as usize) < buf.len() {
            break;
        }
    }
    out
}

/// Puts the host terminal into raw non-blocking mode for the lifetime of the
/// guard and restores the saved settings on drop, on every exit path.
pub struct RawModeGuard {
    saved_termios: libc::termios,
    saved_flags: libc::c_int,
}

impl RawModeGuard {
    /// Returns `None` when stdin is not a terminal (e.g. run under a harness);
    /// there is nothing to restore in that case.
    pub fn install() -> Option<Self> {
        let fd = libc::STDIN_FILENO;
        // SAFETY: termios calls on stdin with a zero-initialised out-param.
        unsafe {
            if libc::isatty(fd) == 0 {
                return None;
            }
            let mut saved: libc::termios = mem::zeroed();
            if libc::tcgetattr(fd, &mut saved) != 0 {
                return None;
            }
            let saved_flags = libc::fcntl(fd, libc::F_GETFL, 0);

            let mut raw = saved;
            libc::cfmakeraw(&mut raw);
            libc::tcsetattr(fd, libc::TCSANOW, &raw);
            libc::fcntl(fd, libc::F_SETFL, saved_flags | libc::O_NONBLOCK);

            Some(Self {
                saved_termios: saved,
                saved_flags,
            })
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // SAFETY: restoring the exact state captured in install().
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.saved_termios);
            libc::fcntl(libc::STDIN_FILENO, libc::F_SETFL, self.saved_flags);
        }
    }
}
