//! Byte-at-a-time escape-sequence parser.
//!
//! `Processor` consumes the raw byte stream from the PTY master and drives a
//! `Term`. It is stateful across reads: a control sequence split over two
//! `read()` calls must parse identically to one arriving whole, so the event
//! loop constructs a single `Processor` and never resets it.
//!
//! The grammar handled here is the ECMA-48/xterm subset the grid implements:
//! C0 controls, `CSI` with up to 16 numeric parameters and an optional `?`
//! intermediate, `OSC` drained to `BEL`/`ESC`, and the `ESC (` charset
//! designator whose selector byte is discarded. Everything printable goes
//! through the inline UTF-8 decoder.

use std::io::Write;

use crate::term::Term;

/// Maximum number of CSI parameters; semicolons past this are absorbed.
pub const MAX_PARAMS: usize = 16;

/// OSC payloads are discarded, but a bounded prefix is kept for trace logs.
const OSC_SCRATCH_LEN: usize = 256;

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Esc,
    Csi,
    Osc,
}

/// Incremental UTF-8 decoder.
///
/// Accumulates up to four bytes; the expected sequence length comes from the
/// lead byte's high bits. Malformed input degrades to U+FFFD without ever
/// desynchronising the byte stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    buf: [u8; 4],
    len: usize,
}

impl Utf8Decoder {
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Feed one byte; returns a codepoint when a sequence completes.
    pub fn push(&mut self, byte: u8) -> Option<char> {
        if self.len == self.buf.len() {
            // Unreachable through the normal path; guard against misuse.
            self.reset();
        }
        self.buf[self.len] = byte;
        self.len += 1;

        let expected = expected_len(self.buf[0]);
        if self.len < expected {
            return None;
        }
        let scalar = self.decode(expected);
        self.reset();
        Some(char::from_u32(scalar).unwrap_or(REPLACEMENT))
    }

    fn decode(&self, expected: usize) -> u32 {
        let lead = self.buf[0];
        let (mut scalar, tail) = match expected {
            1 => {
                // A lone byte is either ASCII or an invalid lead.
                return if lead < 0x80 { lead as u32 } else { 0xFFFD };
            }
            2 => ((lead & 0x1F) as u32, 2),
            3 => ((lead & 0x0F) as u32, 3),
            _ => ((lead & 0x07) as u32, 4),
        };
        for &b in &self.buf[1..tail] {
            if b & 0xC0 != 0x80 {
                return 0xFFFD;
            }
            scalar = (scalar << 6) | (b & 0x3F) as u32;
        }
        scalar
    }
}

fn expected_len(lead: u8) -> usize {
    if lead & 0x80 == 0 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        1 // invalid lead, decoded as U+FFFD
    }
}

pub struct Processor {
    state: State,
    params: [u16; MAX_PARAMS],
    num_params: usize,
    private_mode: bool,
    osc_scratch: Vec<u8>,
    /// Set by `ESC (`: the charset selector byte that follows is dropped.
    discard_next: bool,
    utf8: Utf8Decoder,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            params: [0; MAX_PARAMS],
            num_params: 0,
            private_mode: false,
            osc_scratch: Vec::new(),
            discard_next: false,
            utf8: Utf8Decoder::default(),
        }
    }

    /// Feed a chunk of PTY output through the state machine. `reply` receives
    /// any device reports the dispatched sequences produce.
    pub fn advance(&mut self, term: &mut Term, bytes: &[u8], reply: &mut dyn Write) {
        for &byte in bytes {
            self.process(term, byte, reply);
        }
    }

    fn process(&mut self, term: &mut Term, byte: u8, reply: &mut dyn Write) {
        if self.discard_next {
            self.discard_next = false;
            return;
        }
        match self.state {
            State::Normal => self.normal(term, byte),
            State::Esc => self.escape(byte),
            State::Csi => self.csi(term, byte, reply),
            State::Osc => self.osc(byte),
        }
    }

    fn normal(&mut self, term: &mut Term, byte: u8) {
        match byte {
            0x1B => {
                self.utf8.reset();
                self.state = State::Esc;
            }
            b'\n' => {
                self.utf8.reset();
                term.newline();
            }
            b'\r' => {
                self.utf8.reset();
                term.carriage_return();
            }
            0x08 => {
                self.utf8.reset();
                term.backspace();
            }
            b'\t' => {
                self.utf8.reset();
                term.tab();
            }
            b if b >= 0x20 => {
                if let Some(c) = self.utf8.push(b) {
                    term.put_char(c);
                }
            }
            _ => {} // remaining C0 controls are ignored
        }
    }

    fn escape(&mut self, byte: u8) {
        match byte {
            b'[' => {
                self.params = [0; MAX_PARAMS];
                self.num_params = 0;
                self.private_mode = false;
                self.state = State::Csi;
            }
            b']' => {
                self.osc_scratch.clear();
                self.state = State::Osc;
            }
            b'(' => {
                // Charset designation: swallow the selector byte too.
                self.discard_next = true;
                self.state = State::Normal;
            }
            _ => self.state = State::Normal,
        }
    }

    fn csi(&mut self, term: &mut Term, byte: u8, reply: &mut dyn Write) {
        match byte {
            b'0'..=b'9' => {
                if self.num_params == 0 {
                    self.num_params = 1;
                }
                let p = &mut self.params[self.num_params - 1];
                *p = p.saturating_mul(10).saturating_add((byte - b'0') as u16);
            }
            b';' => {
                // A leading semicolon commits the implicit empty first slot.
                if self.num_params == 0 {
                    self.num_params = 1;
                }
                if self.num_params < MAX_PARAMS {
                    self.num_params += 1;
                    self.params[self.num_params - 1] = 0;
                }
            }
            b'?' => self.private_mode = true,
            0x40..=0x7E => {
                term.csi_dispatch(
                    byte,
                    &self.params[..self.num_params],
                    self.private_mode,
                    reply,
                );
                self.state = State::Normal;
                self.private_mode = false;
            }
            0x20..=0x2F => {} // intermediates, ignored
            _ => {
                self.state = State::Normal;
                self.private_mode = false;
            }
        }
    }

    fn osc(&mut self, byte: u8) {
        match byte {
            0x07 | 0x1B => {
                if !self.osc_scratch.is_empty() {
                    tracing::trace!(
                        "discarding OSC payload ({} bytes)",
                        self.osc_scratch.len()
                    );
                }
                self.osc_scratch.clear();
                self.state = State::Normal;
            }
            _ => {
                if self.osc_scratch.len() < OSC_SCRATCH_LEN {
                    self.osc_scratch.push(byte);
                }
            }
        }
    }
}
