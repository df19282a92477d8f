//! fbterm: terminal emulation on a raw Linux framebuffer.
//!
//! The crate is split into a library (everything testable: the escape-sequence
//! parser, the cell grid, the key mapper, the rasteriser) and a thin binary
//! that wires the pieces to real devices.
//!
//! Data flows:
//!
//! ```text
//! [keyboard: evdev events / raw stdin bytes]
//!       │
//!       ▼
//! keymap::KeyMapper ──bytes──► PTY master (write)
//!
//! PTY master (read) ──► parser::Processor ──ops──► term::Term
//!                                                    │ dirty
//!                                                    ▼
//!                              render::Renderer ──► framebuffer::Framebuffer
//! ```

pub mod event_loop;
pub mod font;
pub mod framebuffer;
pub mod input;
pub mod keymap;
pub mod logging;
pub mod palette;
pub mod parser;
pub mod pty;
pub mod render;
pub mod term;
