//! Raw input translation.
//!
//! Keyboard input arrives either as evdev key events (keycode + press or
//! release) or, on the stdin fallback path, as bytes the host terminal has
//! already encoded. `KeyMapper` owns the modifier state and turns both into
//! one of two things: bytes bound for the PTY, or a host action the event
//! loop handles itself.
//!
//! The layout is fixed US; left and right modifiers are equivalent.

/// evdev keycodes from linux/input-event-codes.h (the subset mapped here).
pub mod keycodes {
    pub const KEY_ESC: u16 = 1;
    pub const KEY_1: u16 = 2;
    pub const KEY_0: u16 = 11;
    pub const KEY_MINUS: u16 = 12;
    pub const KEY_EQUAL: u16 = 13;
    pub const KEY_BACKSPACE: u16 = 14;
    pub const KEY_TAB: u16 = 15;
    pub const KEY_Q: u16 = 16;
    pub const KEY_P: u16 = 25;
    pub const KEY_LEFTBRACE: u16 = 26;
    pub const KEY_RIGHTBRACE: u16 = 27;
    pub const KEY_ENTER: u16 = 28;
    pub const KEY_LEFTCTRL: u16 = 29;
    pub const KEY_A: u16 = 30;
    pub const KEY_L: u16 = 38;
    pub const KEY_SEMICOLON: u16 = 39;
    pub const KEY_APOSTROPHE: u16 = 40;
    pub const KEY_GRAVE: u16 = 41;
    pub const KEY_LEFTSHIFT: u16 = 42;
    pub const KEY_BACKSLASH: u16 = 43;
    pub const KEY_Z: u16 = 44;
    pub const KEY_C: u16 = 46;
    pub const KEY_V: u16 = 47;
    pub const KEY_M: u16 = 50;
    pub const KEY_COMMA: u16 = 51;
    pub const KEY_DOT: u16 = 52;
    pub const KEY_SLASH: u16 = 53;
    pub const KEY_RIGHTSHIFT: u16 = 54;
    pub const KEY_LEFTALT: u16 = 56;
    pub const KEY_SPACE: u16 = 57;
    pub const KEY_Y: u16 = 21;
    pub const KEY_RIGHTCTRL: u16 = 97;
    pub const KEY_RIGHTALT: u16 = 100;
    pub const KEY_HOME: u16 = 102;
    pub const KEY_UP: u16 = 103;
    pub const KEY_PAGEUP: u16 = 104;
    pub const KEY_LEFT: u16 = 105;
    pub const KEY_RIGHT: u16 = 106;
    pub const KEY_END: u16 = 107;
    pub const KEY_DOWN: u16 = 108;
    pub const KEY_PAGEDOWN: u16 = 109;
    pub const KEY_INSERT: u16 = 110;
    pub const KEY_DELETE: u16 = 111;
}

use self::keycodes::*;

/// Actions the terminal handles itself instead of forwarding to the shell.
/// Only `Quit` (and the redraw half of `ClearScreen`) must be honoured; the
/// rest are advisory and an event loop may drop them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Copy,
    Paste,
    ScrollUp,
    ScrollDown,
    ClearScreen,
    Quit,
    IncreaseFont,
    DecreaseFont,
}

/// Result of mapping one key press or input byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    /// Nothing to do (modifier churn, unmapped key).
    None,
    /// Bytes to write verbatim to the PTY master.
    Bytes(Vec<u8>),
    Action(HostAction),
}

#[derive(Debug, Default)]
pub struct KeyMapper {
    ctrl: bool,
    shift: bool,
    alt: bool,
}

impl KeyMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key releases only update modifier state.
    pub fn key_release(&mut self, code: u16) {
        match code {
            KEY_LEFTCTRL | KEY_RIGHTCTRL => self.ctrl = false,
            KEY_LEFTSHIFT | KEY_RIGHTSHIFT => self.shift = false,
            KEY_LEFTALT | KEY_RIGHTALT => self.alt = false,
            _ => {}
        }
    }

    /// Map a key press (or autorepeat) to PTY bytes or a host action.
    pub fn key_press(&mut self, code: u16) -> Mapped {
        match code {
            KEY_LEFTCTRL | KEY_RIGHTCTRL => {
                self.ctrl = true;
                return Mapped::None;
            }
            KEY_LEFTSHIFT | KEY_RIGHTSHIFT => {
                self.shift = true;
                return Mapped::None;
            }
            KEY_LEFTALT | KEY_RIGHTALT => {
                self.alt = true;
                return Mapped::None;
            }
            _ => {}
        }

        if self.ctrl {
            if let Some(action) = self.ctrl_chord(code) {
                return Mapped::Action(action);
            }
            // Ctrl+letter is the corresponding C0 control byte.
            if let Some((base, _)) = printable(code) {
                if base.is_ascii_lowercase() {
                    return Mapped::Bytes(vec![base - b'a' + 1]);
                }
            }
        }

        if let Some(seq) = navigation_sequence(code) {
            return Mapped::Bytes(seq.to_vec());
        }

        if let Some((base, shifted)) = printable(code) {
            return Mapped::Bytes(vec![if self.shift { shifted } else { base }]);
        }

        Mapped::None
    }

    /// Map one byte from the raw-stdin input path. The host terminal already
    /// encoded the keystroke, so everything is forwarded verbatim except the
    /// two chords that address the terminal itself.
    pub fn map_byte(&mut self, byte: u8) -> Mapped {
        match byte {
            0x11 => Mapped::Action(HostAction::Quit),         // Ctrl+Q
            0x1F => Mapped::Action(HostAction::DecreaseFont), // Ctrl+Shift+_
            b => Mapped::Bytes(vec![b]),
        }
    }

    fn ctrl_chord(&self, code: u16) -> Option<HostAction> {
        match code {
            KEY_Q => Some(HostAction::Quit),
            KEY_L => Some(HostAction::ClearScreen),
            KEY_Y => Some(HostAction::Paste),
            KEY_PAGEUP => Some(HostAction::ScrollUp),
            KEY_PAGEDOWN => Some(HostAction::ScrollDown),
            KEY_C if self.shift => Some(HostAction::Copy),
            KEY_V if self.shift => Some(HostAction::Paste),
            KEY_MINUS if self.shift => Some(HostAction::DecreaseFont),
            KEY_EQUAL if self.shift => Some(HostAction::IncreaseFont),
            _ => None,
        }
    }
}

/// Standard xterm sequences for navigation and editing keys.
fn navigation_sequence(code: u16) -> Option<&'static [u8]> {
    let seq: &[u8] = match code {
        KEY_UP => b"\x1b[A",
        KEY_DOWN => b"\x1b[B",
        KEY_RIGHT => b"\x1b[C",
        KEY_LEFT => b"\x1b[D",
        KEY_HOME => b"\x1b[H",
        KEY_END => b"\x1b[F",
        KEY_INSERT => b"\x1b[2~",
        KEY_DELETE => b"\x1b[3~",
        KEY_PAGEUP => b"\x1b[5~",
        KEY_PAGEDOWN => b"\x1b[6~",
        KEY_ENTER => b"\r",
        KEY_TAB => b"\t",
        KEY_BACKSPACE => b"\x7f",
        KEY_ESC => b"\x1b",
        KEY_SPACE => b" ",
        _ => return None,
    };
    Some(seq)
}

/// `(unshifted, shifted)` characters for a printable key, US layout.
///
/// evdev keycodes follow the physical QWERTY rows, not the alphabet, so this
/// is a table rather than arithmetic.
fn printable(code: u16) -> Option<(u8, u8)> {
    let pair = match code {
        // Number row.
        2 => (b'1', b'!'),
        3 => (b'2', b'@'),
        4 => (b'3', b'#'),
        5 => (b'4', b'$'),
        6 => (b'5', b'%'),
        7 => (b'6', b'^'),
        8 => (b'7', b'&'),
        9 => (b'8', b'*'),
        10 => (b'9', b'('),
        11 => (b'0', b')'),
        12 => (b'-', b'_'),
        13 => (b'=', b'+'),
        // Top letter row.
        16 => (b'q', b'Q'),
        17 => (b'w', b'W'),
        18 => (b'e', b'E'),
        19 => (b'r', b'R'),
        20 => (b't', b'T'),
        21 => (b'y', b'Y'),
        22 => (b'u', b'U'),
        23 => (b'i', b'I'),
        24 => (b'o', b'O'),
        25 => (b'p', b'P'),
        26 => (b'[', b'{'),
        27 => (b']', b'}'),
        // Home row.
        30 => (b'a', b'A'),
        31 => (b's', b'S'),
        32 => (b'd', b'D'),
        33 => (b'f', b'F'),
        34 => (b'g', b'G'),
        35 => (b'h', b'H'),
        36 => (b'j', b'J'),
        37 => (b'k', b'K'),
        38 => (b'l', b'L'),
        39 => (b';', b':'),
        40 => (b'\'', b'"'),
        41 => (b'`', b'~'),
        43 => (b'\\', b'|'),
        // Bottom row.
        44 => (b'z', b'Z'),
        45 => (b'x', b'X'),
        46 => (b'c', b'C'),
        47 => (b'v', b'V'),
        48 => (b'b', b'B'),
        49 => (b'n', b'N'),
        50 => (b'm', b'M'),
        51 => (b',', b'<'),
        52 => (b'.', b'>'),
        53 => (b'/', b'?'),
        _ => return None,
    };
    Some(pair)
}

#[cfg(test)]
mod tests {
    use super::keycodes::*;
    use super::*;

    #[test]
    fn letters_follow_shift() {
        let mut m = KeyMapper::new();
        assert_eq!(m.key_press(KEY_Q), Mapped::Bytes(vec![b'q']));
        m.key_press(KEY_LEFTSHIFT);
        assert_eq!(m.key_press(KEY_Q), Mapped::Bytes(vec![b'Q']));
        m.key_release(KEY_LEFTSHIFT);
        assert_eq!(m.key_press(KEY_Q), Mapped::Bytes(vec![b'q']));
    }

    #[test]
    fn number_row_shifts_to_symbols() {
        let mut m = KeyMapper::new();
        assert_eq!(m.key_press(KEY_1), Mapped::Bytes(vec![b'1']));
        m.key_press(KEY_RIGHTSHIFT);
        assert_eq!(m.key_press(KEY_1), Mapped::Bytes(vec![b'!']));
        assert_eq!(m.key_press(KEY_0), Mapped::Bytes(vec![b')']));
    }

    #[test]
    fn qwerty_rows_are_not_alphabetical() {
        let mut m = KeyMapper::new();
        // Keycode 31 is 's', not 'b'.
        assert_eq!(m.key_press(31), Mapped::Bytes(vec![b's']));
        assert_eq!(m.key_press(44), Mapped::Bytes(vec![b'z']));
    }

    #[test]
    fn ctrl_letter_is_c0_byte() {
        let mut m = KeyMapper::new();
        m.key_press(KEY_LEFTCTRL);
        assert_eq!(m.key_press(KEY_C), Mapped::Bytes(vec![0x03]));
        assert_eq!(m.key_press(KEY_Z), Mapped::Bytes(vec![0x1A]));
        m.key_release(KEY_LEFTCTRL);
        assert_eq!(m.key_press(KEY_C), Mapped::Bytes(vec![b'c']));
    }

    #[test]
    fn ctrl_q_quits() {
        let mut m = KeyMapper::new();
        m.key_press(KEY_RIGHTCTRL);
        assert_eq!(m.key_press(KEY_Q), Mapped::Action(HostAction::Quit));
    }

    #[test]
    fn ctrl_page_keys_scroll() {
        let mut m = KeyMapper::new();
        assert_eq!(m.key_press(KEY_PAGEUP), Mapped::Bytes(b"\x1b[5~".to_vec()));
        m.key_press(KEY_LEFTCTRL);
        assert_eq!(m.key_press(KEY_PAGEUP), Mapped::Action(HostAction::ScrollUp));
        assert_eq!(
            m.key_press(KEY_PAGEDOWN),
            Mapped::Action(HostAction::ScrollDown)
        );
    }

    #[test]
    fn font_resize_chords() {
        let mut m = KeyMapper::new();
        m.key_press(KEY_LEFTCTRL);
        m.key_press(KEY_LEFTSHIFT);
        assert_eq!(
            m.key_press(KEY_MINUS),
            Mapped::Action(HostAction::DecreaseFont)
        );
        assert_eq!(
            m.key_press(KEY_EQUAL),
            Mapped::Action(HostAction::IncreaseFont)
        );
    }

    #[test]
    fn navigation_sequences() {
        let mut m = KeyMapper::new();
        assert_eq!(m.key_press(KEY_UP), Mapped::Bytes(b"\x1b[A".to_vec()));
        assert_eq!(m.key_press(KEY_HOME), Mapped::Bytes(b"\x1b[H".to_vec()));
        assert_eq!(m.key_press(KEY_DELETE), Mapped::Bytes(b"\x1b[3~".to_vec()));
        assert_eq!(m.key_press(KEY_ENTER), Mapped::Bytes(vec![b'\r']));
        assert_eq!(m.key_press(KEY_BACKSPACE), Mapped::Bytes(vec![0x7F]));
        assert_eq!(m.key_press(KEY_SPACE), Mapped::Bytes(vec![b' ']));
    }

    #[test]
    fn modifiers_alone_produce_nothing() {
        let mut m = KeyMapper::new();
        assert_eq!(m.key_press(KEY_LEFTCTRL), Mapped::None);
        assert_eq!(m.key_press(KEY_LEFTALT), Mapped::None);
        m.key_release(KEY_LEFTCTRL);
        m.key_release(KEY_LEFTALT);
        assert_eq!(m.key_press(KEY_A), Mapped::Bytes(vec![b'a']));
    }

    #[test]
    fn byte_path_quit_hatch() {
        let mut m = KeyMapper::new();
        assert_eq!(m.map_byte(0x11), Mapped::Action(HostAction::Quit));
        assert_eq!(
            m.map_byte(0x1F),
            Mapped::Action(HostAction::DecreaseFont)
        );
        assert_eq!(m.map_byte(b'x'), Mapped::Bytes(vec![b'x']));
        assert_eq!(m.map_byte(0x03), Mapped::Bytes(vec![0x03]));
    }
}
