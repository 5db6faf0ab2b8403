//! Keyboard input encoding.
//!
//! Maps key presses to the byte sequences a shell expects. Arrow keys
//! switch between CSI and SS3 prefixes when the application cursor keys
//! mode is set. Shift+Up/Down/PageUp/PageDown are handled by the caller
//! as local scrollback motions and never reach this table.

/// A named key or printable character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// Encode a key press into PTY input bytes. Returns an empty vector for
/// keys with no encoding.
pub fn encode_key(key: Key, modifiers: Modifiers, app_cursor: bool) -> Vec<u8> {
    match key {
        Key::Char(c) => encode_char(c, modifiers),
        Key::Enter => vec![b'\r'],
        Key::Backspace => vec![0x7F],
        Key::Tab => vec![b'\t'],
        Key::Escape => vec![0x1B],
        Key::Up => encode_arrow(b'A', app_cursor),
        Key::Down => encode_arrow(b'B', app_cursor),
        Key::Right => encode_arrow(b'C', app_cursor),
        Key::Left => encode_arrow(b'D', app_cursor),
        Key::Home => vec![0x1B, b'[', b'H'],
        Key::End => vec![0x1B, b'[', b'F'],
        Key::PageUp => b"\x1b[5~".to_vec(),
        Key::PageDown => b"\x1b[6~".to_vec(),
        Key::Insert => b"\x1b[2~".to_vec(),
        Key::Delete => b"\x1b[3~".to_vec(),
        Key::F(n) => encode_function_key(n),
    }
}

fn encode_char(c: char, modifiers: Modifiers) -> Vec<u8> {
    if modifiers.ctrl {
        // Ctrl+A..Z produce bytes 1..26
        if c.is_ascii_alphabetic() {
            return vec![(c.to_ascii_uppercase() as u8) - b'A' + 1];
        }
        if c == '[' {
            return vec![0x1B];
        }
    }

    if modifiers.alt {
        // Alt prefixes the character with ESC
        let mut bytes = vec![0x1B];
        let mut buf = [0u8; 4];
        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        return bytes;
    }

    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf).as_bytes().to_vec()
}

fn encode_arrow(key: u8, app_cursor: bool) -> Vec<u8> {
    if app_cursor {
        vec![0x1B, b'O', key]
    } else {
        vec![0x1B, b'[', key]
    }
}

/// F1..F4 use SS3 finals, F5..F12 the canonical xterm CSI codes
fn encode_function_key(n: u8) -> Vec<u8> {
    match n {
        1 => b"\x1bOP".to_vec(),
        2 => b"\x1bOQ".to_vec(),
        3 => b"\x1bOR".to_vec(),
        4 => b"\x1bOS".to_vec(),
        5 => b"\x1b[15~".to_vec(),
        6 => b"\x1b[17~".to_vec(),
        7 => b"\x1b[18~".to_vec(),
        8 => b"\x1b[19~".to_vec(),
        9 => b"\x1b[20~".to_vec(),
        10 => b"\x1b[21~".to_vec(),
        11 => b"\x1b[23~".to_vec(),
        12 => b"\x1b[24~".to_vec(),
        _ => Vec::new(),
    }
}
