//! VT/xterm escape sequence parser.
//!
//! A state machine over bytes: Ground, Escape, Csi, String (OSC/DCS/APC/
//! PM/SOS, contents discarded), and Charset. Printable runs in Ground are
//! coalesced into `PrintText` actions carrying the attributes in effect.
//!
//! The parser is incremental: any sequence (UTF-8, CSI, string) may be
//! split across chunks. Malformed input degrades back to Ground without
//! emitting actions and can never panic.
//!
//! References:
//! - ECMA-48, 5th edition
//! - XTerm Control Sequences (ctlseqs)

use lipi_core::{Attributes, CellFlags, Color, Rgb};

use crate::action::{c0, Action, CursorMove};
use crate::params::Params;
use crate::utf8::{Utf8Decoder, Utf8Result, REPLACEMENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
    /// Inside a malformed CSI, consuming until the final byte
    CsiIgnore,
    /// OSC, DCS, APC, PM, SOS: collect until BEL or ESC `\`
    StringArg,
    /// Charset designation: exactly one byte follows
    Charset,
}

pub struct Parser {
    state: State,
    params: Params,
    current_param: u16,
    param_started: bool,
    private: bool,
    utf8: Utf8Decoder,
    attrs: Attributes,
    pending_text: String,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            state: State::Ground,
            params: Params::new(),
            current_param: 0,
            param_started: false,
            private: false,
            utf8: Utf8Decoder::new(),
            attrs: Attributes::default(),
            pending_text: String::new(),
        }
    }

    /// The parser-owned current graphic attributes
    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    /// Carried-over bytes of an incomplete UTF-8 sequence
    pub fn pending_utf8(&self) -> usize {
        self.utf8.pending_len()
    }

    /// Parse a chunk of bytes into an ordered action batch
    pub fn parse(&mut self, input: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        for &byte in input {
            self.advance(byte, &mut actions);
        }
        self.flush_text(&mut actions);
        actions
    }

    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_sequence();
        self.utf8.reset();
        self.attrs = Attributes::default();
        self.pending_text.clear();
    }

    fn advance(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match self.state {
            State::Ground => self.ground(byte, actions),
            State::Escape => self.escape(byte, actions),
            State::Csi => self.csi(byte, actions),
            State::CsiIgnore => self.csi_ignore(byte),
            State::StringArg => self.string_arg(byte),
            State::Charset => {
                // The designator byte itself is all we need to consume
                self.state = State::Ground;
            }
        }
    }

    fn ground(&mut self, byte: u8, actions: &mut Vec<Action>) {
        if self.utf8.pending_len() > 0 || byte >= 0x80 {
            match self.utf8.feed(byte) {
                Utf8Result::Pending => return,
                Utf8Result::Char(c) => {
                    self.pending_text.push(c);
                    return;
                }
                Utf8Result::Invalid => {
                    self.pending_text.push(REPLACEMENT);
                    return;
                }
                Utf8Result::Interrupted => {
                    self.pending_text.push(REPLACEMENT);
                    // The byte starts the next sequence; process it fresh
                    self.ground(byte, actions);
                    return;
                }
            }
        }

        match byte {
            c0::LF => {
                self.flush_text(actions);
                actions.push(Action::Newline);
            }
            c0::CR => {
                self.flush_text(actions);
                actions.push(Action::CarriageReturn);
            }
            c0::BS => {
                self.flush_text(actions);
                actions.push(Action::Backspace);
            }
            c0::HT => {
                self.flush_text(actions);
                actions.push(Action::Tab);
            }
            c0::ESC => {
                self.flush_text(actions);
                self.clear_sequence();
                self.state = State::Escape;
            }
            0x20..=0x7E => {
                self.pending_text.push(byte as char);
            }
            // BEL, EOT, and the remaining C0 bytes have no screen effect
            _ => {}
        }
    }

    fn escape(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            b'[' => {
                self.clear_sequence();
                self.state = State::Csi;
            }
            b']' | b'P' | b'_' | b'^' | b'X' => {
                self.state = State::StringArg;
            }
            b'(' | b')' => {
                self.state = State::Charset;
            }
            b'M' => {
                actions.push(Action::ReverseIndex);
                self.state = State::Ground;
            }
            b'E' => {
                actions.push(Action::NextLine);
                self.state = State::Ground;
            }
            b'D' => {
                actions.push(Action::Index);
                self.state = State::Ground;
            }
            b'7' => {
                actions.push(Action::SaveCursor);
                self.state = State::Ground;
            }
            b'8' => {
                actions.push(Action::RestoreCursor);
                self.state = State::Ground;
            }
            c0::ESC => {
                // Restart the sequence
                self.clear_sequence();
            }
            _ => {
                log::debug!("ignoring ESC {:#04x}", byte);
                self.state = State::Ground;
            }
        }
    }

    fn csi(&mut self, byte: u8, actions: &mut Vec<Action>) {
        match byte {
            b'0'..=b'9' => {
                let digit = (byte - b'0') as u16;
                self.current_param = self.current_param.saturating_mul(10).saturating_add(digit);
                self.param_started = true;
            }
            b';' => {
                self.params.push(self.current_param);
                self.current_param = 0;
                self.param_started = false;
            }
            b'?' => {
                self.private = true;
            }
            0x40..=0x7E => {
                if self.param_started || !self.params.is_empty() {
                    self.params.push(self.current_param);
                }
                self.dispatch_csi(byte, actions);
                self.state = State::Ground;
            }
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            _ => {
                self.state = State::CsiIgnore;
            }
        }
    }

    fn csi_ignore(&mut self, byte: u8) {
        match byte {
            0x40..=0x7E => {
                self.state = State::Ground;
            }
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            _ => {}
        }
    }

    fn string_arg(&mut self, byte: u8) {
        match byte {
            c0::BEL => {
                self.state = State::Ground;
            }
            // ESC `\` (ST) ends up in Escape, whose fallback returns to
            // Ground; any other escape restarts normally
            c0::ESC => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            // String contents are not used by the core
            _ => {}
        }
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.current_param = 0;
        self.param_started = false;
        self.private = false;
    }

    fn flush_text(&mut self, actions: &mut Vec<Action>) {
        if !self.pending_text.is_empty() {
            actions.push(Action::PrintText {
                text: std::mem::take(&mut self.pending_text),
                attrs: self.attrs,
            });
        }
    }

    fn dispatch_csi(&mut self, final_byte: u8, actions: &mut Vec<Action>) {
        let n = self.params.get_nonzero_or(0, 1) as usize;
        match final_byte {
            b'm' => {
                if !self.private {
                    self.apply_sgr();
                    actions.push(Action::SetAttributes(self.attrs));
                }
            }
            b'J' => actions.push(Action::ClearScreen {
                mode: self.params.get_or(0, 0),
                attrs: self.attrs,
            }),
            b'K' => actions.push(Action::ClearLine {
                mode: self.params.get_or(0, 0),
                attrs: self.attrs,
            }),
            b'A' => actions.push(Action::MoveCursor(CursorMove::Relative {
                rows: -(n as i32),
                cols: 0,
            })),
            b'B' => actions.push(Action::MoveCursor(CursorMove::Relative {
                rows: n as i32,
                cols: 0,
            })),
            b'C' => actions.push(Action::MoveCursor(CursorMove::Relative {
                rows: 0,
                cols: n as i32,
            })),
            b'D' => actions.push(Action::MoveCursor(CursorMove::Relative {
                rows: 0,
                cols: -(n as i32),
            })),
            b'H' | b'f' => {
                let row = self.params.get_nonzero_or(0, 1) as usize - 1;
                let col = self.params.get_nonzero_or(1, 1) as usize - 1;
                actions.push(Action::MoveCursor(CursorMove::Absolute { row, col }));
            }
            b'L' => actions.push(Action::InsertLines(n)),
            b'M' => actions.push(Action::DeleteLines(n)),
            b'@' => actions.push(Action::InsertChars(n)),
            b'P' => actions.push(Action::DeleteChars(n)),
            b'X' => actions.push(Action::EraseChars(n)),
            b'S' => actions.push(Action::ScrollTextUp(n)),
            b'T' => actions.push(Action::ScrollTextDown(n)),
            b'r' => actions.push(Action::SetScrollRegion {
                top: self.params.get_or(0, 0),
                bottom: self.params.get_or(1, 0),
            }),
            b'n' => match self.params.get_or(0, 0) {
                5 => actions.push(Action::ReportDeviceStatus),
                6 => actions.push(Action::ReportCursorPosition),
                mode => log::debug!("ignoring DSR mode {}", mode),
            },
            b'h' | b'l' => {
                let on = final_byte == b'h';
                let private = self.private;
                for param in self.params.iter() {
                    match (private, param) {
                        (true, 1049) => actions.push(Action::SetAlternateBuffer(on)),
                        (true, 25) => actions.push(Action::SetCursorVisible(on)),
                        (true, 7) => actions.push(Action::SetAutoWrap(on)),
                        (true, 1) => actions.push(Action::SetAppCursorKeys(on)),
                        (false, 4) => actions.push(Action::SetInsertMode(on)),
                        _ => log::debug!(
                            "ignoring mode {}{} {}",
                            if private { "?" } else { "" },
                            param,
                            if on { "h" } else { "l" }
                        ),
                    }
                }
            }
            b's' => actions.push(Action::SaveCursor),
            b'u' => actions.push(Action::RestoreCursor),
            _ => {
                log::debug!("ignoring CSI final {:?}", final_byte as char);
            }
        }
    }

    /// Apply an SGR parameter list to the current attributes
    fn apply_sgr(&mut self) {
        if self.params.is_empty() {
            self.attrs.reset();
            return;
        }

        let params: Vec<u16> = self.params.iter().collect();
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => self.attrs.reset(),
                1 => self.attrs.flags.set(CellFlags::BOLD, true),
                3 => self.attrs.flags.set(CellFlags::ITALIC, true),
                4 => self.attrs.flags.set(CellFlags::UNDERLINE, true),
                5 => self.attrs.flags.set(CellFlags::BLINK, true),
                7 => self.attrs.flags.set(CellFlags::REVERSE, true),
                9 => self.attrs.flags.set(CellFlags::STRIKETHROUGH, true),
                22 => self.attrs.flags.set(CellFlags::BOLD, false),
                23 => self.attrs.flags.set(CellFlags::ITALIC, false),
                24 => self.attrs.flags.set(CellFlags::UNDERLINE, false),
                25 => self.attrs.flags.set(CellFlags::BLINK, false),
                27 => self.attrs.flags.set(CellFlags::REVERSE, false),
                29 => self.attrs.flags.set(CellFlags::STRIKETHROUGH, false),
                30..=37 => self.attrs.fg = Color::Ansi((params[i] - 30) as u8),
                90..=97 => self.attrs.fg = Color::Ansi((params[i] - 90 + 8) as u8),
                40..=47 => self.attrs.bg = Color::Ansi((params[i] - 40) as u8),
                100..=107 => self.attrs.bg = Color::Ansi((params[i] - 100 + 8) as u8),
                39 => self.attrs.fg = Color::Default,
                49 => self.attrs.bg = Color::Default,
                38 | 48 => {
                    let is_fg = params[i] == 38;
                    match params.get(i + 1) {
                        Some(&5) => {
                            let Some(&index) = params.get(i + 2) else {
                                return;
                            };
                            let color = Color::Indexed(index.min(255) as u8);
                            if is_fg {
                                self.attrs.fg = color;
                            } else {
                                self.attrs.bg = color;
                            }
                            i += 2;
                        }
                        Some(&2) => {
                            if i + 4 >= params.len() {
                                return;
                            }
                            let color = Color::Rgb(Rgb::new(
                                params[i + 2].min(255) as u8,
                                params[i + 3].min(255) as u8,
                                params[i + 4].min(255) as u8,
                            ));
                            if is_fg {
                                self.attrs.fg = color;
                            } else {
                                self.attrs.bg = color;
                            }
                            i += 4;
                        }
                        _ => {}
                    }
                }
                code => {
                    log::debug!("ignoring SGR {}", code);
                }
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &[u8]) -> Vec<Action> {
        Parser::new().parse(input)
    }

    fn default_attrs() -> Attributes {
        Attributes::default()
    }

    #[test]
    fn test_print_coalesces() {
        let actions = parse_all(b"Hello");
        assert_eq!(
            actions,
            vec![Action::PrintText {
                text: "Hello".to_string(),
                attrs: default_attrs(),
            }]
        );
    }

    #[test]
    fn test_control_characters() {
        let actions = parse_all(b"a\r\nb\x08\tc");
        assert_eq!(
            actions,
            vec![
                Action::PrintText { text: "a".to_string(), attrs: default_attrs() },
                Action::CarriageReturn,
                Action::Newline,
                Action::PrintText { text: "b".to_string(), attrs: default_attrs() },
                Action::Backspace,
                Action::Tab,
                Action::PrintText { text: "c".to_string(), attrs: default_attrs() },
            ]
        );
    }

    #[test]
    fn test_csi_cursor_up() {
        let actions = parse_all(b"\x1b[5A");
        assert_eq!(
            actions,
            vec![Action::MoveCursor(CursorMove::Relative { rows: -5, cols: 0 })]
        );
    }

    #[test]
    fn test_cursor_default_is_one() {
        let actions = parse_all(b"\x1b[C\x1b[0C");
        assert_eq!(
            actions,
            vec![
                Action::MoveCursor(CursorMove::Relative { rows: 0, cols: 1 }),
                Action::MoveCursor(CursorMove::Relative { rows: 0, cols: 1 }),
            ]
        );
    }

    #[test]
    fn test_cursor_position_is_zero_based() {
        let actions = parse_all(b"\x1b[10;20H");
        assert_eq!(
            actions,
            vec![Action::MoveCursor(CursorMove::Absolute { row: 9, col: 19 })]
        );
    }

    #[test]
    fn test_cursor_position_defaults() {
        assert_eq!(
            parse_all(b"\x1b[H"),
            vec![Action::MoveCursor(CursorMove::Absolute { row: 0, col: 0 })]
        );
        assert_eq!(
            parse_all(b"\x1b[;H"),
            vec![Action::MoveCursor(CursorMove::Absolute { row: 0, col: 0 })]
        );
        // A leading empty parameter defaults the row, not the column
        assert_eq!(
            parse_all(b"\x1b[;5H"),
            vec![Action::MoveCursor(CursorMove::Absolute { row: 0, col: 4 })]
        );
    }

    #[test]
    fn test_private_modes() {
        let actions = parse_all(b"\x1b[?1049h\x1b[?25l\x1b[?7l\x1b[?1h");
        assert_eq!(
            actions,
            vec![
                Action::SetAlternateBuffer(true),
                Action::SetCursorVisible(false),
                Action::SetAutoWrap(false),
                Action::SetAppCursorKeys(true),
            ]
        );
    }

    #[test]
    fn test_insert_mode_is_not_private() {
        assert_eq!(parse_all(b"\x1b[4h"), vec![Action::SetInsertMode(true)]);
        assert_eq!(parse_all(b"\x1b[4l"), vec![Action::SetInsertMode(false)]);
        // Private 4 is a different mode and is ignored
        assert_eq!(parse_all(b"\x1b[?4h"), vec![]);
    }

    #[test]
    fn test_unknown_modes_ignored() {
        assert_eq!(parse_all(b"\x1b[?2004h\x1b[12h"), vec![]);
    }

    #[test]
    fn test_sgr_attributes_flow_into_prints() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[31ma\x1b[32mb\x1b[0mc");

        let mut red = Attributes::default();
        red.fg = Color::Ansi(1);
        let mut green = Attributes::default();
        green.fg = Color::Ansi(2);

        assert_eq!(
            actions,
            vec![
                Action::SetAttributes(red),
                Action::PrintText { text: "a".to_string(), attrs: red },
                Action::SetAttributes(green),
                Action::PrintText { text: "b".to_string(), attrs: green },
                Action::SetAttributes(default_attrs()),
                Action::PrintText { text: "c".to_string(), attrs: default_attrs() },
            ]
        );
    }

    #[test]
    fn test_sgr_reset_is_idempotent() {
        let mut parser = Parser::new();
        parser.parse(b"\x1b[1;31;44m");
        parser.parse(b"\x1b[0m");
        let once = *parser.attributes();
        parser.parse(b"\x1b[0m");
        assert_eq!(*parser.attributes(), once);
        assert_eq!(once, Attributes::default());
    }

    #[test]
    fn test_sgr_extended_colors() {
        let mut parser = Parser::new();
        parser.parse(b"\x1b[38;5;196m");
        assert_eq!(parser.attributes().fg, Color::Indexed(196));
        parser.parse(b"\x1b[48;2;10;20;30m");
        assert_eq!(parser.attributes().bg, Color::Rgb(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn test_sgr_truncated_extended_is_ignored() {
        let mut parser = Parser::new();
        parser.parse(b"\x1b[38;5m");
        assert_eq!(parser.attributes().fg, Color::Default);
        parser.parse(b"\x1b[38;2;1;2m");
        assert_eq!(parser.attributes().fg, Color::Default);
    }

    #[test]
    fn test_esc_dispatch() {
        assert_eq!(parse_all(b"\x1bM"), vec![Action::ReverseIndex]);
        assert_eq!(parse_all(b"\x1bE"), vec![Action::NextLine]);
        assert_eq!(parse_all(b"\x1bD"), vec![Action::Index]);
        assert_eq!(parse_all(b"\x1b7"), vec![Action::SaveCursor]);
        assert_eq!(parse_all(b"\x1b8"), vec![Action::RestoreCursor]);
    }

    #[test]
    fn test_scroll_region_raw_params() {
        assert_eq!(
            parse_all(b"\x1b[2;5r"),
            vec![Action::SetScrollRegion { top: 2, bottom: 5 }]
        );
        assert_eq!(
            parse_all(b"\x1b[r"),
            vec![Action::SetScrollRegion { top: 0, bottom: 0 }]
        );
    }

    #[test]
    fn test_dsr() {
        assert_eq!(parse_all(b"\x1b[5n"), vec![Action::ReportDeviceStatus]);
        assert_eq!(parse_all(b"\x1b[6n"), vec![Action::ReportCursorPosition]);
        assert_eq!(parse_all(b"\x1b[1n"), vec![]);
    }

    #[test]
    fn test_chunk_boundary_in_csi() {
        let mut parser = Parser::new();
        assert!(parser.parse(b"\x1b[").is_empty());
        assert!(parser.parse(b"5").is_empty());
        let actions = parser.parse(b"A");
        assert_eq!(
            actions,
            vec![Action::MoveCursor(CursorMove::Relative { rows: -5, cols: 0 })]
        );
    }

    #[test]
    fn test_partial_utf8_carry_over() {
        let mut parser = Parser::new();
        assert!(parser.parse(&[0xE0]).is_empty());
        assert_eq!(parser.pending_utf8(), 1);
        assert!(parser.parse(&[0xA4]).is_empty());
        assert_eq!(parser.pending_utf8(), 2);
        let actions = parser.parse(&[0xB9]);
        assert_eq!(
            actions,
            vec![Action::PrintText {
                text: "\u{0939}".to_string(),
                attrs: default_attrs(),
            }]
        );
        assert_eq!(parser.pending_utf8(), 0);
    }

    #[test]
    fn test_invalid_utf8_replacement() {
        let actions = parse_all(&[0xFF, b'a']);
        assert_eq!(
            actions,
            vec![Action::PrintText {
                text: "\u{FFFD}a".to_string(),
                attrs: default_attrs(),
            }]
        );
    }

    #[test]
    fn test_interrupted_utf8_keeps_next_byte() {
        let actions = parse_all(&[0xC3, b'A']);
        assert_eq!(
            actions,
            vec![Action::PrintText {
                text: "\u{FFFD}A".to_string(),
                attrs: default_attrs(),
            }]
        );
    }

    #[test]
    fn test_osc_is_consumed() {
        assert_eq!(parse_all(b"\x1b]0;My Title\x07after"), vec![
            Action::PrintText { text: "after".to_string(), attrs: default_attrs() }
        ]);
        assert_eq!(parse_all(b"\x1b]2;Title\x1b\\after"), vec![
            Action::PrintText { text: "after".to_string(), attrs: default_attrs() }
        ]);
    }

    #[test]
    fn test_charset_designation_consumed() {
        assert_eq!(parse_all(b"\x1b(Bok"), vec![
            Action::PrintText { text: "ok".to_string(), attrs: default_attrs() }
        ]);
    }

    #[test]
    fn test_malformed_csi_swallowed() {
        // The 0x01 drops the sequence into the ignore state; everything up
        // to and including the final byte is lost
        let actions = parse_all(b"\x1b[12\x01mX");
        assert_eq!(actions, vec![
            Action::PrintText { text: "X".to_string(), attrs: default_attrs() }
        ]);
    }

    #[test]
    fn test_esc_restarts_inside_csi() {
        let actions = parse_all(b"\x1b[12\x1b[3AX");
        assert_eq!(actions, vec![
            Action::MoveCursor(CursorMove::Relative { rows: -3, cols: 0 }),
            Action::PrintText { text: "X".to_string(), attrs: default_attrs() },
        ]);
    }

    #[test]
    fn test_never_panics_on_garbage() {
        let mut parser = Parser::new();
        let garbage: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
        for _ in 0..4 {
            parser.parse(&garbage);
        }
        let wild = [0x1b, b'[', 0xFF, 0x9B, b';', b';', 0x1b, 0x1b, b']', 0x18, 0xF4, 0x90];
        parser.parse(&wild);
    }

    #[test]
    fn test_streaming_equivalence() {
        let input: &[u8] = "a\x1b[31mb\u{0939}\x1b[2Jc\r\n".as_bytes();
        let whole = parse_all(input);
        for split in 1..input.len() {
            let mut parser = Parser::new();
            let mut actions = parser.parse(&input[..split]);
            actions.extend(parser.parse(&input[split..]));
            // Join adjacent prints with equal attributes; chunk boundaries
            // may split a run but never reorder or change its content
            assert_eq!(join_prints(actions), join_prints(whole.clone()));
        }
    }

    fn join_prints(actions: Vec<Action>) -> Vec<Action> {
        let mut out: Vec<Action> = Vec::new();
        for action in actions {
            if let Action::PrintText { text, attrs } = &action {
                if let Some(Action::PrintText { text: last, attrs: last_attrs }) = out.last_mut() {
                    if *last_attrs == *attrs {
                        last.push_str(text);
                        continue;
                    }
                }
            }
            out.push(action);
        }
        out
    }
}
