//! Terminal state management.
//!
//! Glues the parser to the screen and history models: one `Terminal` owns
//! the parser, both screen buffers, the history, the scroll view, preedit
//! state, and the queue of response bytes (DSR answers) the host loop
//! writes back to the PTY.

use lipi_core::{History, ScreenState, ScrollView, Snapshot};
use lipi_parser::{Action, CursorMove, Parser};
use lipi_pty::EOT;

pub struct Terminal {
    parser: Parser,
    primary: ScreenState,
    alternate: ScreenState,
    /// Which buffer is active
    alt_active: bool,
    /// Once the alternate screen has been entered, the history stays
    /// frozen for the rest of the session
    alt_ever_entered: bool,
    history: History,
    view: ScrollView,
    /// IME composition text and cursor offset within it
    preedit: Option<(String, usize)>,
    /// Responses waiting to be written back to the PTY
    pending_responses: Vec<Vec<u8>>,
    /// Set once the PTY adapter surfaced the EOT sentinel
    exited: bool,
}

impl Terminal {
    pub fn new(rows: usize, cols: usize) -> Self {
        Terminal {
            parser: Parser::new(),
            primary: ScreenState::new(rows, cols),
            alternate: ScreenState::new(rows, cols),
            alt_active: false,
            alt_ever_entered: false,
            history: History::new(),
            view: ScrollView::new(),
            preedit: None,
            pending_responses: Vec::new(),
            exited: false,
        }
    }

    /// The active screen
    pub fn screen(&self) -> &ScreenState {
        if self.alt_active {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn screen_mut(&mut self) -> &mut ScreenState {
        if self.alt_active {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    pub fn alternate_active(&self) -> bool {
        self.alt_active
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn scroll_offset(&self) -> usize {
        self.view.offset()
    }

    pub fn preedit(&self) -> Option<(&str, usize)> {
        self.preedit.as_ref().map(|(text, cursor)| (text.as_str(), *cursor))
    }

    pub fn app_cursor_keys(&self) -> bool {
        self.screen().app_cursor_keys
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    /// Carried-over bytes of an incomplete UTF-8 sequence
    #[allow(dead_code)]
    pub fn pending_utf8(&self) -> usize {
        self.parser.pending_utf8()
    }

    /// Process one chunk of PTY output.
    ///
    /// A chunk consisting of the single EOT sentinel marks shell exit;
    /// anything else is parsed and applied in order.
    pub fn process(&mut self, bytes: &[u8]) {
        if bytes.len() == 1 && bytes[0] == EOT {
            self.exited = true;
            return;
        }
        for action in self.parser.parse(bytes) {
            self.apply(action);
        }
    }

    fn apply(&mut self, action: Action) {
        let history_live = !self.alt_active && !self.alt_ever_entered;
        match action {
            Action::PrintText { text, attrs } => {
                if history_live {
                    self.history.print(&text, &attrs);
                }
                let screen = self.screen_mut();
                for c in text.chars() {
                    screen.write_char(c, &attrs);
                }
            }
            Action::Newline => {
                if history_live {
                    self.history.newline();
                }
                self.view.reset();
                // LF starts the next line at column 0 here; ESC D is the
                // column-preserving motion
                self.screen_mut().next_line();
            }
            Action::CarriageReturn => {
                // The history model deliberately ignores CR
                self.screen_mut().carriage_return();
            }
            Action::Backspace => {
                if history_live {
                    self.history.backspace();
                }
                self.screen_mut().backspace();
            }
            Action::Tab => self.screen_mut().tab(),
            Action::Index => self.screen_mut().newline(),
            Action::ReverseIndex => self.screen_mut().reverse_index(),
            Action::NextLine => self.screen_mut().next_line(),
            Action::SaveCursor => self.screen_mut().save_cursor(),
            Action::RestoreCursor => self.screen_mut().restore_cursor(),
            // Attributes ride on the print and erase actions themselves
            Action::SetAttributes(_) => {}
            Action::ClearScreen { mode, attrs } => {
                if history_live {
                    self.history.clear();
                    self.view.reset();
                }
                self.screen_mut().erase_in_display(mode, attrs);
            }
            Action::ClearLine { mode, attrs } => self.screen_mut().erase_in_line(mode, attrs),
            Action::MoveCursor(CursorMove::Relative { rows, cols }) => {
                self.screen_mut().move_relative(rows, cols);
            }
            Action::MoveCursor(CursorMove::Absolute { row, col }) => {
                self.screen_mut().move_to(row, col);
            }
            Action::InsertLines(n) => self.screen_mut().insert_lines(n),
            Action::DeleteLines(n) => self.screen_mut().delete_lines(n),
            Action::InsertChars(n) => self.screen_mut().insert_chars(n),
            Action::DeleteChars(n) => self.screen_mut().delete_chars(n),
            Action::EraseChars(n) => self.screen_mut().erase_chars(n),
            Action::ScrollTextUp(n) => self.screen_mut().scroll_text_up(n),
            Action::ScrollTextDown(n) => self.screen_mut().scroll_text_down(n),
            Action::SetScrollRegion { top, bottom } => {
                self.screen_mut().set_scroll_region(top, bottom);
            }
            Action::ReportDeviceStatus => {
                self.pending_responses.push(b"\x1b[0n".to_vec());
            }
            Action::ReportCursorPosition => {
                let cursor = self.screen().cursor;
                let response = format!("\x1b[{};{}R", cursor.row + 1, cursor.col + 1);
                self.pending_responses.push(response.into_bytes());
            }
            Action::SetAlternateBuffer(on) => self.set_alternate(on),
            Action::SetCursorVisible(visible) => self.screen_mut().cursor_visible = visible,
            Action::SetAutoWrap(on) => self.screen_mut().auto_wrap = on,
            Action::SetAppCursorKeys(on) => self.screen_mut().app_cursor_keys = on,
            Action::SetInsertMode(on) => self.screen_mut().insert_mode = on,
        }
    }

    /// Enter or leave the alternate screen. Entry clears the alternate
    /// grid and homes its cursor; exit switches back with the primary
    /// exactly as it was.
    fn set_alternate(&mut self, on: bool) {
        if on && !self.alt_active {
            self.alt_active = true;
            self.alt_ever_entered = true;
            self.alternate.clear_all();
        } else if !on && self.alt_active {
            self.alt_active = false;
        }
    }

    /// Drain the queued DSR responses for the PTY
    pub fn take_pending_responses(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_responses)
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.primary.resize(rows, cols);
        self.alternate.resize(rows, cols);
    }

    pub fn set_preedit(&mut self, text: &str, cursor: usize) {
        if text.is_empty() {
            self.preedit = None;
        } else {
            self.preedit = Some((text.to_string(), cursor));
        }
    }

    pub fn clear_preedit(&mut self) {
        self.preedit = None;
    }

    /// Local scrollback navigation (Shift+Up). No bytes reach the shell.
    pub fn scroll_line_up(&mut self) {
        if !self.alt_active {
            self.view.scroll_up(self.history.len());
        }
    }

    pub fn scroll_line_down(&mut self) {
        self.view.scroll_down();
    }

    pub fn scroll_page_up(&mut self) {
        if !self.alt_active {
            let page = self.screen().rows();
            self.view.page_up(page, self.history.len());
        }
    }

    pub fn scroll_page_down(&mut self) {
        let page = self.screen().rows();
        self.view.page_down(page);
    }

    #[allow(dead_code)]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            self.screen(),
            self.alt_active,
            &self.history,
            self.view.offset(),
            self.preedit.as_ref().map(|(text, _)| text.as_str()),
        )
    }
}
