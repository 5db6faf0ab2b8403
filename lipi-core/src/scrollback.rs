//! Scroll-view offset over the history.
//!
//! Offset 0 shows the newest line at the bottom. Scrolling up increases
//! the offset, clamped to the number of history lines; any new output
//! resets the view so the terminal follows the tail.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScrollView {
    offset: usize,
}

impl ScrollView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn scroll_up(&mut self, history_len: usize) {
        self.offset = (self.offset + 1).min(history_len);
    }

    pub fn scroll_down(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    pub fn page_up(&mut self, page: usize, history_len: usize) {
        self.offset = (self.offset + page).min(history_len);
    }

    pub fn page_down(&mut self, page: usize) {
        self.offset = self.offset.saturating_sub(page);
    }

    /// Jump back to the live tail
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Re-clamp after the history shrank (full clear)
    pub fn clamp(&mut self, history_len: usize) {
        self.offset = self.offset.min(history_len);
    }
}
