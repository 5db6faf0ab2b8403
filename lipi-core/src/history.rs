//! Line history for the primary screen.
//!
//! While the primary screen is active (and the alternate screen has never
//! been entered), completed lines are logged here as styled segments.
//! Adjacent segments with identical attributes are coalesced, so a
//! renderer can draw each segment in one run.
//!
//! Carriage return is deliberately a no-op in this model: resetting the
//! active line on CR would destroy `ls`-style output that ends lines with
//! CR LF.

use serde::{Deserialize, Serialize};

use crate::cell::Attributes;

/// A run of text sharing one set of attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub content: String,
    pub attrs: Attributes,
}

/// One finished (or in-progress) line of history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLine {
    pub segments: Vec<Segment>,
}

impl HistoryLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append text, merging into the last segment when attributes match
    pub fn push_text(&mut self, text: &str, attrs: &Attributes) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.segments.last_mut() {
            if last.attrs == *attrs {
                last.content.push_str(text);
                return;
            }
        }
        self.segments.push(Segment {
            content: text.to_string(),
            attrs: *attrs,
        });
    }

    /// Remove the last codepoint; empty segments are dropped
    pub fn pop_codepoint(&mut self) {
        if let Some(last) = self.segments.last_mut() {
            last.content.pop();
            if last.content.is_empty() {
                self.segments.pop();
            }
        }
    }

    /// Plain text of the line, attributes discarded
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.content.as_str()).collect()
    }
}

/// The append-only log of finished lines plus the line being built
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    lines: Vec<HistoryLine>,
    active: HistoryLine,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&HistoryLine> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[HistoryLine] {
        &self.lines
    }

    pub fn active_line(&self) -> &HistoryLine {
        &self.active
    }

    pub fn print(&mut self, text: &str, attrs: &Attributes) {
        self.active.push_text(text, attrs);
    }

    /// Finish the active line and start a new one
    pub fn newline(&mut self) {
        self.lines.push(std::mem::take(&mut self.active));
    }

    pub fn backspace(&mut self) {
        self.active.pop_codepoint();
    }

    /// Drop everything, including the active line
    pub fn clear(&mut self) {
        self.lines.clear();
        self.active = HistoryLine::new();
    }
}
