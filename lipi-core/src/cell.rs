//! Terminal cell representation
//!
//! A cell is one character position in the grid. Its content is a grapheme
//! cluster: one base codepoint plus any zero-width combining marks that
//! followed it. An empty content string means the cell was never written;
//! a single space is a visible blank.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Flags for cell text attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellFlags {
    bits: u8,
}

impl CellFlags {
    pub const BOLD: u8 = 1 << 0;
    pub const ITALIC: u8 = 1 << 1;
    pub const UNDERLINE: u8 = 1 << 2;
    pub const BLINK: u8 = 1 << 3;
    pub const REVERSE: u8 = 1 << 4;
    pub const STRIKETHROUGH: u8 = 1 << 5;

    pub const fn empty() -> Self {
        CellFlags { bits: 0 }
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.bits & flag != 0
    }

    pub fn set(&mut self, flag: u8, value: bool) {
        if value {
            self.bits |= flag;
        } else {
            self.bits &= !flag;
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

/// Graphic attributes applied to written cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    pub fg: Color,
    pub bg: Color,
    pub flags: CellFlags,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all attributes to default
    pub fn reset(&mut self) {
        *self = Attributes::default();
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Grapheme cluster stored in this cell; empty means unwritten
    pub content: String,
    /// Attributes the cell was written or erased with
    pub attrs: Attributes,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            content: String::new(),
            attrs: Attributes::default(),
        }
    }
}

impl Cell {
    /// Create a cell holding a single base character
    pub fn new(c: char, attrs: Attributes) -> Self {
        Cell {
            content: c.to_string(),
            attrs,
        }
    }

    /// An erased cell: no content, but carrying the erasing attributes
    pub fn erased(attrs: Attributes) -> Self {
        Cell {
            content: String::new(),
            attrs,
        }
    }

    /// Whether the cell was never written (or has been erased)
    pub fn is_unwritten(&self) -> bool {
        self.content.is_empty()
    }

    /// Append a zero-width combining mark to this cell's cluster
    pub fn push_mark(&mut self, c: char) {
        self.content.push(c);
    }
}

/// Whether a codepoint is a zero-width combining mark for grid purposes.
///
/// Covers the combining diacriticals block, the zero-width (non-)joiners,
/// and the Devanagari combining ranges.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'
        | '\u{200C}'
        | '\u{200D}'
        | '\u{0900}'..='\u{0903}'
        | '\u{093A}'..='\u{094F}'
        | '\u{0951}'..='\u{0957}'
        | '\u{0962}'..='\u{0963}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_default_unwritten() {
        let cell = Cell::default();
        assert!(cell.is_unwritten());
        assert_eq!(cell.attrs, Attributes::default());
    }

    #[test]
    fn test_cell_new() {
        let cell = Cell::new('A', Attributes::default());
        assert_eq!(cell.content, "A");
        assert!(!cell.is_unwritten());
    }

    #[test]
    fn test_space_is_written() {
        let cell = Cell::new(' ', Attributes::default());
        assert!(!cell.is_unwritten());
    }

    #[test]
    fn test_push_mark() {
        let mut cell = Cell::new('e', Attributes::default());
        cell.push_mark('\u{0301}');
        assert_eq!(cell.content, "e\u{0301}");
    }

    #[test]
    fn test_cell_flags() {
        let mut flags = CellFlags::empty();
        assert!(!flags.contains(CellFlags::BOLD));

        flags.set(CellFlags::BOLD, true);
        flags.set(CellFlags::ITALIC, true);
        assert!(flags.contains(CellFlags::BOLD));
        assert!(flags.contains(CellFlags::ITALIC));

        flags.set(CellFlags::BOLD, false);
        assert!(!flags.contains(CellFlags::BOLD));
        assert!(flags.contains(CellFlags::ITALIC));
    }

    #[test]
    fn test_attributes_reset() {
        let mut attrs = Attributes::default();
        attrs.fg = Color::Ansi(1);
        attrs.flags.set(CellFlags::BOLD, true);
        attrs.reset();
        assert_eq!(attrs, Attributes::default());
    }

    #[test]
    fn test_combining_classification() {
        assert!(is_combining_mark('\u{0301}'));
        assert!(is_combining_mark('\u{200D}'));
        assert!(is_combining_mark('\u{093E}'));
        assert!(is_combining_mark('\u{0951}'));
        assert!(!is_combining_mark('a'));
        assert!(!is_combining_mark('\u{0939}'));
    }
}
