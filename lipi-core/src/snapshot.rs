//! Owned terminal-state snapshots for testing and debugging.
//!
//! A snapshot captures the active grid, cursor, and view state in a
//! serializable form so tests can assert on whole screens
//! deterministically.

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::history::History;
use crate::screen::ScreenState;

/// A snapshot of the terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whether the alternate screen was active
    pub alternate: bool,
    pub rows: usize,
    pub cols: usize,
    /// Grid content in row-major order
    pub cells: Vec<Vec<CellSnapshot>>,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub cursor_visible: bool,
    pub scroll_offset: usize,
    /// Finished history lines as plain text
    pub history: Vec<String>,
    /// The in-progress history line as plain text
    pub active_line: String,
    pub preedit: Option<String>,
}

/// Snapshot of a single cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub content: String,
    pub fg: String,
    pub bg: String,
    pub flags: u8,
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        CellSnapshot {
            content: cell.content.clone(),
            fg: format!("{:?}", cell.attrs.fg),
            bg: format!("{:?}", cell.attrs.bg),
            flags: cell.attrs.flags.bits(),
        }
    }
}

impl Snapshot {
    pub fn capture(
        screen: &ScreenState,
        alternate: bool,
        history: &History,
        scroll_offset: usize,
        preedit: Option<&str>,
    ) -> Self {
        let cells = (0..screen.rows())
            .map(|row| {
                let line = screen.line(row).expect("row in range");
                line.cells().iter().map(CellSnapshot::from).collect()
            })
            .collect();

        Snapshot {
            alternate,
            rows: screen.rows(),
            cols: screen.cols(),
            cells,
            cursor_row: screen.cursor.row,
            cursor_col: screen.cursor.col,
            cursor_visible: screen.cursor_visible,
            scroll_offset,
            history: history.lines().iter().map(|l| l.text()).collect(),
            active_line: history.active_line().text(),
            preedit: preedit.map(str::to_string),
        }
    }

    /// Text of one row, unwritten cells as spaces, right-trimmed
    pub fn row_text(&self, row: usize) -> String {
        let Some(cells) = self.cells.get(row) else {
            return String::new();
        };
        let line: String = cells
            .iter()
            .map(|c| if c.content.is_empty() { " " } else { c.content.as_str() })
            .collect();
        line.trim_end().to_string()
    }

    /// Full-screen text, one line per row
    pub fn text(&self) -> String {
        (0..self.rows)
            .map(|r| self.row_text(r))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
