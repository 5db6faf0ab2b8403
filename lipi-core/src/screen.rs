//! Screen state for one terminal buffer.
//!
//! A `ScreenState` owns a fixed `rows x cols` grid of cells, the cursor,
//! the delayed-wrap flag, the scroll region, and the per-buffer modes. The
//! terminal keeps two of these (primary and alternate) and switches a flag
//! between them.
//!
//! Every operation clamps its indices; bad parameters from a misbehaving
//! program can never panic or grow the grid.

use serde::{Deserialize, Serialize};

use crate::cell::{is_combining_mark, Attributes, Cell};
use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SavedCursor {
    row: usize,
    col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenState {
    rows: usize,
    cols: usize,
    grid: Vec<Row>,

    pub cursor: Cursor,
    saved_cursor: Option<SavedCursor>,

    wrap_next: bool,
    pub auto_wrap: bool,
    pub insert_mode: bool,
    pub cursor_visible: bool,
    pub app_cursor_keys: bool,

    scroll_top: usize,
    scroll_bottom: usize,
}

impl ScreenState {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        ScreenState {
            rows,
            cols,
            grid: (0..rows).map(|_| Row::new(cols)).collect(),
            cursor: Cursor::default(),
            saved_cursor: None,
            wrap_next: false,
            auto_wrap: true,
            insert_mode: false,
            cursor_visible: true,
            app_cursor_keys: false,
            scroll_top: 0,
            scroll_bottom: rows - 1,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn wrap_next(&self) -> bool {
        self.wrap_next
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn line(&self, row: usize) -> Option<&Row> {
        self.grid.get(row)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid.get(row).and_then(|r| r.get(col))
    }

    /// Write one decoded codepoint at the cursor.
    ///
    /// Combining marks attach to the previously written cell and do not
    /// advance. Base characters honor delayed wrap and insert mode.
    pub fn write_char(&mut self, c: char, attrs: &Attributes) {
        if is_combining_mark(c) {
            // With delayed wrap pending the cursor still sits on the base
            // character; otherwise the base is one cell behind
            let target = if self.wrap_next {
                Some((self.cursor.row, self.cursor.col))
            } else if self.cursor.col > 0 {
                Some((self.cursor.row, self.cursor.col - 1))
            } else {
                // Combining mark at row start has no anchor
                None
            };
            if let Some((row, col)) = target {
                if let Some(cell) = self.grid.get_mut(row).and_then(|r| r.get_mut(col)) {
                    cell.push_mark(c);
                }
            }
            return;
        }

        if self.auto_wrap && self.wrap_next {
            self.wrap_next = false;
            self.cursor.col = 0;
            if self.cursor.row == self.scroll_bottom {
                self.scroll_up();
            } else if self.cursor.row + 1 < self.rows {
                self.cursor.row += 1;
            }
        }

        let col = self.cursor.col.min(self.cols - 1);
        self.cursor.col = col;
        let row = self.cursor.row.min(self.rows - 1);

        if self.insert_mode {
            if let Some(line) = self.grid.get_mut(row) {
                line.insert_blanks(col, 1);
            }
        }
        if let Some(line) = self.grid.get_mut(row) {
            line.set(col, Cell::new(c, *attrs));
        }

        if col + 1 >= self.cols {
            if self.auto_wrap {
                self.wrap_next = true;
            }
        } else {
            self.cursor.col = col + 1;
            self.wrap_next = false;
        }
    }

    /// LF: move down one row, scrolling when at the region bottom. The
    /// column is unchanged.
    pub fn newline(&mut self) {
        self.wrap_next = false;
        if self.cursor.row == self.scroll_bottom {
            self.scroll_up();
        } else if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
        }
    }

    /// NEL: column to 0, then as newline
    pub fn next_line(&mut self) {
        self.cursor.col = 0;
        self.newline();
    }

    /// RI: move up one row, scrolling down when at the region top
    pub fn reverse_index(&mut self) {
        self.wrap_next = false;
        if self.cursor.row == self.scroll_top {
            self.scroll_down();
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    pub fn carriage_return(&mut self) {
        self.wrap_next = false;
        self.cursor.col = 0;
    }

    pub fn backspace(&mut self) {
        self.wrap_next = false;
        self.cursor.col = self.cursor.col.saturating_sub(1);
    }

    /// HT: fixed tab stops every 8 columns
    pub fn tab(&mut self) {
        self.wrap_next = false;
        self.cursor.col = ((self.cursor.col / 8 + 1) * 8).min(self.cols - 1);
    }

    pub fn move_relative(&mut self, d_rows: i32, d_cols: i32) {
        self.wrap_next = false;
        let row = self.cursor.row as i64 + d_rows as i64;
        let col = self.cursor.col as i64 + d_cols as i64;
        self.cursor.row = row.clamp(0, self.rows as i64 - 1) as usize;
        self.cursor.col = col.clamp(0, self.cols as i64 - 1) as usize;
    }

    pub fn move_to(&mut self, row: usize, col: usize) {
        self.wrap_next = false;
        self.cursor.row = row.min(self.rows - 1);
        self.cursor.col = col.min(self.cols - 1);
    }

    /// ED: erase in display. Mode 0 erases from the cursor to the end,
    /// mode 1 from the start through the cursor, modes 2 and 3 everything.
    /// The cursor does not move.
    pub fn erase_in_display(&mut self, mode: u16, attrs: Attributes) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        let cols = self.cols;
        match mode {
            0 => {
                if let Some(line) = self.grid.get_mut(row) {
                    line.clear_range_with(col, cols, attrs);
                }
                for r in (row + 1)..self.rows {
                    self.grid[r].clear_with(attrs);
                }
            }
            1 => {
                for r in 0..row {
                    self.grid[r].clear_with(attrs);
                }
                if let Some(line) = self.grid.get_mut(row) {
                    line.clear_range_with(0, col + 1, attrs);
                }
            }
            2 | 3 => {
                for line in &mut self.grid {
                    line.clear_with(attrs);
                }
            }
            _ => {}
        }
    }

    /// EL: erase in line. Mode 0 to the end, mode 1 from the start through
    /// the cursor, mode 2 the whole row.
    pub fn erase_in_line(&mut self, mode: u16, attrs: Attributes) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        let cols = self.cols;
        if let Some(line) = self.grid.get_mut(row) {
            match mode {
                0 => line.clear_range_with(col, cols, attrs),
                1 => line.clear_range_with(0, col + 1, attrs),
                2 => line.clear_with(attrs),
                _ => {}
            }
        }
    }

    /// ECH: erase `count` cells starting at the cursor
    pub fn erase_chars(&mut self, count: usize) {
        let (row, col) = (self.cursor.row, self.cursor.col);
        let end = col.saturating_add(count).min(self.cols);
        if let Some(line) = self.grid.get_mut(row) {
            line.clear_range_with(col, end, Attributes::default());
        }
    }

    /// IL: insert blank lines at the cursor, only inside the scroll region
    pub fn insert_lines(&mut self, count: usize) {
        self.wrap_next = false;
        let row = self.cursor.row;
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        let count = count.min(self.scroll_bottom - row + 1);
        for _ in 0..count {
            self.grid.remove(self.scroll_bottom);
            self.grid.insert(row, Row::new(self.cols));
        }
    }

    /// DL: delete lines at the cursor, only inside the scroll region
    pub fn delete_lines(&mut self, count: usize) {
        self.wrap_next = false;
        let row = self.cursor.row;
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        let count = count.min(self.scroll_bottom - row + 1);
        for _ in 0..count {
            self.grid.remove(row);
            self.grid.insert(self.scroll_bottom, Row::new(self.cols));
        }
    }

    /// ICH: insert blank cells at the cursor, pushing the rest right
    pub fn insert_chars(&mut self, count: usize) {
        self.wrap_next = false;
        let (row, col) = (self.cursor.row, self.cursor.col);
        if let Some(line) = self.grid.get_mut(row) {
            line.insert_blanks(col, count);
        }
    }

    /// DCH: delete cells at the cursor, pulling the rest left
    pub fn delete_chars(&mut self, count: usize) {
        self.wrap_next = false;
        let (row, col) = (self.cursor.row, self.cursor.col);
        if let Some(line) = self.grid.get_mut(row) {
            line.delete_cells(col, count);
        }
    }

    /// Remove the top row of the scroll region and append a blank row
    /// after the bottom
    pub fn scroll_up(&mut self) {
        self.grid.remove(self.scroll_top);
        self.grid.insert(self.scroll_bottom, Row::new(self.cols));
    }

    /// Insert a blank row at the region top and drop the row after the
    /// bottom
    pub fn scroll_down(&mut self) {
        self.grid.remove(self.scroll_bottom);
        self.grid.insert(self.scroll_top, Row::new(self.cols));
    }

    /// SU: scroll the region up `count` lines
    pub fn scroll_text_up(&mut self, count: usize) {
        let count = count.min(self.scroll_bottom - self.scroll_top + 1);
        for _ in 0..count {
            self.scroll_up();
        }
    }

    /// SD: scroll the region down `count` lines
    pub fn scroll_text_down(&mut self, count: usize) {
        let count = count.min(self.scroll_bottom - self.scroll_top + 1);
        for _ in 0..count {
            self.scroll_down();
        }
    }

    /// DECSTBM with raw 1-based parameters; 0 selects the default.
    /// Ignored unless the result satisfies top < bottom. Homes the cursor.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let top = if top == 0 {
            0
        } else {
            (top as usize - 1).min(self.rows - 1)
        };
        let bottom = if bottom == 0 {
            self.rows - 1
        } else {
            (bottom as usize - 1).min(self.rows - 1)
        };
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
            self.move_to(0, 0);
        }
    }

    /// DECSC: capture row and column
    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
        });
    }

    /// DECRC: restore the saved position clamped to the grid and clear the
    /// delayed-wrap flag. Without a prior save the cursor goes home.
    pub fn restore_cursor(&mut self) {
        let saved = self.saved_cursor.unwrap_or(SavedCursor { row: 0, col: 0 });
        self.cursor.row = saved.row.min(self.rows - 1);
        self.cursor.col = saved.col.min(self.cols - 1);
        self.wrap_next = false;
    }

    /// Erase the whole grid and home the cursor; used on alternate-screen
    /// entry
    pub fn clear_all(&mut self) {
        for line in &mut self.grid {
            line.clear_with(Attributes::default());
        }
        self.cursor = Cursor::default();
        self.wrap_next = false;
    }

    pub fn resize(&mut self, new_rows: usize, new_cols: usize) {
        let new_rows = new_rows.max(1);
        let new_cols = new_cols.max(1);
        if new_rows == self.rows && new_cols == self.cols {
            return;
        }

        for line in &mut self.grid {
            line.resize(new_cols);
        }
        while self.grid.len() < new_rows {
            self.grid.push(Row::new(new_cols));
        }
        while self.grid.len() > new_rows {
            self.grid.remove(0);
        }

        self.rows = new_rows;
        self.cols = new_cols;
        self.scroll_top = 0;
        self.scroll_bottom = new_rows - 1;
        self.cursor.row = self.cursor.row.min(new_rows - 1);
        self.cursor.col = self.cursor.col.min(new_cols - 1);
        self.wrap_next = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellFlags;

    fn write_str(screen: &mut ScreenState, s: &str) {
        let attrs = Attributes::default();
        for c in s.chars() {
            screen.write_char(c, &attrs);
        }
    }

    fn check_invariants(screen: &ScreenState) {
        assert_eq!(screen.rows, screen.grid.len());
        for row in &screen.grid {
            assert_eq!(row.len(), screen.cols);
        }
        assert!(screen.cursor.row < screen.rows);
        assert!(screen.cursor.col < screen.cols);
    }

    #[test]
    fn test_write_advances_cursor() {
        let mut screen = ScreenState::new(5, 10);
        write_str(&mut screen, "hi");
        assert_eq!(screen.cell(0, 0).unwrap().content, "h");
        assert_eq!(screen.cell(0, 1).unwrap().content, "i");
        assert_eq!(screen.cursor, Cursor { row: 0, col: 2 });
        check_invariants(&screen);
    }

    #[test]
    fn test_delayed_wrap() {
        let mut screen = ScreenState::new(5, 10);
        write_str(&mut screen, "0123456789");
        assert_eq!(screen.cursor, Cursor { row: 0, col: 9 });
        assert!(screen.wrap_next());
        assert_eq!(screen.cell(0, 9).unwrap().content, "9");

        screen.write_char('X', &Attributes::default());
        assert_eq!(screen.cursor, Cursor { row: 1, col: 1 });
        assert!(!screen.wrap_next());
        assert_eq!(screen.cell(1, 0).unwrap().content, "X");
        check_invariants(&screen);
    }

    #[test]
    fn test_no_wrap_when_disabled() {
        let mut screen = ScreenState::new(5, 10);
        screen.auto_wrap = false;
        write_str(&mut screen, "0123456789AB");
        assert_eq!(screen.cursor, Cursor { row: 0, col: 9 });
        assert!(!screen.wrap_next());
        // Last write wins at the right edge
        assert_eq!(screen.cell(0, 9).unwrap().content, "B");
    }

    #[test]
    fn test_combining_mark_attaches() {
        let mut screen = ScreenState::new(5, 10);
        write_str(&mut screen, "e");
        screen.write_char('\u{0301}', &Attributes::default());
        assert_eq!(screen.cell(0, 0).unwrap().content, "e\u{0301}");
        assert_eq!(screen.cursor.col, 1);
    }

    #[test]
    fn test_combining_mark_at_wrap_edge() {
        let mut screen = ScreenState::new(5, 10);
        write_str(&mut screen, "0123456789");
        assert!(screen.wrap_next());
        screen.write_char('\u{0301}', &Attributes::default());
        // Attaches to the cell under the conceptual cursor, no wrap
        assert_eq!(screen.cell(0, 9).unwrap().content, "9\u{0301}");
        assert!(screen.wrap_next());
    }

    #[test]
    fn test_combining_mark_at_row_start_is_noop() {
        let mut screen = ScreenState::new(5, 10);
        screen.write_char('\u{0301}', &Attributes::default());
        assert!(screen.cell(0, 0).unwrap().is_unwritten());
        assert_eq!(screen.cursor.col, 0);
    }

    #[test]
    fn test_insert_mode_pushes_right() {
        let mut screen = ScreenState::new(5, 10);
        write_str(&mut screen, "ABC");
        screen.move_to(0, 0);
        screen.insert_mode = true;
        screen.write_char('X', &Attributes::default());
        assert_eq!(screen.line(0).unwrap().text(), "XABC      ");
    }

    #[test]
    fn test_newline_scrolls_at_bottom() {
        let mut screen = ScreenState::new(3, 10);
        write_str(&mut screen, "top");
        screen.move_to(2, 0);
        screen.newline();
        assert_eq!(screen.cursor.row, 2);
        // "top" scrolled off
        assert!(screen.cell(0, 0).unwrap().is_unwritten());
        check_invariants(&screen);
    }

    #[test]
    fn test_newline_keeps_column() {
        let mut screen = ScreenState::new(5, 10);
        screen.move_to(0, 4);
        screen.newline();
        assert_eq!(screen.cursor, Cursor { row: 1, col: 4 });
    }

    #[test]
    fn test_reverse_index_scrolls_at_top() {
        let mut screen = ScreenState::new(3, 10);
        write_str(&mut screen, "top");
        screen.move_to(0, 0);
        screen.reverse_index();
        assert_eq!(screen.cursor.row, 0);
        assert!(screen.cell(0, 0).unwrap().is_unwritten());
        assert_eq!(screen.cell(1, 0).unwrap().content, "t");
    }

    #[test]
    fn test_tab_stops() {
        let mut screen = ScreenState::new(5, 20);
        screen.tab();
        assert_eq!(screen.cursor.col, 8);
        screen.tab();
        assert_eq!(screen.cursor.col, 16);
        screen.tab();
        assert_eq!(screen.cursor.col, 19);
    }

    #[test]
    fn test_erase_in_display_forward() {
        let mut screen = ScreenState::new(3, 10);
        write_str(&mut screen, "ABCDEFGHIJ");
        screen.move_to(0, 5);
        screen.erase_in_display(0, Attributes::default());
        assert_eq!(screen.cell(0, 4).unwrap().content, "E");
        assert!(screen.cell(0, 5).unwrap().is_unwritten());
        assert_eq!(screen.cursor, Cursor { row: 0, col: 5 });
    }

    #[test]
    fn test_erase_in_display_backward_inclusive() {
        let mut screen = ScreenState::new(3, 10);
        write_str(&mut screen, "ABCDEFGHIJ");
        screen.move_to(0, 5);
        screen.erase_in_display(1, Attributes::default());
        assert!(screen.cell(0, 5).unwrap().is_unwritten());
        assert_eq!(screen.cell(0, 6).unwrap().content, "G");
    }

    #[test]
    fn test_erase_keeps_attributes() {
        let mut screen = ScreenState::new(3, 10);
        let mut attrs = Attributes::default();
        attrs.flags.set(CellFlags::REVERSE, true);
        screen.erase_in_line(2, attrs);
        let cell = screen.cell(0, 3).unwrap();
        assert!(cell.is_unwritten());
        assert!(cell.attrs.flags.contains(CellFlags::REVERSE));
    }

    #[test]
    fn test_insert_delete_lines_in_region() {
        let mut screen = ScreenState::new(5, 10);
        for i in 0..5 {
            screen.move_to(i, 0);
            write_str(&mut screen, &format!("L{}", i));
        }
        screen.set_scroll_region(2, 4);
        screen.move_to(1, 0);
        screen.insert_lines(1);
        assert_eq!(screen.line(1).unwrap().text().trim_end(), "");
        assert_eq!(screen.line(2).unwrap().text().trim_end(), "L1");
        // L3 dropped off the region bottom
        assert_eq!(screen.line(3).unwrap().text().trim_end(), "L2");
        assert_eq!(screen.line(4).unwrap().text().trim_end(), "L4");

        screen.delete_lines(1);
        assert_eq!(screen.line(1).unwrap().text().trim_end(), "L1");
        assert_eq!(screen.line(3).unwrap().text().trim_end(), "");
        check_invariants(&screen);
    }

    #[test]
    fn test_lines_outside_region_noop() {
        let mut screen = ScreenState::new(5, 10);
        for i in 0..5 {
            screen.move_to(i, 0);
            write_str(&mut screen, &format!("L{}", i));
        }
        screen.set_scroll_region(2, 4);
        screen.move_to(0, 0);
        let before: Vec<String> = (0..5).map(|r| screen.line(r).unwrap().text()).collect();
        screen.insert_lines(3);
        screen.delete_lines(3);
        let after: Vec<String> = (0..5).map(|r| screen.line(r).unwrap().text()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_huge_counts_are_clipped() {
        let mut screen = ScreenState::new(5, 10);
        screen.insert_lines(usize::MAX);
        screen.delete_lines(usize::MAX);
        screen.insert_chars(usize::MAX);
        screen.delete_chars(usize::MAX);
        screen.erase_chars(usize::MAX);
        screen.scroll_text_up(usize::MAX);
        screen.scroll_text_down(usize::MAX);
        check_invariants(&screen);
    }

    #[test]
    fn test_scroll_region_raw_params() {
        let mut screen = ScreenState::new(10, 20);
        // CSI 2;5r
        screen.set_scroll_region(2, 5);
        assert_eq!(screen.scroll_region(), (1, 4));
        assert_eq!(screen.cursor, Cursor { row: 0, col: 0 });
        // CSI r resets to full height
        screen.set_scroll_region(0, 0);
        assert_eq!(screen.scroll_region(), (0, 9));
        // Degenerate regions are ignored
        screen.set_scroll_region(5, 5);
        assert_eq!(screen.scroll_region(), (0, 9));
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut screen = ScreenState::new(5, 10);
        screen.move_to(3, 7);
        screen.save_cursor();
        screen.move_to(0, 0);
        screen.restore_cursor();
        assert_eq!(screen.cursor, Cursor { row: 3, col: 7 });
        assert!(!screen.wrap_next());
    }

    #[test]
    fn test_restore_without_save_goes_home() {
        let mut screen = ScreenState::new(5, 10);
        screen.move_to(3, 7);
        screen.restore_cursor();
        assert_eq!(screen.cursor, Cursor { row: 0, col: 0 });
    }

    #[test]
    fn test_restore_clamps_after_resize() {
        let mut screen = ScreenState::new(10, 40);
        screen.move_to(9, 39);
        screen.save_cursor();
        screen.resize(5, 10);
        screen.restore_cursor();
        assert_eq!(screen.cursor, Cursor { row: 4, col: 9 });
        check_invariants(&screen);
    }

    #[test]
    fn test_resize_keeps_bottom_rows() {
        let mut screen = ScreenState::new(4, 10);
        for i in 0..4 {
            screen.move_to(i, 0);
            write_str(&mut screen, &format!("L{}", i));
        }
        screen.resize(2, 10);
        assert_eq!(screen.line(0).unwrap().text().trim_end(), "L2");
        assert_eq!(screen.line(1).unwrap().text().trim_end(), "L3");
        check_invariants(&screen);
    }

    #[test]
    fn test_move_relative_clamps() {
        let mut screen = ScreenState::new(5, 10);
        screen.move_relative(-3, -3);
        assert_eq!(screen.cursor, Cursor { row: 0, col: 0 });
        screen.move_relative(100, 100);
        assert_eq!(screen.cursor, Cursor { row: 4, col: 9 });
    }
}
