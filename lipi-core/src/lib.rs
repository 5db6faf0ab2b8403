//! lipi terminal core
//!
//! Platform-independent terminal state:
//! - Cell grid with primary/alternate screen semantics
//! - Styled-segment line history for the primary screen
//! - Scroll-view offset over the history
//! - Deterministic, serializable snapshots for testing
//!
//! This crate has no GUI or OS dependencies and can be driven headlessly.

pub mod cell;
pub mod color;
pub mod history;
pub mod row;
pub mod screen;
pub mod scrollback;
pub mod snapshot;

pub use cell::{is_combining_mark, Attributes, Cell, CellFlags};
pub use color::{default_256_palette, Color, Rgb};
pub use history::{History, HistoryLine, Segment};
pub use row::Row;
pub use screen::{Cursor, ScreenState};
pub use scrollback::ScrollView;
pub use snapshot::Snapshot;

pub const DEFAULT_ROWS: usize = 24;
pub const DEFAULT_COLS: usize = 80;
