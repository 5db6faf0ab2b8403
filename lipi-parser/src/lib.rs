//! lipi escape-sequence parser
//!
//! Turns a byte stream from the PTY into an ordered sequence of typed
//! terminal actions:
//! - Incremental UTF-8 decoding with carry-over across chunks
//! - A five-state escape-sequence machine (Ground, Escape, CSI, String,
//!   Charset)
//! - Parser-owned graphic attributes, copied into every print action
//!
//! The parser is deterministic and never fails: corrupt input degrades to
//! Ground and continues.

pub mod action;
pub mod params;
pub mod parser;
pub mod utf8;

pub use action::{Action, CursorMove};
pub use params::Params;
pub use parser::Parser;
pub use utf8::{Utf8Decoder, Utf8Result};
