//! Row parsing for the confirmation preview
//!
//! Turns sampled text plus confirmed separators into a table of rows of
//! fields. Parsing is pure: no state survives between calls.

pub mod operations;
pub mod types;

pub use operations::{parse_rows, parse_rows_with_style};
pub use types::{ParsedTable, QuoteStyle};
