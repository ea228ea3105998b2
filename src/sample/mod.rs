//! Dialect inference over a bounded prefix of a delimited text file
//!
//! The sampler reads the file in fixed-size windows, decodes them as text,
//! and scans character by character until it has seen the requested number
//! of lines or the end of the file.

pub mod operations;
pub mod scanner;
pub mod types;

pub use operations::sample_file;
pub use scanner::DialectScanner;
pub use types::{SampleOptions, SampleResult};
