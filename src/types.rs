//! Shared dialect types and transfer constants

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Size of the byte windows used both for sampling and for chunked upload
pub const DEFAULT_CHUNK_SIZE: usize = 600_000;

/// Number of lines read by the sampler unless told otherwise
pub const DEFAULT_SAMPLE_LINES: usize = 200;

/// Payload of the terminal request that tells the receiver the file is complete
pub const CLOSE_FILE_SENTINEL: &str = "__CLOSEFILE__";

/// Field separators the sampler looks for, in tie-breaking order
pub const CANDIDATE_FIELD_SEPARATORS: [char; 4] = [',', ';', '|', '\t'];

/// Line terminator of a delimited text file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineSeparator {
    #[serde(rename = "LF")]
    Lf,
    #[serde(rename = "CR")]
    Cr,
    #[serde(rename = "CRLF")]
    CrLf,
}

impl LineSeparator {
    /// The literal terminator text
    pub fn as_str(&self) -> &'static str {
        match self {
            LineSeparator::Lf => "\n",
            LineSeparator::Cr => "\r",
            LineSeparator::CrLf => "\r\n",
        }
    }

    /// The protocol name (`LF`, `CR` or `CRLF`)
    pub fn name(&self) -> &'static str {
        match self {
            LineSeparator::Lf => "LF",
            LineSeparator::Cr => "CR",
            LineSeparator::CrLf => "CRLF",
        }
    }
}

impl FromStr for LineSeparator {
    type Err = LineSeparatorError;

    /// Accepts the protocol names as well as the literal terminators
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LF" | "lf" | "\n" => Ok(LineSeparator::Lf),
            "CR" | "cr" | "\r" => Ok(LineSeparator::Cr),
            "CRLF" | "crlf" | "\r\n" => Ok(LineSeparator::CrLf),
            other => Err(LineSeparatorError::Unknown(other.escape_debug().to_string())),
        }
    }
}

impl Display for LineSeparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSeparatorError {
    Unknown(String),
}

impl fmt::Display for LineSeparatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LineSeparatorError::Unknown(value) => write!(f, "Unknown line separator: {}", value),
        }
    }
}

impl std::error::Error for LineSeparatorError {}

/// Percentage of `done` over `total`, rounded to one decimal place
///
/// An empty total counts as fully transferred.
pub fn percentage(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let ratio = done.min(total) as f64 / total as f64;
    (ratio * 1000.0).round() / 10.0
}
