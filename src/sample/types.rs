use crate::error::{IngestError, Result};
use crate::types::{LineSeparator, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_LINES};
use serde::{Deserialize, Serialize};

/// Options controlling how much of a file is sampled and how it is decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleOptions {
    /// Stop after this many completed lines
    pub max_lines: usize,
    /// Size of each byte window read from the file
    pub window_size: usize,
    /// WHATWG encoding label; UTF-8 when unset
    pub encoding: Option<String>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_SAMPLE_LINES,
            window_size: DEFAULT_CHUNK_SIZE,
            encoding: None,
        }
    }
}

impl SampleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_lines(mut self, lines: usize) -> Self {
        self.max_lines = lines;
        self
    }

    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Resolve the configured encoding
    pub fn resolve_encoding(&self) -> Result<&'static encoding_rs::Encoding> {
        match self.encoding.as_deref() {
            None => Ok(encoding_rs::UTF_8),
            Some(label) => encoding_rs::Encoding::for_label(label.trim().as_bytes()).ok_or_else(
                || IngestError::invalid_parameter("encoding", format!("Unknown encoding: {}", label)),
            ),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_lines == 0 {
            return Err(IngestError::invalid_parameter(
                "max_lines",
                "Sample line count must be greater than 0",
            ));
        }

        if self.window_size == 0 {
            return Err(IngestError::invalid_parameter(
                "window_size",
                "Sample window size must be greater than 0",
            ));
        }

        self.resolve_encoding()?;
        Ok(())
    }
}

/// Outcome of one sampling call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResult {
    /// Every scanned character, minus the terminator of the last sampled line
    pub sample_text: String,
    /// Terminator of the first line; `None` when the sample has no terminator
    pub line_separator: Option<LineSeparator>,
    pub field_separator_suggestion: Option<char>,
    /// The first line ends with the suggested field separator
    pub trailing_separator_ambiguous: bool,
    /// Number of completed lines seen
    pub line_count: usize,
    pub bytes_scanned: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_options_defaults() {
        let options = SampleOptions::default();
        assert_eq!(options.max_lines, 200);
        assert_eq!(options.window_size, 600_000);
        assert!(options.encoding.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_sample_options_validation() {
        assert!(SampleOptions::new().max_lines(0).validate().is_err());
        assert!(SampleOptions::new().window_size(0).validate().is_err());
        assert!(SampleOptions::new().encoding("klingon").validate().is_err());
        assert!(SampleOptions::new().encoding("latin1").validate().is_ok());
    }

    #[test]
    fn test_sample_result_json_shape() {
        let result = SampleResult {
            sample_text: "a;b".to_string(),
            line_separator: Some(LineSeparator::CrLf),
            field_separator_suggestion: Some(';'),
            trailing_separator_ambiguous: false,
            line_count: 1,
            bytes_scanned: 5,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sampleText"], "a;b");
        assert_eq!(json["lineSeparator"], "CRLF");
        assert_eq!(json["fieldSeparatorSuggestion"], ";");
        assert_eq!(json["trailingSeparatorAmbiguous"], false);
    }
}
