//! Sampling operations

use crate::error::{IngestError, Result};
use crate::sample::scanner::DialectScanner;
use crate::sample::types::{SampleOptions, SampleResult};
use crate::source::FileSource;
use encoding_rs::{CoderResult, Decoder};

/// Sample the head of a file and infer its dialect
///
/// Reads `options.window_size` bytes at a time from offset 0 until
/// `options.max_lines` lines have been seen or the file is exhausted.
///
/// # Arguments
///
/// * `file` - The file to sample
/// * `options` - Sampling options
///
/// # Returns
///
/// A `SampleResult` with the sampled text and the inferred separators
///
/// # Errors
///
/// Returns an error if:
/// - The options are invalid
/// - A byte-range read fails
pub async fn sample_file(file: &dyn FileSource, options: &SampleOptions) -> Result<SampleResult> {
    options.validate()?;

    let encoding = options.resolve_encoding()?;
    let mut decoder = encoding.new_decoder();
    let mut scanner = DialectScanner::new(options.max_lines);

    let size = file.size();
    let mut offset: u64 = 0;

    log::debug!(
        "Sampling {} ({} bytes, window {} bytes, up to {} lines)",
        file.name(),
        size,
        options.window_size,
        options.max_lines
    );

    while offset < size && !scanner.is_done() {
        let window = file.read_range(offset, options.window_size).await?;
        if window.is_empty() {
            return Err(IngestError::read_error(format!(
                "Unexpected end of {} at offset {} of {}",
                file.name(),
                offset,
                size
            )));
        }

        offset += window.len() as u64;
        let text = decode_window(&mut decoder, &window, offset >= size);
        scanner.feed(&text);
    }

    if offset >= size {
        scanner.finish();
    }

    log::debug!(
        "Sampled {} lines ({} bytes) of {}",
        scanner.line_count(),
        offset,
        file.name()
    );

    Ok(scanner.into_result(offset))
}

/// Decode one window; incomplete trailing sequences are kept by the
/// decoder and completed by the next window.
fn decode_window(decoder: &mut Decoder, bytes: &[u8], last: bool) -> String {
    let capacity = decoder
        .max_utf8_buffer_length(bytes.len())
        .unwrap_or(bytes.len().saturating_mul(3));
    let mut text = String::with_capacity(capacity);
    let mut remaining = bytes;

    loop {
        let (result, read, _had_errors) = decoder.decode_to_string(remaining, &mut text, last);
        remaining = &remaining[read..];
        match result {
            CoderResult::InputEmpty => break,
            CoderResult::OutputFull => {
                let more = decoder
                    .max_utf8_buffer_length(remaining.len())
                    .unwrap_or(remaining.len().saturating_mul(3));
                text.reserve(more.max(16));
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::source::testing::FailingFile;
    use crate::source::MemoryFile;
    use crate::types::LineSeparator;

    #[tokio::test]
    async fn test_read_failure_mid_sample() {
        let file = FailingFile::new("a,b\n".repeat(100), 1);
        let options = SampleOptions::new().max_lines(50).window_size(16);

        let err = sample_file(&file, &options).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Read);
        assert_eq!(file.reads(), 2);
    }

    #[tokio::test]
    async fn test_sample_small_file() {
        let file = MemoryFile::new("small.csv", "a,b,c\n1,2,3\n");
        let result = sample_file(&file, &SampleOptions::new().max_lines(2))
            .await
            .unwrap();
        assert_eq!(result.line_separator, Some(LineSeparator::Lf));
        assert_eq!(result.field_separator_suggestion, Some(','));
        assert_eq!(result.sample_text, "a,b,c\n1,2,3");
    }

    #[tokio::test]
    async fn test_sample_across_small_windows() {
        let data = "name;city\r\nAda;London\r\nGrace;Arlington\r\n";
        let file = MemoryFile::new("people.csv", data);
        let options = SampleOptions::new().max_lines(3).window_size(4);
        let result = sample_file(&file, &options).await.unwrap();
        assert_eq!(result.line_separator, Some(LineSeparator::CrLf));
        assert_eq!(result.field_separator_suggestion, Some(';'));
        assert_eq!(result.line_count, 3);
        assert_eq!(result.sample_text, "name;city\r\nAda;London\r\nGrace;Arlington");
    }

    #[tokio::test]
    async fn test_sample_stops_reading_early() {
        let mut data = String::from("h1|h2\n");
        for i in 0..1000 {
            data.push_str(&format!("{}|{}\n", i, i * 2));
        }
        let file = MemoryFile::new("long.psv", data.clone());
        let options = SampleOptions::new().max_lines(2).window_size(16);
        let result = sample_file(&file, &options).await.unwrap();
        assert_eq!(result.sample_text, "h1|h2\n0|0");
        assert!(result.bytes_scanned < data.len() as u64);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_windows() {
        let data = "café,prix\nthé,3\n";
        let file = MemoryFile::new("menu.csv", data);
        // "caf" + first byte of 'é' lands in the first window
        let options = SampleOptions::new().window_size(4);
        let result = sample_file(&file, &options).await.unwrap();
        assert_eq!(result.sample_text, data);
        assert_eq!(result.field_separator_suggestion, Some(','));
    }

    #[tokio::test]
    async fn test_byte_order_mark_dropped() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(b"x;y\n1;2\n");
        let file = MemoryFile::new("bom.csv", data);
        let result = sample_file(&file, &SampleOptions::new()).await.unwrap();
        assert_eq!(result.sample_text, "x;y\n1;2\n");
    }

    #[tokio::test]
    async fn test_latin1_encoding() {
        let data = vec![b'n', 0xE9, b',', b'x', b'\n'];
        let file = MemoryFile::new("latin.csv", data);
        let options = SampleOptions::new().encoding("latin1");
        let result = sample_file(&file, &options).await.unwrap();
        assert_eq!(result.sample_text, "né,x\n");
    }

    #[tokio::test]
    async fn test_empty_file() {
        let file = MemoryFile::new("empty.csv", Vec::new());
        let result = sample_file(&file, &SampleOptions::new()).await.unwrap();
        assert_eq!(result.sample_text, "");
        assert_eq!(result.line_separator, None);
        assert_eq!(result.bytes_scanned, 0);
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let file = MemoryFile::new("a.csv", "a,b\n");
        let err = sample_file(&file, &SampleOptions::new().max_lines(0))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
