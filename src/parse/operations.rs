//! Row parsing operations

use crate::error::{IngestError, Result};
use crate::parse::types::{ParsedTable, QuoteStyle};
use crate::types::LineSeparator;

/// Parse text into rows using backslash-escaped quotes
///
/// # Arguments
///
/// * `text` - Raw text, typically `SampleResult::sample_text`
/// * `line_separator` - Exact line terminator; `None` parses the whole text as one row
/// * `field_separator` - Confirmed field separator
///
/// # Errors
///
/// Returns an error if the field separator is a quote or a line terminator
/// character.
pub fn parse_rows(
    text: &str,
    line_separator: Option<LineSeparator>,
    field_separator: char,
) -> Result<ParsedTable> {
    parse_rows_with_style(text, line_separator, field_separator, QuoteStyle::Backslash)
}

/// Parse text into rows with an explicit quoting convention
pub fn parse_rows_with_style(
    text: &str,
    line_separator: Option<LineSeparator>,
    field_separator: char,
    quote_style: QuoteStyle,
) -> Result<ParsedTable> {
    validate_field_separator(field_separator)?;

    let rows = match line_separator {
        Some(separator) => text
            .split(separator.as_str())
            .map(|line| parse_line(line, field_separator, quote_style))
            .collect(),
        None => vec![parse_line(text, field_separator, quote_style)],
    };

    Ok(ParsedTable::new(rows))
}

fn validate_field_separator(field_separator: char) -> Result<()> {
    if matches!(field_separator, '"' | '\r' | '\n') {
        return Err(IngestError::invalid_parameter(
            "field_separator",
            format!(
                "Field separator cannot be {:?}",
                field_separator
            ),
        ));
    }
    Ok(())
}

/// Split one line into fields. An unquoted separator as the last character
/// closes the previous field without opening an empty one.
fn parse_line(line: &str, field_separator: char, quote_style: QuoteStyle) -> Vec<String> {
    let mut row = Vec::new();
    if line.is_empty() {
        return row;
    }

    let mut field = String::new();
    let mut in_quote = false;
    let mut prev: Option<char> = None;
    let mut ended_on_separator = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        ended_on_separator = false;

        if c == '"' {
            match quote_style {
                QuoteStyle::Backslash if prev == Some('\\') => field.push(c),
                QuoteStyle::Doubled if in_quote && chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                _ => in_quote = !in_quote,
            }
        } else if c == field_separator && !in_quote {
            row.push(std::mem::take(&mut field));
            ended_on_separator = true;
        } else {
            field.push(c);
        }

        prev = Some(c);
    }

    if !ended_on_separator {
        row.push(field);
    }

    row
}
