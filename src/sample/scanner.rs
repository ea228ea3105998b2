//! Character-level dialect scanner
//!
//! The scanner is fed decoded text window by window. It fixes the line
//! separator on the first terminator it meets, tallies candidate field
//! separators on the first line only, and counts completed lines until the
//! requested number has been reached.

use crate::sample::types::SampleResult;
use crate::types::{LineSeparator, CANDIDATE_FIELD_SEPARATORS};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DialectScanner {
    max_lines: usize,
    sample: String,
    line_separator: Option<LineSeparator>,
    /// A CR ended the first line and the next character decides CR vs CRLF
    pending_cr: bool,
    line_count: usize,
    candidate_counts: [usize; 4],
    first_line_counts: HashMap<char, usize>,
    first_line_order: Vec<char>,
    prev: Option<char>,
    char_before_first_terminator: Option<char>,
    done: bool,
}

impl DialectScanner {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines,
            sample: String::new(),
            line_separator: None,
            pending_cr: false,
            line_count: 0,
            candidate_counts: [0; 4],
            first_line_counts: HashMap::new(),
            first_line_order: Vec::new(),
            prev: None,
            char_before_first_terminator: None,
            done: false,
        }
    }

    /// Whether the requested number of lines has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn line_separator(&self) -> Option<LineSeparator> {
        self.line_separator
    }

    pub fn sample_text(&self) -> &str {
        &self.sample
    }

    /// Scan the next piece of decoded text
    pub fn feed(&mut self, text: &str) {
        for c in text.chars() {
            if self.done {
                break;
            }
            self.push(c);
        }
    }

    /// Signal the end of the file
    pub fn finish(&mut self) {
        if self.pending_cr {
            self.pending_cr = false;
            self.line_separator = Some(LineSeparator::Cr);
            self.end_line(true);
        }
    }

    fn push(&mut self, c: char) {
        if self.pending_cr {
            self.pending_cr = false;
            if c == '\n' {
                self.line_separator = Some(LineSeparator::CrLf);
                self.end_line(true);
                if !self.done {
                    self.sample.push(c);
                    self.prev = Some(c);
                }
                return;
            }
            self.line_separator = Some(LineSeparator::Cr);
            self.end_line(true);
            if self.done {
                return;
            }
        }

        let terminates = match self.line_separator {
            None => match c {
                '\n' => {
                    self.char_before_first_terminator = self.prev;
                    self.line_separator = Some(LineSeparator::Lf);
                    true
                }
                '\r' => {
                    self.char_before_first_terminator = self.prev;
                    self.pending_cr = true;
                    self.sample.push(c);
                    self.prev = Some(c);
                    return;
                }
                _ => {
                    self.tally(c);
                    false
                }
            },
            Some(LineSeparator::Lf) => c == '\n',
            Some(LineSeparator::Cr) => c == '\r',
            Some(LineSeparator::CrLf) => c == '\n' && self.prev == Some('\r'),
        };

        if terminates {
            let cr_in_sample = self.line_separator == Some(LineSeparator::CrLf);
            self.end_line(cr_in_sample);
            if self.done {
                return;
            }
        }

        self.sample.push(c);
        self.prev = Some(c);
    }

    /// Count a completed line. When it is the last one wanted, any part of
    /// its terminator already copied into the sample is removed.
    fn end_line(&mut self, cr_in_sample: bool) {
        self.line_count += 1;
        if self.line_count >= self.max_lines {
            self.done = true;
            if cr_in_sample && self.sample.ends_with('\r') {
                self.sample.pop();
            }
        }
    }

    fn tally(&mut self, c: char) {
        if let Some(idx) = CANDIDATE_FIELD_SEPARATORS.iter().position(|&s| s == c) {
            self.candidate_counts[idx] += 1;
        }

        let count = self.first_line_counts.entry(c).or_insert(0);
        if *count == 0 {
            self.first_line_order.push(c);
        }
        *count += 1;
    }

    /// Most frequent candidate separator on the first line, falling back to
    /// the most frequent character of any kind. Earlier entries win ties.
    pub fn suggest_field_separator(&self) -> Option<char> {
        let mut best: Option<(char, usize)> = None;

        for (idx, &candidate) in CANDIDATE_FIELD_SEPARATORS.iter().enumerate() {
            let count = self.candidate_counts[idx];
            if count > best.map_or(0, |(_, n)| n) {
                best = Some((candidate, count));
            }
        }

        if best.is_none() {
            for &c in &self.first_line_order {
                let count = self.first_line_counts.get(&c).copied().unwrap_or(0);
                if count > best.map_or(0, |(_, n)| n) {
                    best = Some((c, count));
                }
            }
        }

        best.map(|(c, _)| c)
    }

    pub fn into_result(self, bytes_scanned: u64) -> SampleResult {
        let suggestion = self.suggest_field_separator();
        let trailing_separator_ambiguous = match (suggestion, self.char_before_first_terminator) {
            (Some(separator), Some(last)) => separator == last,
            _ => false,
        };

        SampleResult {
            sample_text: self.sample,
            line_separator: self.line_separator,
            field_separator_suggestion: suggestion,
            trailing_separator_ambiguous,
            line_count: self.line_count,
            bytes_scanned,
        }
    }
}
