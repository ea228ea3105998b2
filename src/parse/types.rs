use serde::{Deserialize, Serialize};

/// How a literal quote character is written inside a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// `\"` is a literal quote; every other `"` toggles quoting
    #[default]
    Backslash,
    /// `""` inside a quoted field is a literal quote (RFC 4180)
    Doubled,
}

/// Ordered rows of ordered field strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedTable {
    rows: Vec<Vec<String>>,
}

impl ParsedTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row, usually the column names
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|row| row.as_slice())
    }

    /// Widest row in the table
    pub fn max_columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}
