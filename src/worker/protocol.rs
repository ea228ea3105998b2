//! Command and reply messages exchanged with a worker
//!
//! Both directions are JSON objects discriminated by a tag: commands by
//! `action`, replies by `reply`.

use crate::error::{IngestError, Result};
use crate::parse::{ParsedTable, QuoteStyle};
use crate::sample::SampleResult;
use crate::source::FileRef;
use crate::types::LineSeparator;
use crate::upload::ColumnSpec;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Accepts `LF`/`CR`/`CRLF` as well as the literal terminators
fn line_separator_from_str<'de, D>(deserializer: D) -> std::result::Result<Option<LineSeparator>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Sample the head of a file and infer its dialect
    SampleFile {
        file: FileRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_sample_lines: Option<usize>,
    },
    /// Split text into rows and fields
    ParseRows {
        row_data: String,
        #[serde(
            default,
            deserialize_with = "line_separator_from_str",
            skip_serializing_if = "Option::is_none"
        )]
        line_separator: Option<LineSeparator>,
        field_separator: char,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quote_style: Option<QuoteStyle>,
    },
    /// Upload a file to the receiver
    UploadFileData {
        file: FileRef,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        parameters: BTreeMap<String, String>,
    },
    /// Upload a file, then load it into a table
    UploadDataForDbTable {
        file: FileRef,
        columns: Vec<ColumnSpec>,
        target_table_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field_separator: Option<char>,
    },
}

impl Command {
    /// Decode a command; malformed commands are validation errors
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| IngestError::invalid_parameter("command", e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(IngestError::from)
    }

    pub fn action(&self) -> &'static str {
        match self {
            Command::SampleFile { .. } => "sampleFile",
            Command::ParseRows { .. } => "parseRows",
            Command::UploadFileData { .. } => "uploadFileData",
            Command::UploadDataForDbTable { .. } => "uploadDataForDbTable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Reply {
    SampleFile {
        file_sample_info: SampleResult,
        file: FileRef,
    },
    ParseRows {
        table: ParsedTable,
    },
    /// Sent after every data chunk and once more on completion
    FuseBaseLoadProgress {
        load_progress: f64,
        record_count: Option<u64>,
        complete: bool,
    },
    /// A command failed
    Feedback {
        message: String,
    },
    Debug {
        message: String,
    },
}

impl Reply {
    pub fn feedback(message: impl Into<String>) -> Self {
        Reply::Feedback {
            message: message.into(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Reply::Debug {
            message: message.into(),
        }
    }

    pub fn is_feedback(&self) -> bool {
        matches!(self, Reply::Feedback { .. })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(IngestError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::FieldType;

    #[test]
    fn test_decode_sample_file() {
        let command =
            Command::from_json(r#"{"action": "sampleFile", "file": {"path": "/tmp/a.csv"}}"#)
                .unwrap();
        assert_eq!(
            command,
            Command::SampleFile {
                file: FileRef::path("/tmp/a.csv"),
                max_sample_lines: None,
            }
        );
        assert_eq!(command.action(), "sampleFile");
    }

    #[test]
    fn test_decode_parse_rows() {
        let command = Command::from_json(
            r#"{"action": "parseRows", "rowData": "a;b", "lineSeparator": "\r\n", "fieldSeparator": ";"}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::ParseRows {
                row_data: "a;b".to_string(),
                line_separator: Some(LineSeparator::CrLf),
                field_separator: ';',
                quote_style: None,
            }
        );

        let command = Command::from_json(
            r#"{"action": "parseRows", "rowData": "x", "lineSeparator": "LF", "fieldSeparator": ",", "quoteStyle": "doubled"}"#,
        )
        .unwrap();
        assert!(matches!(
            command,
            Command::ParseRows {
                line_separator: Some(LineSeparator::Lf),
                quote_style: Some(QuoteStyle::Doubled),
                ..
            }
        ));
    }

    #[test]
    fn test_decode_table_upload() {
        let command = Command::from_json(
            r#"{
                "action": "uploadDataForDbTable",
                "file": {"name": "p.csv", "data": "1,Ada"},
                "columns": [
                    {"name": "id", "type": {"type": "number"}},
                    {"name": "name", "type": {"type": "string"}}
                ],
                "targetTableName": "people"
            }"#,
        )
        .unwrap();

        match command {
            Command::UploadDataForDbTable {
                columns,
                target_table_name,
                field_separator,
                ..
            } => {
                assert_eq!(columns[0].field_type, FieldType::Number);
                assert_eq!(target_table_name, "people");
                assert_eq!(field_separator, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_commands_are_validation_errors() {
        let unknown_type = r#"{
            "action": "uploadDataForDbTable",
            "file": {"path": "a.csv"},
            "columns": [{"name": "id", "type": {"type": "money"}}],
            "targetTableName": "t"
        }"#;
        assert!(Command::from_json(unknown_type).unwrap_err().is_validation());
        assert!(Command::from_json(r#"{"action": "dance"}"#).is_err());
        assert!(Command::from_json(
            r#"{"action": "parseRows", "rowData": "", "lineSeparator": "\t", "fieldSeparator": ","}"#
        )
        .is_err());
    }

    #[test]
    fn test_reply_shapes() {
        let reply = Reply::FuseBaseLoadProgress {
            load_progress: 50.0,
            record_count: None,
            complete: false,
        };
        assert_eq!(
            reply.to_json().unwrap(),
            r#"{"reply":"fuseBaseLoadProgress","loadProgress":50.0,"recordCount":null,"complete":false}"#
        );

        let reply = Reply::ParseRows {
            table: ParsedTable::new(vec![vec!["a".to_string(), "b".to_string()]]),
        };
        assert_eq!(reply.to_json().unwrap(), r#"{"reply":"parseRows","table":[["a","b"]]}"#);

        assert_eq!(
            Reply::feedback("boom").to_json().unwrap(),
            r#"{"reply":"feedback","message":"boom"}"#
        );
    }

    #[test]
    fn test_command_round_trip() {
        let command = Command::UploadFileData {
            file: FileRef::inline("a.csv", "x"),
            parameters: BTreeMap::from([("schema".to_string(), "hr".to_string())]),
        };
        let json = command.to_json().unwrap();
        assert!(json.starts_with(r#"{"action":"uploadFileData""#));
        assert_eq!(Command::from_json(&json).unwrap(), command);
    }
}
