//! Chunk payloads and receiver acknowledgements
//!
//! Every request of an upload session carries either one window of raw file
//! bytes or the end-of-file marker. The receiver appends data payloads in
//! arrival order and answers the marker with the number of records it
//! loaded.

use crate::error::{IngestError, Result};
use crate::types::CLOSE_FILE_SENTINEL;
use serde::{Deserialize, Serialize};

/// Body of one ingestion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPayload {
    /// One window of raw file bytes
    Data(Vec<u8>),
    /// Marks the end of the file
    EndOfFile,
}

impl ChunkPayload {
    pub fn is_end_of_file(&self) -> bool {
        matches!(self, ChunkPayload::EndOfFile)
    }

    pub fn len(&self) -> usize {
        match self {
            ChunkPayload::Data(bytes) => bytes.len(),
            ChunkPayload::EndOfFile => CLOSE_FILE_SENTINEL.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request body as sent on the wire
    pub fn into_body(self) -> Vec<u8> {
        match self {
            ChunkPayload::Data(bytes) => bytes,
            ChunkPayload::EndOfFile => CLOSE_FILE_SENTINEL.as_bytes().to_vec(),
        }
    }
}

/// Receiver's answer to one ingestion request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkAck {
    pub record_count: Option<u64>,
}

impl ChunkAck {
    pub fn new(record_count: Option<u64>) -> Self {
        Self { record_count }
    }
}

/// Receiver reply body: `{ "data": [ { "recordCount": n } ] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReply {
    pub data: Vec<RecordCountRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordCountRow {
    #[serde(rename = "recordCount")]
    pub record_count: u64,
}

impl IngestReply {
    pub fn new(record_count: u64) -> Self {
        Self {
            data: vec![RecordCountRow { record_count }],
        }
    }

    /// Extract the record count from a reply body
    pub fn parse_record_count(body: &str) -> Result<u64> {
        let reply: IngestReply = serde_json::from_str(body).map_err(|e| {
            IngestError::transport_error(format!("Malformed receiver reply: {}", e))
        })?;

        reply
            .data
            .first()
            .map(|row| row.record_count)
            .ok_or_else(|| IngestError::transport_error("Receiver reply carries no record count"))
    }
}

/// Number of data chunks needed for `size` bytes in windows of `chunk_size`
pub fn chunk_count(size: u64, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size as u64) as usize
}
