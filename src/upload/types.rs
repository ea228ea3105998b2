use crate::error::{IngestError, Result};
use crate::types::DEFAULT_CHUNK_SIZE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle of an upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Nothing sent yet
    Ready,
    /// Data chunks are being sent
    Sending,
    /// All data sent, end-of-file marker pending
    Closing,
    Completed,
    Aborted,
}

impl SessionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Aborted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
    /// Percent of the file sent, rounded to one decimal place
    pub percentage: f64,
    pub current_chunk: usize,
    pub total_chunks: usize,
    /// Record count reported by the receiver for this chunk, if any
    pub record_count: Option<u64>,
}

impl UploadProgress {
    pub fn new(bytes_uploaded: u64, total_bytes: u64) -> Self {
        Self {
            bytes_uploaded,
            total_bytes,
            percentage: crate::types::percentage(bytes_uploaded, total_bytes),
            current_chunk: 0,
            total_chunks: 0,
            record_count: None,
        }
    }

    pub fn chunk(mut self, current_chunk: usize, total_chunks: usize) -> Self {
        self.current_chunk = current_chunk;
        self.total_chunks = total_chunks;
        self
    }

    pub fn record_count(mut self, record_count: Option<u64>) -> Self {
        self.record_count = record_count;
        self
    }
}

#[derive(Clone)]
pub struct UploadOptions {
    pub chunk_size: usize,
    pub on_progress: Option<Arc<dyn Fn(UploadProgress) + Send + Sync>>,
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("chunk_size", &self.chunk_size)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            on_progress: None,
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IngestError::invalid_parameter(
                "chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Summary of a completed upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub size: u64,
    /// Number of data chunks sent, not counting the end-of-file marker
    pub chunks: usize,
    /// Record count reported by the receiver after the end-of-file marker
    pub record_count: u64,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl UploadResult {
    pub fn new(size: u64, record_count: u64) -> Self {
        Self {
            size,
            chunks: 0,
            record_count,
            duration_ms: 0,
            started_at: Utc::now(),
        }
    }

    pub fn chunks(mut self, chunks: usize) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Uploaded size in human readable form
    pub fn size_human(&self) -> String {
        bytesize::ByteSize::b(self.size).to_string()
    }
}

/// One step of an upload session
#[derive(Debug)]
pub enum UploadEvent {
    /// A data chunk was acknowledged
    Progress(UploadProgress),
    /// The end-of-file marker was acknowledged
    Complete(UploadResult),
    /// The session aborted; nothing further is sent
    Failed(IngestError),
}
