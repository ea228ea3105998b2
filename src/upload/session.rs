//! Upload session state machine
//!
//! A session reads its file strictly in order, one window per request, and
//! sends the end-of-file marker after the last window. Each call to
//! [`UploadSession::next_event`] performs exactly one request, so chunk
//! order follows from the call order and no two requests overlap.

use crate::error::{IngestError, Result};
use crate::source::FileSource;
use crate::upload::chunks::{chunk_count, ChunkPayload};
use crate::upload::transport::ChunkTransport;
use crate::upload::types::{SessionState, UploadEvent, UploadProgress, UploadResult};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use std::time::Instant;

pub struct UploadSession<'a> {
    file: &'a dyn FileSource,
    transport: &'a dyn ChunkTransport,
    chunk_size: usize,
    cursor: u64,
    chunks_sent: usize,
    total_chunks: usize,
    last_record_count: Option<u64>,
    state: SessionState,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl<'a> UploadSession<'a> {
    pub fn new(
        file: &'a dyn FileSource,
        transport: &'a dyn ChunkTransport,
        chunk_size: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IngestError::invalid_parameter(
                "chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        Ok(Self {
            file,
            transport,
            chunk_size,
            cursor: 0,
            chunks_sent: 0,
            total_chunks: chunk_count(file.size(), chunk_size),
            last_record_count: None,
            state: SessionState::Ready,
            started: Instant::now(),
            started_at: Utc::now(),
        })
    }

    /// Offset of the next byte to send
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn chunks_sent(&self) -> usize {
        self.chunks_sent
    }

    /// Record count from the most recent acknowledgement that carried one
    pub fn last_record_count(&self) -> Option<u64> {
        self.last_record_count
    }

    /// Perform the next request of the session
    ///
    /// Returns `None` once the session has completed or aborted.
    pub async fn next_event(&mut self) -> Option<UploadEvent> {
        match self.state {
            SessionState::Completed | SessionState::Aborted => None,
            SessionState::Ready => {
                log::info!(
                    "Uploading {} ({} bytes in {} chunks)",
                    self.file.name(),
                    self.file.size(),
                    self.total_chunks
                );
                self.state = if self.total_chunks == 0 {
                    SessionState::Closing
                } else {
                    SessionState::Sending
                };
                Some(self.step().await)
            }
            SessionState::Sending | SessionState::Closing => Some(self.step().await),
        }
    }

    async fn step(&mut self) -> UploadEvent {
        let result = match self.state {
            SessionState::Sending => self.send_data().await,
            _ => self.send_end_of_file().await,
        };

        match result {
            Ok(event) => event,
            Err(err) => {
                log::warn!(
                    "Upload of {} aborted at offset {}: {}",
                    self.file.name(),
                    self.cursor,
                    err
                );
                self.state = SessionState::Aborted;
                UploadEvent::Failed(err)
            }
        }
    }

    async fn send_data(&mut self) -> Result<UploadEvent> {
        let size = self.file.size();
        let window = self.file.read_range(self.cursor, self.chunk_size).await?;
        if window.is_empty() {
            return Err(IngestError::read_error(format!(
                "Unexpected end of {} at offset {} of {}",
                self.file.name(),
                self.cursor,
                size
            )));
        }

        let len = window.len() as u64;
        let ack = self.transport.send(ChunkPayload::Data(window)).await?;

        self.cursor += len;
        self.chunks_sent += 1;
        if ack.record_count.is_some() {
            self.last_record_count = ack.record_count;
        }

        log::debug!(
            "Sent chunk {}/{} of {} ({} bytes)",
            self.chunks_sent,
            self.total_chunks,
            self.file.name(),
            len
        );

        if self.cursor >= size {
            self.state = SessionState::Closing;
        }

        Ok(UploadEvent::Progress(
            UploadProgress::new(self.cursor, size)
                .chunk(self.chunks_sent, self.total_chunks)
                .record_count(ack.record_count),
        ))
    }

    async fn send_end_of_file(&mut self) -> Result<UploadEvent> {
        let ack = self.transport.send(ChunkPayload::EndOfFile).await?;
        let record_count = ack.record_count.ok_or_else(|| {
            IngestError::transport_error("End-of-file acknowledgement carries no record count")
        })?;

        self.last_record_count = Some(record_count);
        self.state = SessionState::Completed;

        let result = UploadResult::new(self.file.size(), record_count)
            .chunks(self.chunks_sent)
            .duration_ms(self.started.elapsed().as_millis() as u64)
            .started_at(self.started_at);

        log::info!(
            "Uploaded {} ({}, {} records) in {} ms",
            self.file.name(),
            result.size_human(),
            record_count,
            result.duration_ms
        );

        Ok(UploadEvent::Complete(result))
    }

    /// The remaining events of the session as a stream
    pub fn into_stream(self) -> impl Stream<Item = UploadEvent> + Send + 'a {
        stream::unfold(self, |mut session| async move {
            session.next_event().await.map(|event| (event, session))
        })
    }
}
