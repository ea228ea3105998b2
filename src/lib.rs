pub mod error;
pub mod types;

pub mod parse;
pub mod sample;
pub mod source;
pub mod upload;
pub mod worker;

pub use error::{ErrorCategory, IngestError, Result};

pub use types::{
    LineSeparator, CANDIDATE_FIELD_SEPARATORS, CLOSE_FILE_SENTINEL, DEFAULT_CHUNK_SIZE,
    DEFAULT_SAMPLE_LINES,
};

pub use source::{FileRef, FileSource, LocalFile, MemoryFile};

// Sampling and parsing
pub use sample::{sample_file, SampleOptions, SampleResult};

pub use parse::{parse_rows, parse_rows_with_style, ParsedTable, QuoteStyle};

// Chunked upload
pub use upload::{
    upload_file, upload_for_table, ChunkTransport, ColumnSpec, FieldType, HttpTransport,
    InsertPlan, SessionState, TableLoadOutcome, TableLoader, TableUpload, UploadEvent,
    UploadOptions, UploadProgress, UploadResult, UploadSession,
};

pub use worker::{Command, IngestConfig, LogLevel, Reply, Worker, WorkerHandle};
