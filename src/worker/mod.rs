//! Background worker
//!
//! Sampling, parsing and uploading run on a dedicated thread so that large
//! files never block the caller. The caller talks to the worker with
//! [`Command`] messages and receives [`Reply`] messages back.

pub mod config;
pub mod dispatch;
pub mod handle;
pub mod protocol;

pub use config::{IngestConfig, LogLevel, DEFAULT_INGEST_PATH, DEFAULT_LOAD_PATH};
pub use dispatch::{Dispatcher, ReplySink};
pub use handle::{Worker, WorkerHandle};
pub use protocol::{Command, Reply};
