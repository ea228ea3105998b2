//! Chunked upload to a bulk-load receiver
//!
//! A file is sent in fixed-size windows, strictly in order, followed by an
//! end-of-file marker whose acknowledgement carries the number of records
//! the receiver loaded. An upload can optionally be followed by a request
//! that loads the file into a database table.
//!
//! # Entry Points
//!
//! - [`upload_file`]: run a whole session, reporting progress through a callback
//! - [`UploadSession`]: drive a session one request at a time, or as a stream
//! - [`upload_for_table`]: upload, then load into a table

pub mod chunks;
pub mod operations;
pub mod session;
pub mod table;
pub mod transport;
pub mod types;

pub use chunks::{chunk_count, ChunkAck, ChunkPayload, IngestReply};
pub use operations::{upload_file, upload_for_table, TableLoadOutcome, TableUpload};
pub use session::UploadSession;
pub use table::{ColumnSpec, FieldType, InsertPlan, TableLoadRequest};
pub use transport::{ChunkTransport, HttpTransport, TableLoader};
pub use types::{SessionState, UploadEvent, UploadOptions, UploadProgress, UploadResult};
