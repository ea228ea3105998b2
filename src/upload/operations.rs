//! Upload operations implementation

use crate::error::Result;
use crate::source::FileSource;
use crate::upload::session::UploadSession;
use crate::upload::table::{ColumnSpec, InsertPlan, TableLoadRequest};
use crate::upload::transport::{ChunkTransport, TableLoader};
use crate::upload::types::{UploadEvent, UploadOptions, UploadResult};

/// Upload a file chunk by chunk and close it with the end-of-file marker
///
/// # Arguments
///
/// * `file` - The file to upload
/// * `transport` - Where the chunks go
/// * `options` - Upload options; `on_progress` is called once per data chunk
///
/// # Returns
///
/// The completed upload, including the record count reported by the
/// receiver
///
/// # Errors
///
/// Returns the first read or transport error; nothing is sent after it.
pub async fn upload_file(
    file: &dyn FileSource,
    transport: &dyn ChunkTransport,
    options: &UploadOptions,
) -> Result<UploadResult> {
    options.validate()?;

    let mut session = UploadSession::new(file, transport, options.chunk_size)?;

    while let Some(event) = session.next_event().await {
        match event {
            UploadEvent::Progress(progress) => {
                if let Some(ref callback) = options.on_progress {
                    callback(progress);
                }
            }
            UploadEvent::Complete(result) => return Ok(result),
            UploadEvent::Failed(err) => return Err(err),
        }
    }

    Err(crate::error::IngestError::session_error(
        "Upload session ended without completing",
    ))
}

/// Target of a table load
#[derive(Debug, Clone)]
pub struct TableUpload {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
    pub field_separator: char,
}

impl TableUpload {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            table: table.into(),
            columns,
            field_separator: ',',
        }
    }

    pub fn field_separator(mut self, separator: char) -> Self {
        self.field_separator = separator;
        self
    }
}

/// Outcome of [`upload_for_table`]
#[derive(Debug, Clone)]
pub struct TableLoadOutcome {
    pub upload: UploadResult,
    /// Receiver's response to the load request
    pub response: String,
}

/// Upload a file, then ask the receiver to load it into a table
///
/// The insert plan is validated before the first chunk is sent.
pub async fn upload_for_table(
    file: &dyn FileSource,
    transport: &dyn ChunkTransport,
    loader: &dyn TableLoader,
    target: &TableUpload,
    options: &UploadOptions,
) -> Result<TableLoadOutcome> {
    let plan = InsertPlan::build(&target.table, &target.columns)?;
    let request = TableLoadRequest::new(file.name(), plan, target.field_separator);

    let upload = upload_file(file, transport, options).await?;

    log::info!("Loading {} into {}", file.name(), target.table);
    let response = loader.load_to_table(&request).await?;

    Ok(TableLoadOutcome { upload, response })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFile;
    use crate::upload::table::FieldType;
    use crate::upload::transport::testing::RecordingTransport;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingLoader {
        requests: Mutex<Vec<TableLoadRequest>>,
    }

    #[async_trait]
    impl TableLoader for RecordingLoader {
        async fn load_to_table(&self, request: &TableLoadRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok("loaded".to_string())
        }
    }

    #[tokio::test]
    async fn test_upload_file_reports_progress() {
        let file = MemoryFile::new("rows.csv", "a,b\n1,2\n3,4\n");
        let transport = RecordingTransport::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let options = UploadOptions::new()
            .chunk_size(5)
            .on_progress(move |p| sink.lock().unwrap().push(p.percentage));

        let result = upload_file(&file, &transport, &options).await.unwrap();
        assert_eq!(result.record_count, 3);
        assert_eq!(result.chunks, 3);
        assert_eq!(*seen.lock().unwrap(), vec![41.7, 83.3, 100.0]);
    }

    #[tokio::test]
    async fn test_upload_file_failure() {
        let file = MemoryFile::new("rows.csv", "a,b\n1,2\n3,4\n");
        let transport = RecordingTransport::failing_on(0);

        let err = upload_file(&file, &transport, &UploadOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Transport);
        assert!(transport.payloads().is_empty());
    }

    #[tokio::test]
    async fn test_upload_for_table() {
        let file = MemoryFile::new("people.csv", "1;Ada\n2;Grace\n");
        let transport = RecordingTransport::default();
        let loader = RecordingLoader::default();
        let target = TableUpload::new(
            "people",
            vec![
                ColumnSpec::new("id", FieldType::Number),
                ColumnSpec::new("name", FieldType::String),
            ],
        )
        .field_separator(';');

        let outcome = upload_for_table(&file, &transport, &loader, &target, &UploadOptions::new())
            .await
            .unwrap();
        assert_eq!(outcome.response, "loaded");
        assert_eq!(outcome.upload.record_count, 2);

        let requests = loader.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].file_name, "people.csv");
        assert_eq!(requests[0].insert_sql, "INSERT INTO people (id,name) VALUES($0,'$1')");
        assert_eq!(requests[0].field_separator, ';');
    }

    #[tokio::test]
    async fn test_invalid_plan_sends_nothing() {
        let file = MemoryFile::new("people.csv", "1;Ada\n");
        let transport = RecordingTransport::default();
        let loader = RecordingLoader::default();
        let target = TableUpload::new("people", vec![]);

        let err = upload_for_table(&file, &transport, &loader, &target, &UploadOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(transport.payloads().is_empty());
        assert!(loader.requests.lock().unwrap().is_empty());
    }
}
