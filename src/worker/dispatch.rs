//! Command handlers run inside the worker
//!
//! Every handler reports its outcome as replies; a failed command produces
//! exactly one `feedback` reply and nothing after it.

use crate::error::{IngestError, Result};
use crate::parse::{parse_rows_with_style, QuoteStyle};
use crate::sample::{sample_file, SampleOptions};
use crate::source::{FileRef, FileSource};
use crate::types::LineSeparator;
use crate::upload::{
    upload_file, upload_for_table, ChunkTransport, ColumnSpec, HttpTransport, TableLoader,
    TableUpload, UploadOptions, UploadResult,
};
use crate::worker::config::IngestConfig;
use crate::worker::protocol::{Command, Reply};
use std::collections::BTreeMap;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Sends replies back to the controlling side
#[derive(Debug, Clone)]
pub struct ReplySink {
    sender: UnboundedSender<Reply>,
}

impl ReplySink {
    pub fn new(sender: UnboundedSender<Reply>) -> Self {
        Self { sender }
    }

    pub fn send(&self, reply: Reply) {
        if self.sender.send(reply).is_err() {
            log::debug!("Reply dropped, receiver is gone");
        }
    }

    fn fail(&self, action: &str, err: IngestError) {
        log::warn!("{} failed: {}", action, err);
        self.send(Reply::feedback(err.to_string()));
    }

    fn progress(&self, load_progress: f64, record_count: Option<u64>, complete: bool) {
        self.send(Reply::FuseBaseLoadProgress {
            load_progress,
            record_count,
            complete,
        });
    }

    fn upload_options(&self, chunk_size: usize) -> UploadOptions {
        let sink = self.clone();
        UploadOptions::new()
            .chunk_size(chunk_size)
            .on_progress(move |p| sink.progress(p.percentage, p.record_count, false))
    }

    fn completed(&self, result: &UploadResult) {
        self.progress(100.0, Some(result.record_count), true);
    }
}

pub struct Dispatcher {
    config: IngestConfig,
    replies: ReplySink,
}

impl Dispatcher {
    pub fn new(config: IngestConfig, replies: ReplySink) -> Self {
        Self { config, replies }
    }

    /// Process commands one at a time until the command channel closes
    pub async fn run(&self, mut commands: UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.dispatch(command).await;
        }
        log::debug!("Command channel closed");
    }

    pub async fn dispatch(&self, command: Command) {
        log::debug!("Dispatching {}", command.action());

        match command {
            Command::SampleFile {
                file,
                max_sample_lines,
            } => self.handle_sample_file(file, max_sample_lines).await,
            Command::ParseRows {
                row_data,
                line_separator,
                field_separator,
                quote_style,
            } => self.handle_parse_rows(&row_data, line_separator, field_separator, quote_style),
            Command::UploadFileData { file, parameters } => {
                self.handle_upload_file_data(file, parameters).await
            }
            Command::UploadDataForDbTable {
                file,
                columns,
                target_table_name,
                field_separator,
            } => {
                self.handle_upload_for_table(file, columns, target_table_name, field_separator)
                    .await
            }
        }
    }

    async fn handle_sample_file(&self, file_ref: FileRef, max_sample_lines: Option<usize>) {
        let options = SampleOptions::new()
            .max_lines(max_sample_lines.unwrap_or(self.config.sample_lines))
            .window_size(self.config.sample_window);

        let result = async {
            let file = file_ref.open().await?;
            sample_file(file.as_ref(), &options).await
        }
        .await;

        match result {
            Ok(sample) => self.replies.send(Reply::SampleFile {
                file_sample_info: sample,
                file: file_ref,
            }),
            Err(err) => self.replies.fail("sampleFile", err),
        }
    }

    fn handle_parse_rows(
        &self,
        row_data: &str,
        line_separator: Option<LineSeparator>,
        field_separator: char,
        quote_style: Option<QuoteStyle>,
    ) {
        match parse_rows_with_style(
            row_data,
            line_separator,
            field_separator,
            quote_style.unwrap_or_default(),
        ) {
            Ok(table) => self.replies.send(Reply::ParseRows { table }),
            Err(err) => self.replies.fail("parseRows", err),
        }
    }

    async fn handle_upload_file_data(&self, file_ref: FileRef, parameters: BTreeMap<String, String>) {
        let opened = async {
            let transport = HttpTransport::from_config(&self.config)?.with_parameters(parameters);
            let file = file_ref.open().await?;
            Ok::<_, IngestError>((file, transport))
        }
        .await;

        match opened {
            Ok((file, transport)) => self.upload_reporting(file.as_ref(), &transport).await,
            Err(err) => self.replies.fail("uploadFileData", err),
        }
    }

    /// Upload an opened file, turning any failure into one `feedback` reply
    async fn upload_reporting(&self, file: &dyn FileSource, transport: &dyn ChunkTransport) {
        if let Err(err) = self.upload_with(file, transport).await {
            self.replies.fail("uploadFileData", err);
        }
    }

    async fn handle_upload_for_table(
        &self,
        file_ref: FileRef,
        columns: Vec<ColumnSpec>,
        table: String,
        field_separator: Option<char>,
    ) {
        let target = TableUpload::new(table, columns).field_separator(field_separator.unwrap_or(','));

        let result = async {
            let file = file_ref.open().await?;
            let transport = HttpTransport::from_config(&self.config)?
                .with_parameter("filename", file.name());
            self.upload_for_table_with(file.as_ref(), &transport, &transport, &target)
                .await
        }
        .await;

        if let Err(err) = result {
            self.replies.fail("uploadDataForDbTable", err);
        }
    }

    async fn upload_with(&self, file: &dyn FileSource, transport: &dyn ChunkTransport) -> Result<()> {
        let options = self.replies.upload_options(self.config.chunk_size);
        let result = upload_file(file, transport, &options).await?;
        self.replies.completed(&result);
        Ok(())
    }

    async fn upload_for_table_with(
        &self,
        file: &dyn FileSource,
        transport: &dyn ChunkTransport,
        loader: &dyn TableLoader,
        target: &TableUpload,
    ) -> Result<()> {
        let options = self.replies.upload_options(self.config.chunk_size);
        let outcome = upload_for_table(file, transport, loader, target, &options).await?;
        self.replies.completed(&outcome.upload);
        self.replies.send(Reply::debug(outcome.response));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::FailingFile;
    use crate::source::MemoryFile;
    use crate::upload::transport::testing::RecordingTransport;
    use crate::upload::{FieldType, TableLoadRequest};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    fn dispatcher(config: IngestConfig) -> (Dispatcher, mpsc::UnboundedReceiver<Reply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher::new(config, ReplySink::new(tx)), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Reply>) -> Vec<Reply> {
        let mut replies = Vec::new();
        while let Ok(reply) = rx.try_recv() {
            replies.push(reply);
        }
        replies
    }

    struct EchoLoader;

    #[async_trait]
    impl TableLoader for EchoLoader {
        async fn load_to_table(&self, request: &TableLoadRequest) -> Result<String> {
            Ok(request.insert_sql.clone())
        }
    }

    #[tokio::test]
    async fn test_sample_command() {
        let (dispatcher, mut rx) = dispatcher(IngestConfig::new());
        let file = FileRef::inline("a.csv", "a,b,c\n1,2,3\n4,5,6\n");

        dispatcher
            .dispatch(Command::SampleFile {
                file: file.clone(),
                max_sample_lines: Some(2),
            })
            .await;

        match drain(&mut rx).as_slice() {
            [Reply::SampleFile {
                file_sample_info,
                file: echoed,
            }] => {
                assert_eq!(file_sample_info.sample_text, "a,b,c\n1,2,3");
                assert_eq!(file_sample_info.field_separator_suggestion, Some(','));
                assert_eq!(echoed, &file);
            }
            other => panic!("unexpected replies: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sample_missing_file_is_feedback() {
        let (dispatcher, mut rx) = dispatcher(IngestConfig::new());
        dispatcher
            .dispatch(Command::SampleFile {
                file: FileRef::path("/nonexistent/input.csv"),
                max_sample_lines: None,
            })
            .await;

        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].is_feedback());
    }

    #[tokio::test]
    async fn test_parse_command() {
        let (dispatcher, mut rx) = dispatcher(IngestConfig::new());
        dispatcher
            .dispatch(Command::ParseRows {
                row_data: "a,\"b,c\",d".to_string(),
                line_separator: Some(LineSeparator::Lf),
                field_separator: ',',
                quote_style: None,
            })
            .await;

        match drain(&mut rx).as_slice() {
            [Reply::ParseRows { table }] => {
                assert_eq!(table.rows(), &[vec!["a", "b,c", "d"]]);
            }
            other => panic!("unexpected replies: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_without_endpoint_is_feedback() {
        let (dispatcher, mut rx) = dispatcher(IngestConfig::new());
        dispatcher
            .dispatch(Command::UploadFileData {
                file: FileRef::inline("a.csv", "a\n"),
                parameters: BTreeMap::new(),
            })
            .await;

        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].is_feedback());
    }

    #[tokio::test]
    async fn test_upload_progress_replies() {
        let (dispatcher, mut rx) = dispatcher(IngestConfig::new().chunk_size(4));
        let file = MemoryFile::new("a.csv", "1,2\n3,4\n");
        let transport = RecordingTransport::default();

        dispatcher.upload_with(&file, &transport).await.unwrap();

        let replies = drain(&mut rx);
        assert_eq!(
            replies,
            vec![
                Reply::FuseBaseLoadProgress {
                    load_progress: 50.0,
                    record_count: None,
                    complete: false
                },
                Reply::FuseBaseLoadProgress {
                    load_progress: 100.0,
                    record_count: None,
                    complete: false
                },
                Reply::FuseBaseLoadProgress {
                    load_progress: 100.0,
                    record_count: Some(2),
                    complete: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_read_failure_is_single_feedback() {
        let (dispatcher, mut rx) = dispatcher(IngestConfig::new().chunk_size(10));
        let file = FailingFile::new(vec![b'x'; 50], 2);
        let transport = RecordingTransport::default();

        dispatcher.upload_reporting(&file, &transport).await;

        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 3);
        assert!(matches!(
            replies[0],
            Reply::FuseBaseLoadProgress { complete: false, .. }
        ));
        assert!(matches!(
            replies[1],
            Reply::FuseBaseLoadProgress { complete: false, .. }
        ));
        assert_eq!(replies.iter().filter(|r| r.is_feedback()).count(), 1);
        match &replies[2] {
            Reply::Feedback { message } => assert!(message.starts_with("Read error")),
            other => panic!("unexpected final reply: {:?}", other),
        }
        assert!(transport.payloads().iter().all(|p| !p.is_end_of_file()));
    }

    #[tokio::test]
    async fn test_table_upload_replies() {
        let (dispatcher, mut rx) = dispatcher(IngestConfig::new());
        let file = MemoryFile::new("p.csv", "1,Ada\n");
        let transport = RecordingTransport::default();
        let target = TableUpload::new("people", vec![ColumnSpec::new("id", FieldType::Number)]);

        dispatcher
            .upload_for_table_with(&file, &transport, &EchoLoader, &target)
            .await
            .unwrap();

        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 3);
        assert_eq!(
            replies[2],
            Reply::debug("INSERT INTO people (id) VALUES($0)")
        );
    }

    #[tokio::test]
    async fn test_table_upload_invalid_columns() {
        let config = IngestConfig::new().endpoint("http://127.0.0.1:9");
        let (dispatcher, mut rx) = dispatcher(config);

        dispatcher
            .dispatch(Command::UploadDataForDbTable {
                file: FileRef::inline("p.csv", "1,Ada\n"),
                columns: vec![],
                target_table_name: "people".to_string(),
                field_separator: None,
            })
            .await;

        let replies = drain(&mut rx);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].is_feedback());
    }
}
