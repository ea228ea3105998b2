//! Local filesystem file handle

use super::{clamp_range, FileSource};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// A file on the local filesystem
///
/// The size is recorded when the file is opened and is treated as fixed for
/// the lifetime of the handle.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    size: u64,
    file: Mutex<File>,
}

impl LocalFile {
    /// Open a local file for range reads
    ///
    /// # Example
    /// ```ignore
    /// let file = LocalFile::open("exports/sales.csv").await?;
    /// let head = file.read_range(0, 600_000).await?;
    /// ```
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).await.map_err(|e| {
            IngestError::read_error(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let metadata = file.metadata().await.map_err(|e| {
            IngestError::read_error(format!("Failed to stat {}: {}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(IngestError::invalid_parameter(
                "file",
                format!("Not a regular file: {}", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        log::debug!("Opened {} ({} bytes)", path.display(), metadata.len());

        Ok(Self {
            path,
            name,
            size: metadata.len(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let expected = clamp_range(self.size, offset, len);
        if expected == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await.map_err(|e| {
            IngestError::read_error(format!(
                "Failed to seek {} to offset {}: {}",
                self.path.display(),
                offset,
                e
            ))
        })?;

        let mut buffer = vec![0u8; expected];
        file.read_exact(&mut buffer).await.map_err(|e| {
            IngestError::read_error(format!(
                "Failed to read {} bytes at offset {} of {}: {}",
                expected,
                offset,
                self.path.display(),
                e
            ))
        })?;

        Ok(buffer)
    }
}
