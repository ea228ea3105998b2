//! File handle abstraction shared by the sampler and the uploader
//!
//! A [`FileSource`] is byte-addressable, knows its total size, and serves
//! range reads. It is owned by the caller and only borrowed by the
//! components that read from it.
//!
//! # Source Types
//!
//! - **Local**: a file on the local filesystem ([`LocalFile`])
//! - **Memory**: data already held by the caller ([`MemoryFile`])

mod local;
mod memory;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use local::LocalFile;
pub use memory::MemoryFile;

/// Read-only, byte-addressable view of a file for the duration of a session
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Display name of the file, sent to the receiver as the file name
    fn name(&self) -> &str;

    /// Total size in bytes, fixed when the handle was opened
    fn size(&self) -> u64;

    /// Read up to `len` bytes starting at `offset`
    ///
    /// Reads that reach past the end are clamped to the recorded size; a
    /// read starting at or after the end returns an empty buffer.
    async fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>>;
}

/// Serializable reference to a file, as carried in worker commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileRef {
    /// A file on the local filesystem
    Path { path: PathBuf },
    /// Text supplied inline by the caller
    Inline { name: String, data: String },
}

impl FileRef {
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        FileRef::Path { path: path.into() }
    }

    pub fn inline(name: impl Into<String>, data: impl Into<String>) -> Self {
        FileRef::Inline {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Open the referenced file
    pub async fn open(&self) -> Result<Box<dyn FileSource>> {
        match self {
            FileRef::Path { path } => Ok(Box::new(LocalFile::open(path).await?)),
            FileRef::Inline { name, data } => {
                Ok(Box::new(MemoryFile::new(name.clone(), data.as_bytes().to_vec())))
            }
        }
    }
}

/// Clamp a requested range to a file of `size` bytes
pub(crate) fn clamp_range(size: u64, offset: u64, len: usize) -> usize {
    if offset >= size {
        return 0;
    }
    (size - offset).min(len as u64) as usize
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(10, 0, 4), 4);
        assert_eq!(clamp_range(10, 8, 4), 2);
        assert_eq!(clamp_range(10, 10, 4), 0);
        assert_eq!(clamp_range(10, 12, 4), 0);
        assert_eq!(clamp_range(0, 0, 4), 0);
    }

    #[test]
    fn test_file_ref_json() {
        let by_path: FileRef = serde_json::from_str(r#"{"path": "/data/sales.csv"}"#).unwrap();
        assert_eq!(by_path, FileRef::path("/data/sales.csv"));

        let inline: FileRef =
            serde_json::from_str(r#"{"name": "pasted.csv", "data": "a,b\n1,2"}"#).unwrap();
        assert_eq!(inline, FileRef::inline("pasted.csv", "a,b\n1,2"));
    }

    #[tokio::test]
    async fn test_open_inline_ref() {
        let file = FileRef::inline("pasted.csv", "a,b\n1,2").open().await.unwrap();
        assert_eq!(file.name(), "pasted.csv");
        assert_eq!(file.size(), 7);
        assert_eq!(file.read_range(4, 100).await.unwrap(), b"1,2".to_vec());
    }
}
