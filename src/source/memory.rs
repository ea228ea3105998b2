//! In-memory file handle

use super::{clamp_range, FileSource};
use crate::error::Result;
use async_trait::async_trait;

/// File contents already held in memory by the caller
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let available = clamp_range(self.size(), offset, len);
        if available == 0 {
            return Ok(Vec::new());
        }
        let start = offset as usize;
        Ok(self.data[start..start + available].to_vec())
    }
}
