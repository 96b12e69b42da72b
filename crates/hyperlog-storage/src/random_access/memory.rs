//! In-memory byte store

use std::io;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RandomAccess, eof};

/// Byte store backed by a `Vec<u8>`
///
/// Sync is a no-op; contents live as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryFile {
    buf: RwLock<Vec<u8>>,
}

impl MemoryFile {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `bytes`
    pub fn with_contents(bytes: Vec<u8>) -> Self {
        Self {
            buf: RwLock::new(bytes),
        }
    }

    /// Copy of the current contents
    pub async fn contents(&self) -> Vec<u8> {
        self.buf.read().await.clone()
    }
}

#[async_trait]
impl RandomAccess for MemoryFile {
    async fn read(&self, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        let buf = self.buf.read().await;
        let size = buf.len() as u64;
        let end = offset
            .checked_add(length)
            .filter(|end| *end <= size)
            .ok_or_else(|| eof(offset, length, size))?;
        Ok(buf[offset as usize..end as usize].to_vec())
    }

    async fn write(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let mut buf = self.buf.write().await;
        let start = offset as usize;
        let end = start + data.len();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);
        Ok(())
    }

    async fn len(&self) -> io::Result<u64> {
        Ok(self.buf.read().await.len() as u64)
    }

    async fn truncate(&self, length: u64) -> io::Result<()> {
        self.buf.write().await.resize(length as usize, 0);
        Ok(())
    }

    async fn sync_all(&self) -> io::Result<()> {
        Ok(())
    }
}
