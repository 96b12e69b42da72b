//! Random-access byte stores
//!
//! A log namespace is made of a few flat byte stores. Each store is
//! addressed by absolute offset and can be grown, shrunk and synced. Two
//! implementations exist: [`DiskFile`] for real namespaces and
//! [`MemoryFile`] for tests and ephemeral logs.

mod disk;
#[cfg(test)]
pub(crate) mod faulty;
mod memory;

pub use disk::DiskFile;
pub use memory::MemoryFile;

use std::fmt::Debug;
use std::io;

use async_trait::async_trait;

/// A byte store supporting positional reads and writes
///
/// Reads past the end fail with [`io::ErrorKind::UnexpectedEof`]. Writes past
/// the end grow the store, zero-filling any gap.
#[async_trait]
pub trait RandomAccess: Send + Sync + Debug {
    /// Read exactly `length` bytes starting at `offset`
    async fn read(&self, offset: u64, length: u64) -> io::Result<Vec<u8>>;

    /// Write `data` starting at `offset`
    async fn write(&self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Current size of the store in bytes
    async fn len(&self) -> io::Result<u64>;

    /// Shrink (or grow) the store to exactly `length` bytes
    async fn truncate(&self, length: u64) -> io::Result<()>;

    /// Force written bytes to durable storage
    async fn sync_all(&self) -> io::Result<()>;

    /// Whether the store is empty
    async fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len().await? == 0)
    }
}

pub(crate) fn eof(offset: u64, length: u64, size: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read of {length} bytes at offset {offset} exceeds store size {size}"),
    )
}
