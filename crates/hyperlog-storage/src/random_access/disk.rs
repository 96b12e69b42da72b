//! File-backed byte store

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{RandomAccess, eof};

/// Byte store backed by a single file
///
/// The file handle sits behind a mutex because seeking and reading share one
/// cursor.
#[derive(Debug)]
pub struct DiskFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl DiskFile {
    /// Open the file at `path`, creating it empty if missing
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RandomAccess for DiskFile {
    async fn read(&self, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        let mut file = self.file.lock().await;
        let size = file.metadata().await?.len();
        if offset.checked_add(length).is_none_or(|end| end > size) {
            return Err(eof(offset, length, size));
        }

        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }

    async fn write(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(data).await?;
        // tokio hands writes to a blocking thread; flush waits for them
        file.flush().await
    }

    async fn len(&self) -> io::Result<u64> {
        let file = self.file.lock().await;
        Ok(file.metadata().await?.len())
    }

    async fn truncate(&self, length: u64) -> io::Result<()> {
        let file = self.file.lock().await;
        file.set_len(length).await
    }

    async fn sync_all(&self) -> io::Result<()> {
        let file = self.file.lock().await;
        file.sync_all().await
    }
}
