//! Namespace storage
//!
//! A namespace holds one log as four byte stores plus, on disk, a lock file
//! guarding it against a second writer:
//!
//! ```text
//! <namespace>/header   identity the namespace is bound to
//! <namespace>/data     entry bytes, concatenated in index order
//! <namespace>/index    one 8-byte big-endian end offset per entry
//! <namespace>/oplog    signed commit records
//! <namespace>/LOCK     exclusive advisory lock of the open session
//! ```

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tracing::{debug, instrument};

use crate::error::{LogError, LogResult};
use crate::random_access::{DiskFile, MemoryFile, RandomAccess};

const LOCK_FILE: &str = "LOCK";

/// The byte stores making up a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    /// Namespace identity
    Header,
    /// Entry bytes
    Data,
    /// Entry end offsets
    Index,
    /// Commit records
    Oplog,
}

impl Store {
    /// All stores in creation order
    pub const ALL: [Store; 4] = [Store::Header, Store::Data, Store::Index, Store::Oplog];

    /// File name of the store inside a namespace directory
    pub fn file_name(self) -> &'static str {
        match self {
            Store::Header => "header",
            Store::Data => "data",
            Store::Index => "index",
            Store::Oplog => "oplog",
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Exclusive lock on a namespace directory, released on drop
#[derive(Debug)]
struct NamespaceLock {
    _file: std::fs::File,
}

impl NamespaceLock {
    async fn acquire(dir: &Path) -> LogResult<Self> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?
            .into_std()
            .await;

        fs2::FileExt::try_lock_exclusive(&file).map_err(|e| {
            if e.kind() == io::ErrorKind::WouldBlock
                || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
            {
                LogError::ConcurrentWriterConflict(format!(
                    "namespace {} is open in another session",
                    dir.display()
                ))
            } else {
                LogError::Io(format!("failed to lock {}: {e}", path.display()))
            }
        })?;

        Ok(Self { _file: file })
    }
}

/// The byte stores of one namespace
pub struct Storage {
    header: Box<dyn RandomAccess>,
    data: Box<dyn RandomAccess>,
    index: Box<dyn RandomAccess>,
    oplog: Box<dyn RandomAccess>,
    location: Option<PathBuf>,
    lock: Option<NamespaceLock>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("location", &self.location)
            .field("locked", &self.lock.is_some())
            .finish_non_exhaustive()
    }
}

impl Storage {
    /// Build storage from a callback creating one byte store per [`Store`]
    pub async fn open<Cb, Fut>(create: Cb) -> LogResult<Self>
    where
        Cb: Fn(Store) -> Fut,
        Fut: Future<Output = io::Result<Box<dyn RandomAccess>>>,
    {
        Ok(Self {
            header: create(Store::Header).await?,
            data: create(Store::Data).await?,
            index: create(Store::Index).await?,
            oplog: create(Store::Oplog).await?,
            location: None,
            lock: None,
        })
    }

    /// New storage backed by fresh [`MemoryFile`]s
    pub async fn new_memory() -> LogResult<Self> {
        Self::open(|_| async { Ok(Box::new(MemoryFile::new()) as Box<dyn RandomAccess>) }).await
    }

    /// Open (or create) the namespace directory `dir`
    ///
    /// Takes the namespace lock first; a second open of the same directory
    /// fails with [`LogError::ConcurrentWriterConflict`] until this storage is
    /// dropped.
    #[instrument(skip_all, fields(path = %dir.as_ref().display()))]
    pub async fn open_disk(dir: impl AsRef<Path>) -> LogResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let lock = NamespaceLock::acquire(&dir).await?;
        let fresh = !tokio::fs::try_exists(dir.join(Store::Header.file_name())).await?;

        let mut storage = Self::open(|store| {
            let path = dir.join(store.file_name());
            async move { Ok(Box::new(DiskFile::open(path).await?) as Box<dyn RandomAccess>) }
        })
        .await?;

        if fresh {
            sync_dir(&dir).await?;
            debug!("Created namespace files");
        }

        storage.location = Some(dir);
        storage.lock = Some(lock);
        Ok(storage)
    }

    /// Directory of a disk-backed namespace
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Byte store for `store`
    pub fn store(&self, store: Store) -> &dyn RandomAccess {
        match store {
            Store::Header => self.header.as_ref(),
            Store::Data => self.data.as_ref(),
            Store::Index => self.index.as_ref(),
            Store::Oplog => self.oplog.as_ref(),
        }
    }

    /// Current size of every store, in [`Store::ALL`] order
    pub async fn sizes(&self) -> LogResult<[u64; 4]> {
        let mut sizes = [0u64; 4];
        for (size, store) in sizes.iter_mut().zip(Store::ALL) {
            *size = self.store(store).len().await?;
        }
        Ok(sizes)
    }
}

/// Make newly created directory entries durable
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
