//! Memory store with injectable failures

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{MemoryFile, RandomAccess};
use crate::storage::{Storage, Store};

/// Switches shared between a test and its [`FaultyFile`]s
#[derive(Debug, Default)]
pub(crate) struct Faults {
    pub writes: AtomicBool,
    pub truncates: AtomicBool,
    pub syncs: AtomicBool,
}

impl Faults {
    pub fn fail_writes(&self, on: bool) {
        self.writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_truncates(&self, on: bool) {
        self.truncates.store(on, Ordering::SeqCst);
    }

    pub fn fail_syncs(&self, on: bool) {
        self.syncs.store(on, Ordering::SeqCst);
    }
}

fn injected(flag: &AtomicBool, what: &str) -> io::Result<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(io::Error::other(format!("injected {what} failure")));
    }
    Ok(())
}

/// [`MemoryFile`] that fails writes, truncates or syncs on demand
#[derive(Debug)]
pub(crate) struct FaultyFile {
    inner: MemoryFile,
    faults: Arc<Faults>,
}

impl FaultyFile {
    pub fn new(faults: Arc<Faults>) -> Self {
        Self {
            inner: MemoryFile::new(),
            faults,
        }
    }
}

#[async_trait]
impl RandomAccess for FaultyFile {
    async fn read(&self, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        self.inner.read(offset, length).await
    }

    async fn write(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        injected(&self.faults.writes, "write")?;
        self.inner.write(offset, data).await
    }

    async fn len(&self) -> io::Result<u64> {
        self.inner.len().await
    }

    async fn truncate(&self, length: u64) -> io::Result<()> {
        injected(&self.faults.truncates, "truncate")?;
        self.inner.truncate(length).await
    }

    async fn sync_all(&self) -> io::Result<()> {
        injected(&self.faults.syncs, "sync")?;
        self.inner.sync_all().await
    }
}

/// Memory storage whose `faulty` stores share one set of switches
pub(crate) async fn faulty_storage(faulty: &[Store]) -> (Storage, Arc<Faults>) {
    let faults = Arc::new(Faults::default());
    let storage = Storage::open(|store| {
        let file: Box<dyn RandomAccess> = if faulty.contains(&store) {
            Box::new(FaultyFile::new(faults.clone()))
        } else {
            Box::new(MemoryFile::new())
        };
        async move { Ok(file) }
    })
    .await
    .unwrap();
    (storage, faults)
}
