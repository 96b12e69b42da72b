//! Append-only log store
//!
//! Entries are stored back to back in the `data` store. The `index` store
//! keeps one big-endian end offset per entry, so entry `i` spans
//! `[end(i - 1), end(i))` and can be read without scanning. The same offsets
//! are cached in memory for O(1) lookups.
//!
//! An append writes data and index past the committed tail first, then seals
//! the batch with one signed commit record in the oplog. Nothing is visible
//! in memory until that record is written, so a failed append leaves the
//! observable log unchanged.

use std::ops::Range;

use bytes::Bytes;
use hyperlog_core::{AppendOutcome, Info, PartialKeypair};
use tracing::{debug, error, instrument, warn};

use crate::binding::{self, BoundIdentity};
use crate::chain::TreeHash;
use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::oplog::CommitRecord;
use crate::recovery;
use crate::storage::{Storage, Store};

/// Size of one index record
pub(crate) const OFFSET_SIZE: u64 = 8;

/// What the last durable commit says about the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CommittedState {
    pub length: u64,
    pub byte_length: u64,
    pub tree_hash: TreeHash,
    /// Byte length of the intact oplog
    pub oplog_length: u64,
}

impl CommittedState {
    pub fn empty(oplog_length: u64) -> Self {
        Self {
            length: 0,
            byte_length: 0,
            tree_hash: TreeHash::genesis(),
            oplog_length,
        }
    }
}

/// A durable, append-only sequence of byte entries
#[derive(Debug)]
pub struct LogStore {
    storage: Storage,
    identity: BoundIdentity,
    config: LogConfig,
    state: CommittedState,
    /// End offset of every entry
    offsets: Vec<u64>,
    /// Set when a failed append could not be rolled back on disk
    poisoned: bool,
}

impl LogStore {
    /// Create the log in `storage`, or open it if it already exists
    ///
    /// Binds `key_pair` to the namespace, then recovers the committed state.
    #[instrument(skip_all, fields(key = %key_pair.short_id()))]
    pub async fn create(
        storage: Storage,
        key_pair: PartialKeypair,
        config: LogConfig,
    ) -> LogResult<Self> {
        let identity = binding::bind(&storage, key_pair).await?;
        let recovered = recovery::recover(&storage, &identity.key_pair, &config).await?;
        if recovered.repaired {
            warn!("Discarded an append that never committed");
        }

        Ok(Self {
            storage,
            identity,
            config,
            state: recovered.state,
            offsets: recovered.offsets,
            poisoned: false,
        })
    }

    /// Current totals
    pub fn info(&self) -> Info {
        Info {
            length: self.state.length,
            byte_length: self.state.byte_length,
            writable: self.identity.key_pair.is_writable(),
        }
    }

    /// Number of entries
    pub fn len(&self) -> u64 {
        self.state.length
    }

    /// Whether the log has no entries
    pub fn is_empty(&self) -> bool {
        self.state.length == 0
    }

    /// Total entry bytes
    pub fn byte_length(&self) -> u64 {
        self.state.byte_length
    }

    /// Key pair the log is bound to
    pub fn key_pair(&self) -> &PartialKeypair {
        &self.identity.key_pair
    }

    /// Whether this open created the namespace
    pub fn created(&self) -> bool {
        self.identity.created
    }

    /// Underlying storage
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Append `entries` as one atomic batch
    ///
    /// On success the entries occupy indices `[len, len + entries.len())` and
    /// are durable. On failure nothing was appended.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub async fn append<B: AsRef<[u8]>>(&mut self, entries: &[B]) -> LogResult<AppendOutcome> {
        if self.poisoned {
            return Err(LogError::durability(
                "an earlier append could not be rolled back; reopen the log",
            ));
        }
        if !self.identity.key_pair.is_writable() {
            return Err(LogError::ReadOnly);
        }

        let committed = self.state;
        if entries.is_empty() {
            return Ok(AppendOutcome::new(committed.length, committed.byte_length));
        }

        let batch_bytes: usize = entries.iter().map(|e| e.as_ref().len()).sum();
        let mut data = Vec::with_capacity(batch_bytes);
        let mut index = Vec::with_capacity(entries.len() * OFFSET_SIZE as usize);
        let mut new_offsets = Vec::with_capacity(entries.len());
        let mut tree_hash = committed.tree_hash;
        let mut end = committed.byte_length;

        for entry in entries {
            let entry = entry.as_ref();
            data.extend_from_slice(entry);
            end += entry.len() as u64;
            index.extend_from_slice(&end.to_be_bytes());
            new_offsets.push(end);
            tree_hash = tree_hash.extend(entry);
        }

        let length = committed.length + entries.len() as u64;
        let commit = CommitRecord::sign(&self.identity.key_pair, length, end, tree_hash)?;
        let frame = commit.to_frame()?;

        if let Err(e) = self.write_batch(&committed, &data, &index, &frame).await {
            warn!(error = %e, "Append failed, rolling back");
            if let Err(rollback) = self.rollback(&committed).await {
                error!(error = %rollback, "Rollback failed, refusing further appends");
                self.poisoned = true;
            }
            return Err(e);
        }

        self.offsets.extend(new_offsets);
        self.state = CommittedState {
            length,
            byte_length: end,
            tree_hash,
            oplog_length: committed.oplog_length + frame.len() as u64,
        };

        debug!(length, byte_length = end, "Appended batch");
        Ok(AppendOutcome::new(length, end))
    }

    async fn write_batch(
        &self,
        committed: &CommittedState,
        data: &[u8],
        index: &[u8],
        commit: &[u8],
    ) -> LogResult<()> {
        let sync = self.config.sync_on_write;

        self.write_store(Store::Data, committed.byte_length, data, sync)
            .await?;
        self.write_store(Store::Index, committed.length * OFFSET_SIZE, index, sync)
            .await?;
        // The commit record goes last: it is what makes the batch exist
        self.write_store(Store::Oplog, committed.oplog_length, commit, sync)
            .await
    }

    async fn write_store(&self, store: Store, offset: u64, bytes: &[u8], sync: bool) -> LogResult<()> {
        let target = self.storage.store(store);
        target
            .write(offset, bytes)
            .await
            .map_err(|e| LogError::durability(format!("write to {store} failed: {e}")))?;
        if sync {
            target
                .sync_all()
                .await
                .map_err(|e| LogError::durability(format!("sync of {store} failed: {e}")))?;
        }
        Ok(())
    }

    async fn rollback(&self, committed: &CommittedState) -> LogResult<()> {
        let targets = [
            (Store::Oplog, committed.oplog_length),
            (Store::Data, committed.byte_length),
            (Store::Index, committed.length * OFFSET_SIZE),
        ];
        for (store, length) in targets {
            let target = self.storage.store(store);
            target.truncate(length).await?;
            if self.config.sync_on_write {
                target.sync_all().await?;
            }
        }
        Ok(())
    }

    /// Read the entry at `index`
    pub async fn get(&self, index: u64) -> LogResult<Bytes> {
        let range = self.entry_range(index)?;
        self.read_data(range).await.map(Bytes::from)
    }

    /// Read the entries in `range` with a single data read
    pub async fn get_batch(&self, range: Range<u64>) -> LogResult<Vec<Bytes>> {
        if range.start > self.state.length {
            return Err(LogError::OutOfRange {
                index: range.start,
                length: self.state.length,
            });
        }
        if range.start >= range.end {
            return Ok(Vec::new());
        }
        if range.end > self.state.length {
            return Err(LogError::OutOfRange {
                index: range.end - 1,
                length: self.state.length,
            });
        }

        let first = self.entry_range(range.start)?;
        let last = self.entry_range(range.end - 1)?;
        let buf = Bytes::from(self.read_data(first.start..last.end).await?);

        let mut start = first.start;
        let entries = self.offsets[range.start as usize..range.end as usize]
            .iter()
            .map(|&end| {
                let entry = buf.slice((start - first.start) as usize..(end - first.start) as usize);
                start = end;
                entry
            })
            .collect();
        Ok(entries)
    }

    fn entry_range(&self, index: u64) -> LogResult<Range<u64>> {
        if index >= self.state.length {
            return Err(LogError::OutOfRange {
                index,
                length: self.state.length,
            });
        }
        let i = index as usize;
        let start = if i == 0 { 0 } else { self.offsets[i - 1] };
        Ok(start..self.offsets[i])
    }

    async fn read_data(&self, range: Range<u64>) -> LogResult<Vec<u8>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        self.storage
            .store(Store::Data)
            .read(range.start, range.end - range.start)
            .await
            .map_err(|e| LogError::Io(format!("read of data {range:?} failed: {e}")))
    }

    /// Force every written byte to durable storage
    pub async fn flush(&self) -> LogResult<()> {
        for store in Store::ALL {
            self.storage
                .store(store)
                .sync_all()
                .await
                .map_err(|e| LogError::durability(format!("sync of {store} failed: {e}")))?;
        }
        Ok(())
    }

    /// Flush and release the storage
    pub async fn close(self) -> LogResult<()> {
        self.flush().await?;
        debug!(
            length = self.state.length,
            byte_length = self.state.byte_length,
            "Closed log"
        );
        Ok(())
    }
}
