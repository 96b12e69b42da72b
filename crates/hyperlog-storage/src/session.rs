//! Sessions
//!
//! A [`Session`] is the handle through which one open/close interval of a
//! log is used. It serializes appends behind an exclusive guard while
//! letting reads of committed entries run side by side.
//!
//! ```text
//! Unopened -> Opening -> Open -> Closing -> Closed
//!                 \
//!                  -> Failed
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use hyperlog_core::{AppendOutcome, Info, PartialKeypair};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::log_store::LogStore;
use crate::storage::Storage;

/// Life cycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Configured but not opened yet
    Unopened,
    /// Binding identity and recovering
    Opening,
    /// Ready for appends and reads
    Open,
    /// Flushing before release
    Closing,
    /// Released; a new open is required
    Closed,
    /// Opening failed; the log was never usable
    Failed,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    log: Option<LogStore>,
}

impl Inner {
    fn log(&self) -> LogResult<&LogStore> {
        self.log.as_ref().ok_or(LogError::SessionClosed)
    }

    fn log_mut(&mut self) -> LogResult<&mut LogStore> {
        self.log.as_mut().ok_or(LogError::SessionClosed)
    }
}

/// Builder for opening a [`Session`] over some storage
#[derive(Debug)]
pub struct SessionBuilder {
    storage: Storage,
    key_pair: PartialKeypair,
    config: LogConfig,
}

impl SessionBuilder {
    /// Start building a session for `key_pair` over `storage`
    pub fn new(storage: Storage, key_pair: PartialKeypair) -> Self {
        Self {
            storage,
            key_pair,
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable fsync on every append
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.config.sync_on_write = enabled;
        self
    }

    /// Enable or disable rehashing all entries on open
    pub fn verify_on_open(mut self, enabled: bool) -> Self {
        self.config.verify_on_open = enabled;
        self
    }

    /// Bind the identity, recover the log and open the session
    #[instrument(skip_all, fields(key = %self.key_pair.short_id()))]
    pub async fn open(self) -> LogResult<Session> {
        debug!(
            from = ?SessionState::Unopened,
            to = ?SessionState::Opening,
            "Opening session"
        );
        let location = self.storage.location().map(Path::to_path_buf);
        let key = self.key_pair.short_id();

        match LogStore::create(self.storage, self.key_pair, self.config).await {
            Ok(log) => {
                info!(
                    length = log.len(),
                    byte_length = log.byte_length(),
                    writable = log.info().writable,
                    "Session open"
                );
                Ok(Session {
                    inner: RwLock::new(Inner {
                        state: SessionState::Open,
                        log: Some(log),
                    }),
                    key,
                    location,
                })
            }
            Err(e) => {
                warn!(state = ?SessionState::Failed, error = %e, "Session failed to open");
                Err(e)
            }
        }
    }
}

/// An open log
#[derive(Debug)]
pub struct Session {
    inner: RwLock<Inner>,
    key: String,
    location: Option<PathBuf>,
}

impl Session {
    /// Start building a session over `storage`
    pub fn builder(storage: Storage, key_pair: PartialKeypair) -> SessionBuilder {
        SessionBuilder::new(storage, key_pair)
    }

    /// Open the namespace directory `dir` with the default configuration
    pub async fn open_disk(dir: impl AsRef<Path>, key_pair: PartialKeypair) -> LogResult<Self> {
        Self::open_disk_with(dir, key_pair, LogConfig::default()).await
    }

    /// Open the namespace directory `dir`
    pub async fn open_disk_with(
        dir: impl AsRef<Path>,
        key_pair: PartialKeypair,
        config: LogConfig,
    ) -> LogResult<Self> {
        let storage = match Storage::open_disk(dir).await {
            Ok(storage) => storage,
            Err(e) => {
                warn!(state = ?SessionState::Failed, error = %e, "Session failed to open");
                return Err(e);
            }
        };
        SessionBuilder::new(storage, key_pair)
            .config(config)
            .open()
            .await
    }

    /// Open the namespace for `key_pair` under `root`
    pub async fn open_in(root: impl AsRef<Path>, key_pair: PartialKeypair) -> LogResult<Self> {
        let dir = key_pair.namespace_in(root);
        Self::open_disk(dir, key_pair).await
    }

    /// Current life-cycle state
    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state
    }

    /// Namespace directory, for disk-backed sessions
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Short form of the log's public key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current totals
    pub async fn info(&self) -> LogResult<Info> {
        Ok(self.inner.read().await.log()?.info())
    }

    /// Append `entries` as one atomic batch
    pub async fn append<B: AsRef<[u8]> + Sync>(&self, entries: &[B]) -> LogResult<AppendOutcome> {
        let mut inner = self.inner.write().await;
        inner.log_mut()?.append(entries).await
    }

    /// Append a single entry
    pub async fn append_one(&self, entry: impl AsRef<[u8]> + Sync) -> LogResult<AppendOutcome> {
        self.append(&[entry]).await
    }

    /// Read the entry at `index`
    pub async fn get(&self, index: u64) -> LogResult<Bytes> {
        self.inner.read().await.log()?.get(index).await
    }

    /// Read the entries in `range`
    pub async fn get_batch(&self, range: Range<u64>) -> LogResult<Vec<Bytes>> {
        self.inner.read().await.log()?.get_batch(range).await
    }

    /// Force written bytes to durable storage
    pub async fn flush(&self) -> LogResult<()> {
        self.inner.read().await.log()?.flush().await
    }

    /// Flush and release the log
    ///
    /// The session ends up `Closed` even if the final flush fails; the error
    /// is returned so the caller knows durability was not confirmed.
    pub async fn close(&self) -> LogResult<()> {
        let mut inner = self.inner.write().await;
        let log = inner.log.take().ok_or(LogError::SessionClosed)?;
        inner.state = SessionState::Closing;

        let result = log.close().await;
        inner.state = SessionState::Closed;

        match &result {
            Ok(()) => info!(key = %self.key, "Session closed"),
            Err(e) => error!(key = %self.key, error = %e, "Session closed without a final flush"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_access::faulty::faulty_storage;
    use crate::storage::Store;
    use hyperlog_core::SigningKey;

    fn key_pair() -> PartialKeypair {
        PartialKeypair::from_signing_key(SigningKey::from_bytes(&[5u8; 32]))
    }

    async fn memory_session() -> Session {
        let storage = Storage::new_memory().await.unwrap();
        Session::builder(storage, key_pair()).open().await.unwrap()
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let storage = Storage::new_memory().await.unwrap();
        let session = Session::builder(storage, key_pair())
            .sync_on_write(false)
            .open()
            .await
            .unwrap();
        assert_eq!(session.state().await, SessionState::Open);

        session.close().await.unwrap();
        assert_eq!(session.state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_operations_after_close_fail() {
        let session = memory_session().await;
        session.append(&["a"]).await.unwrap();
        session.close().await.unwrap();

        assert!(matches!(session.info().await, Err(LogError::SessionClosed)));
        assert!(matches!(
            session.append(&["b"]).await,
            Err(LogError::SessionClosed)
        ));
        assert!(matches!(session.get(0).await, Err(LogError::SessionClosed)));
        assert!(matches!(session.flush().await, Err(LogError::SessionClosed)));
        assert!(matches!(session.close().await, Err(LogError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_failed_close_still_closes() {
        let (storage, faults) = faulty_storage(&[Store::Data]).await;
        let session = Session::builder(storage, key_pair()).open().await.unwrap();
        session.append(&["a"]).await.unwrap();

        faults.fail_syncs(true);
        assert!(matches!(
            session.flush().await,
            Err(LogError::DurabilityFailure(_))
        ));
        assert_eq!(session.state().await, SessionState::Open);

        let err = session.close().await.unwrap_err();
        assert!(matches!(err, LogError::DurabilityFailure(_)));
        assert_eq!(session.state().await, SessionState::Closed);
        assert!(matches!(session.get(0).await, Err(LogError::SessionClosed)));
        assert!(matches!(session.close().await, Err(LogError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_append_one_and_batch_reads() {
        let session = memory_session().await;
        session.append_one("first").await.unwrap();
        let outcome = session.append(&["second", "third"]).await.unwrap();
        assert_eq!(outcome, AppendOutcome::new(3, 16));

        let entries = session.get_batch(0..3).await.unwrap();
        assert_eq!(entries[0], "first");
        assert_eq!(entries[2], "third");
        assert!(session.location().is_none());
        assert_eq!(session.key(), key_pair().short_id());
    }
}
