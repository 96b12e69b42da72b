//! # Hyperlog Storage
//!
//! Durable append-only log store.
//!
//! A log is an ordered sequence of immutable byte entries owned by one
//! ed25519 key. Entries get contiguous 0-based indices in append order and
//! survive process restarts without loss or reordering.
//!
//! ## Features
//!
//! - **RandomAccess trait**: byte store abstraction with disk and memory backends
//! - **Identity binding**: a namespace records the first key that opens it
//!   and rejects every other key
//! - **LogStore**: atomic batch appends sealed by signed commit records
//! - **Recovery**: rebuilds counters and offsets on open, drops torn tails
//! - **Session**: open/append/get/close life cycle with a single-writer lock
//!
//! ## Example
//!
//! ```rust,ignore
//! use hyperlog_core::{PartialKeypair, SigningKey};
//! use hyperlog_storage::Session;
//!
//! #[tokio::main]
//! async fn main() {
//!     let kp = PartialKeypair::from_signing_key(SigningKey::from_bytes(&[1u8; 32]));
//!     let session = Session::open_in("/tmp/hyperlog", kp).await.unwrap();
//!
//!     let outcome = session.append(&["Hello", "World"]).await.unwrap();
//!     assert_eq!((outcome.length, outcome.byte_length), (2, 10));
//!     assert_eq!(session.get(0).await.unwrap(), "Hello");
//!
//!     session.close().await.unwrap();
//! }
//! ```

pub mod binding;
pub mod chain;
pub mod config;
pub mod error;
mod frame;
pub mod log_store;
pub mod oplog;
pub mod random_access;
mod recovery;
pub mod session;
pub mod storage;

// Re-exports
pub use binding::{BoundIdentity, FORMAT_VERSION, NamespaceHeader, bind};
pub use chain::TreeHash;
pub use config::LogConfig;
pub use error::{LogError, LogResult};
pub use log_store::LogStore;
pub use oplog::CommitRecord;
pub use random_access::{DiskFile, MemoryFile, RandomAccess};
pub use session::{Session, SessionBuilder, SessionState};
pub use storage::{Storage, Store};

// Re-export shared types from hyperlog-core for convenience
pub use hyperlog_core::{AppendOutcome, Info, PartialKeypair};
