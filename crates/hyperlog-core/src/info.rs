//! Counters reported by log operations

use serde::{Deserialize, Serialize};

/// Totals of a log after a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppendOutcome {
    /// Number of entries in the log
    pub length: u64,
    /// Sum of the byte lengths of all entries
    pub byte_length: u64,
}

impl AppendOutcome {
    pub fn new(length: u64, byte_length: u64) -> Self {
        Self {
            length,
            byte_length,
        }
    }
}

/// Snapshot of a log's observable state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// Number of entries in the log
    pub length: u64,
    /// Sum of the byte lengths of all entries
    pub byte_length: u64,
    /// Whether the session holds the secret key and may append
    pub writable: bool,
}

impl From<Info> for AppendOutcome {
    fn from(info: Info) -> Self {
        Self::new(info.length, info.byte_length)
    }
}
