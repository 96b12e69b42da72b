//! Log store configuration

/// Configuration for an open log
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to fsync data, index and oplog before an append returns
    ///
    /// Appends always reach the operating system before returning, so they
    /// survive the process exiting. Syncing also protects them against power
    /// loss.
    pub sync_on_write: bool,
    /// Whether recovery rehashes every entry and checks it against the last
    /// signed commit
    pub verify_on_open: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            verify_on_open: true,
        }
    }
}

impl LogConfig {
    /// Config for throwaway logs: no fsync, no full verification on open
    pub fn ephemeral() -> Self {
        Self {
            sync_on_write: false,
            verify_on_open: false,
        }
    }
}
