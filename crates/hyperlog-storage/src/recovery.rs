//! Recovery
//!
//! Rebuilds the in-memory view of a log from its stores alone:
//!
//! 1. scan the oplog; the last intact commit is the committed state
//! 2. check the commit signature against the namespace key
//! 3. load the entry end offsets and check them against the commit
//! 4. optionally rehash every entry and compare with the commit's chain hash
//! 5. drop bytes beyond the committed sizes left by an interrupted append

use hyperlog_core::PartialKeypair;
use tracing::{debug, info, instrument, warn};

use crate::chain::TreeHash;
use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::log_store::{CommittedState, OFFSET_SIZE};
use crate::oplog;
use crate::storage::{Storage, Store};

/// Largest span of entry bytes read at once while rehashing
const VERIFY_WINDOW: u64 = 4 * 1024 * 1024;

/// State rebuilt by recovery
#[derive(Debug)]
pub(crate) struct Recovered {
    pub state: CommittedState,
    pub offsets: Vec<u64>,
    /// Whether an uncommitted tail was dropped
    pub repaired: bool,
}

/// Recover the committed state of the namespace in `storage`
#[instrument(skip_all, fields(key = %key_pair.short_id()))]
pub(crate) async fn recover(
    storage: &Storage,
    key_pair: &PartialKeypair,
    config: &LogConfig,
) -> LogResult<Recovered> {
    let oplog_store = storage.store(Store::Oplog);
    let oplog_size = oplog_store.len().await?;
    let scan = oplog::scan(&oplog_store.read(0, oplog_size).await?)?;

    let state = match &scan.last {
        None => CommittedState::empty(scan.valid_length),
        Some(commit) => {
            commit.verify(key_pair)?;
            CommittedState {
                length: commit.length,
                byte_length: commit.byte_length,
                tree_hash: commit.tree_hash,
                oplog_length: scan.valid_length,
            }
        }
    };

    let data_size = storage.store(Store::Data).len().await?;
    let index_size = storage.store(Store::Index).len().await?;
    let index_bytes = state
        .length
        .checked_mul(OFFSET_SIZE)
        .ok_or_else(|| LogError::corrupt(format!("commit length {} overflows", state.length)))?;

    if data_size < state.byte_length {
        return Err(LogError::corrupt(format!(
            "data holds {data_size} bytes but {} are committed",
            state.byte_length
        )));
    }
    if index_size < index_bytes {
        return Err(LogError::corrupt(format!(
            "index holds {} entries but {} are committed",
            index_size / OFFSET_SIZE,
            state.length
        )));
    }

    let offsets = load_offsets(storage, &state).await?;

    if config.verify_on_open {
        let tree_hash = rehash(storage, &offsets).await?;
        if tree_hash != state.tree_hash {
            return Err(LogError::corrupt(
                "entry data does not match the committed hash chain",
            ));
        }
        debug!(entries = offsets.len(), "Verified entry data");
    }

    let repaired = repair(storage, &state, oplog_size, data_size, index_size).await?;

    info!(
        length = state.length,
        byte_length = state.byte_length,
        commits = scan.commits,
        repaired,
        "Recovered log"
    );

    Ok(Recovered {
        state,
        offsets,
        repaired,
    })
}

/// Read and check the committed end offsets
async fn load_offsets(storage: &Storage, state: &CommittedState) -> LogResult<Vec<u64>> {
    if state.length == 0 {
        if state.byte_length != 0 {
            return Err(LogError::corrupt("empty log with non-zero byte length"));
        }
        return Ok(Vec::new());
    }

    let raw = storage
        .store(Store::Index)
        .read(0, state.length * OFFSET_SIZE)
        .await?;

    let mut offsets = Vec::with_capacity(state.length as usize);
    let mut previous = 0u64;
    for (i, chunk) in raw.chunks_exact(OFFSET_SIZE as usize).enumerate() {
        let mut bytes = [0u8; OFFSET_SIZE as usize];
        bytes.copy_from_slice(chunk);
        let end = u64::from_be_bytes(bytes);
        if end < previous {
            return Err(LogError::corrupt(format!(
                "entry {i} ends at {end}, before the previous entry ({previous})"
            )));
        }
        offsets.push(end);
        previous = end;
    }

    if previous != state.byte_length {
        return Err(LogError::corrupt(format!(
            "index ends at byte {previous} but {} bytes are committed",
            state.byte_length
        )));
    }
    Ok(offsets)
}

/// Recompute the hash chain from the data store
async fn rehash(storage: &Storage, offsets: &[u64]) -> LogResult<TreeHash> {
    let data = storage.store(Store::Data);
    let mut hash = TreeHash::genesis();
    let mut next = 0usize;
    let mut window_start = 0u64;

    while next < offsets.len() {
        // Take at least one entry, then as many as fit in the window
        let mut last = next;
        while last + 1 < offsets.len() && offsets[last + 1] - window_start <= VERIFY_WINDOW {
            last += 1;
        }
        let window_end = offsets[last];
        let buf = data.read(window_start, window_end - window_start).await?;

        let mut start = window_start;
        for &end in &offsets[next..=last] {
            let from = (start - window_start) as usize;
            let to = (end - window_start) as usize;
            hash = hash.extend(&buf[from..to]);
            start = end;
        }

        next = last + 1;
        window_start = window_end;
    }
    Ok(hash)
}

/// Truncate every store back to its committed size
async fn repair(
    storage: &Storage,
    state: &CommittedState,
    oplog_size: u64,
    data_size: u64,
    index_size: u64,
) -> LogResult<bool> {
    let targets = [
        (Store::Oplog, oplog_size, state.oplog_length),
        (Store::Data, data_size, state.byte_length),
        (Store::Index, index_size, state.length * OFFSET_SIZE),
    ];

    let mut repaired = false;
    for (store, size, committed) in targets {
        if size > committed {
            warn!(
                store = %store,
                size,
                committed,
                "Dropping uncommitted tail"
            );
            let bytes = storage.store(store);
            bytes.truncate(committed).await?;
            bytes.sync_all().await?;
            repaired = true;
        }
    }
    Ok(repaired)
}
