//! Entry hash chain
//!
//! Commits name the whole log content through a running blake3 hash:
//! `h(0) = blake3(seed)` and `h(i+1) = blake3(h(i) || len_i as u64 BE || entry_i)`.

use std::fmt;

use serde::{Deserialize, Serialize};

const CHAIN_SEED: &[u8] = b"hyperlog/chain/v1";

/// Running hash over every entry of a log, in index order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeHash(pub [u8; 32]);

impl TreeHash {
    /// Hash of the empty log
    pub fn genesis() -> Self {
        Self(*blake3::hash(CHAIN_SEED).as_bytes())
    }

    /// Hash after appending `entry`
    pub fn extend(&self, entry: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.0);
        hasher.update(&(entry.len() as u64).to_be_bytes());
        hasher.update(entry);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for TreeHash {
    fn default() -> Self {
        Self::genesis()
    }
}

impl fmt::Debug for TreeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeHash({})", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_depends_on_order() {
        let ab = TreeHash::genesis().extend(b"a").extend(b"b");
        let ba = TreeHash::genesis().extend(b"b").extend(b"a");
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_chain_separates_entry_boundaries() {
        // "ab" as one entry must not collide with "a" + "b"
        let joined = TreeHash::genesis().extend(b"ab");
        let split = TreeHash::genesis().extend(b"a").extend(b"b");
        assert_ne!(joined, split);
    }

    #[test]
    fn test_chain_is_deterministic() {
        let first = TreeHash::genesis().extend(b"Hello").extend(b"World");
        let second = TreeHash::default().extend(b"Hello").extend(b"World");
        assert_eq!(first, second);
    }
}
