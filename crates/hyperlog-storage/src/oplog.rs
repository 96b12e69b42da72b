//! Operation log of signed commits
//!
//! Every successful append ends by writing one commit record. The last
//! intact record is the authoritative state of the log: everything in
//! `data` and `index` beyond what it names was never acknowledged.

use hyperlog_core::{PartialKeypair, SIGNATURE_LENGTH, Signature};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::TreeHash;
use crate::error::{LogError, LogResult};
use crate::frame::{self, FrameRead};

const COMMIT_DOMAIN: &[u8] = b"hyperlog/commit/v1";

/// Largest postcard encoding of a [`CommitRecord`]: two u64 varints, the
/// chain hash, and a length-prefixed signature
const MAX_COMMIT_PAYLOAD: usize = 10 + 10 + 32 + 1 + SIGNATURE_LENGTH;

/// Largest framed commit record
const MAX_COMMIT_FRAME: usize = frame::framed_len(MAX_COMMIT_PAYLOAD);

/// Log totals made durable by one append
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Number of entries after the append
    pub length: u64,
    /// Total entry bytes after the append
    pub byte_length: u64,
    /// Hash chain over all entries after the append
    pub tree_hash: TreeHash,
    /// ed25519 signature over the fields above
    pub signature: Vec<u8>,
}

impl CommitRecord {
    /// Sign a commit with the namespace secret key
    pub fn sign(
        key_pair: &PartialKeypair,
        length: u64,
        byte_length: u64,
        tree_hash: TreeHash,
    ) -> LogResult<Self> {
        let signature = key_pair.sign(&signable(length, byte_length, &tree_hash))?;
        Ok(Self {
            length,
            byte_length,
            tree_hash,
            signature: signature.to_bytes().to_vec(),
        })
    }

    /// Check the signature against the namespace public key
    pub fn verify(&self, key_pair: &PartialKeypair) -> LogResult<()> {
        let bytes: [u8; SIGNATURE_LENGTH] =
            self.signature.as_slice().try_into().map_err(|_| {
                LogError::corrupt(format!(
                    "commit at length {} has a {}-byte signature",
                    self.length,
                    self.signature.len()
                ))
            })?;
        key_pair
            .verify(
                &signable(self.length, self.byte_length, &self.tree_hash),
                &Signature::from_bytes(&bytes),
            )
            .map_err(|_| {
                LogError::corrupt(format!(
                    "commit at length {} is not signed by the namespace key",
                    self.length
                ))
            })
    }

    /// Framed bytes ready to append to the oplog
    pub fn to_frame(&self) -> LogResult<Vec<u8>> {
        frame::encode(self)
    }
}

fn signable(length: u64, byte_length: u64, tree_hash: &TreeHash) -> Vec<u8> {
    let mut buf = Vec::with_capacity(COMMIT_DOMAIN.len() + 16 + 32);
    buf.extend_from_slice(COMMIT_DOMAIN);
    buf.extend_from_slice(&length.to_be_bytes());
    buf.extend_from_slice(&byte_length.to_be_bytes());
    buf.extend_from_slice(tree_hash.as_bytes());
    buf
}

/// Result of scanning an oplog
#[derive(Debug, Default)]
pub(crate) struct OplogScan {
    /// Last intact commit, if any
    pub last: Option<CommitRecord>,
    /// Number of intact commits
    pub commits: usize,
    /// Byte length of the intact prefix
    pub valid_length: u64,
}

/// Walk every commit in `buf`
///
/// A damaged record is an interrupted append only when it is the last one:
/// the bytes left are fewer than one full commit frame. Any other damage, or
/// a commit that shrinks the log, is corruption.
pub(crate) fn scan(buf: &[u8]) -> LogResult<OplogScan> {
    let mut result = OplogScan::default();
    let mut offset = 0usize;

    while offset < buf.len() {
        let rest = &buf[offset..];
        let torn_tail = rest.len() < MAX_COMMIT_FRAME;
        match frame::read(rest, MAX_COMMIT_PAYLOAD) {
            FrameRead::Complete { payload, consumed } => {
                let record: CommitRecord = frame::decode(payload, "commit record")?;
                if let Some(prev) = &result.last
                    && (record.length < prev.length || record.byte_length < prev.byte_length)
                {
                    return Err(LogError::corrupt(format!(
                        "commit at offset {offset} shrinks log from {}/{} to {}/{}",
                        prev.length, prev.byte_length, record.length, record.byte_length
                    )));
                }
                result.last = Some(record);
                result.commits += 1;
                offset += consumed;
            }
            FrameRead::Incomplete if torn_tail => {
                warn!(offset, trailing = rest.len(), "Truncated commit record, stopping scan");
                break;
            }
            FrameRead::ChecksumMismatch { consumed } if consumed == rest.len() => {
                warn!(offset, "Torn commit record at end of oplog, stopping scan");
                break;
            }
            FrameRead::BadLength(len) if torn_tail => {
                warn!(offset, len, "Invalid commit record length at tail, stopping scan");
                break;
            }
            FrameRead::Incomplete => {
                return Err(LogError::corrupt(format!(
                    "commit record at offset {offset} runs past {} trailing bytes",
                    rest.len()
                )));
            }
            FrameRead::ChecksumMismatch { .. } => {
                return Err(LogError::corrupt(format!(
                    "commit record at offset {offset} fails its checksum"
                )));
            }
            FrameRead::BadLength(len) => {
                return Err(LogError::corrupt(format!(
                    "invalid commit record length {len} at offset {offset}"
                )));
            }
        }
    }

    result.valid_length = offset as u64;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperlog_core::SigningKey;

    fn key_pair() -> PartialKeypair {
        PartialKeypair::from_signing_key(SigningKey::from_bytes(&[3u8; 32]))
    }

    fn commit(length: u64, byte_length: u64) -> Vec<u8> {
        CommitRecord::sign(&key_pair(), length, byte_length, TreeHash::genesis())
            .unwrap()
            .to_frame()
            .unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = key_pair();
        let record = CommitRecord::sign(&kp, 2, 10, TreeHash::genesis()).unwrap();
        record.verify(&kp).unwrap();

        let other = PartialKeypair::from_signing_key(SigningKey::from_bytes(&[4u8; 32]));
        assert!(matches!(
            record.verify(&other),
            Err(LogError::CorruptStorage(_))
        ));
    }

    #[test]
    fn test_read_only_cannot_sign() {
        let kp = key_pair().to_read_only();
        let err = CommitRecord::sign(&kp, 1, 1, TreeHash::genesis()).unwrap_err();
        assert!(matches!(err, LogError::ReadOnly));
    }

    #[test]
    fn test_scan_returns_last_commit() {
        let mut buf = commit(2, 10);
        buf.extend(commit(3, 15));

        let scan = scan(&buf).unwrap();
        assert_eq!(scan.commits, 2);
        assert_eq!(scan.valid_length, buf.len() as u64);
        let last = scan.last.unwrap();
        assert_eq!((last.length, last.byte_length), (3, 15));
    }

    #[test]
    fn test_scan_skips_torn_tail() {
        let first = commit(2, 10);
        let mut buf = first.clone();
        let second = commit(5, 26);
        buf.extend_from_slice(&second[..second.len() / 2]);

        let scan = scan(&buf).unwrap();
        assert_eq!(scan.commits, 1);
        assert_eq!(scan.valid_length, first.len() as u64);
        assert_eq!(scan.last.unwrap().length, 2);
    }

    #[test]
    fn test_scan_rejects_damage_before_tail() {
        let mut buf = commit(2, 10);
        buf[6] ^= 0xff;
        buf.extend(commit(3, 15));

        assert!(matches!(scan(&buf), Err(LogError::CorruptStorage(_))));
    }

    #[test]
    fn test_scan_rejects_bad_length_before_tail() {
        let mut buf = commit(2, 10);
        buf.extend(commit(3, 15));
        buf.extend(commit(5, 26));
        buf[2] ^= 0x01;

        assert!(matches!(scan(&buf), Err(LogError::CorruptStorage(_))));
    }

    #[test]
    fn test_scan_rejects_overlong_record_before_tail() {
        let mut buf = commit(2, 10);
        buf.extend(commit(3, 15));
        // Still within the commit bound, but runs into the next record
        buf[3] += 4;

        assert!(matches!(scan(&buf), Err(LogError::CorruptStorage(_))));
    }

    #[test]
    fn test_commit_frame_bound() {
        let record = CommitRecord::sign(&key_pair(), u64::MAX, u64::MAX, TreeHash::genesis())
            .unwrap()
            .to_frame()
            .unwrap();
        assert_eq!(record.len(), MAX_COMMIT_FRAME);
        assert!(commit(2, 10).len() < MAX_COMMIT_FRAME);
    }

    #[test]
    fn test_scan_rejects_shrinking_commit() {
        let mut buf = commit(3, 15);
        buf.extend(commit(2, 10));

        assert!(matches!(scan(&buf), Err(LogError::CorruptStorage(_))));
    }

    #[test]
    fn test_scan_empty() {
        let scan = scan(&[]).unwrap();
        assert!(scan.last.is_none());
        assert_eq!(scan.valid_length, 0);
    }
}
