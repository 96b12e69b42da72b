//! Checksummed record framing
//!
//! Header and oplog records share one layout:
//!
//! ```text
//! [4 bytes: BE payload len][len bytes: postcard payload][32 bytes: blake3(payload)]
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{LogError, LogResult};

const LEN_SIZE: usize = 4;
const CHECKSUM_SIZE: usize = 32;

/// Largest payload a frame may carry
pub(crate) const MAX_PAYLOAD: usize = 64 * 1024;

/// Size of a frame carrying `payload_len` bytes
pub(crate) const fn framed_len(payload_len: usize) -> usize {
    LEN_SIZE + payload_len + CHECKSUM_SIZE
}

/// Outcome of reading one frame from the front of a buffer
#[derive(Debug)]
pub(crate) enum FrameRead<'a> {
    /// A complete frame whose checksum matches
    Complete { payload: &'a [u8], consumed: usize },
    /// The buffer ends before the frame does
    Incomplete,
    /// The frame is complete but its checksum does not match
    ChecksumMismatch { consumed: usize },
    /// The length prefix is not plausible
    BadLength(usize),
}

/// Serialize `value` and wrap it in a frame
pub(crate) fn encode<T: Serialize>(value: &T) -> LogResult<Vec<u8>> {
    let payload = postcard::to_allocvec(value)
        .map_err(|e| LogError::Io(format!("failed to serialize record: {e}")))?;
    if payload.len() > MAX_PAYLOAD {
        return Err(LogError::Io(format!(
            "record of {} bytes exceeds frame limit",
            payload.len()
        )));
    }

    let mut buf = Vec::with_capacity(LEN_SIZE + payload.len() + CHECKSUM_SIZE);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(blake3::hash(&payload).as_bytes());
    Ok(buf)
}

/// Read the frame at the start of `buf`
///
/// A length prefix above `max_payload` is reported as [`FrameRead::BadLength`].
pub(crate) fn read(buf: &[u8], max_payload: usize) -> FrameRead<'_> {
    let Some(len_bytes) = buf.get(..LEN_SIZE) else {
        return FrameRead::Incomplete;
    };
    let mut len = [0u8; LEN_SIZE];
    len.copy_from_slice(len_bytes);
    let len = u32::from_be_bytes(len) as usize;

    if len == 0 || len > max_payload {
        return FrameRead::BadLength(len);
    }

    let end = framed_len(len);
    if buf.len() < end {
        return FrameRead::Incomplete;
    }

    let payload = &buf[LEN_SIZE..LEN_SIZE + len];
    let checksum = &buf[LEN_SIZE + len..end];
    if blake3::hash(payload).as_bytes() != checksum {
        return FrameRead::ChecksumMismatch { consumed: end };
    }

    FrameRead::Complete {
        payload,
        consumed: end,
    }
}

/// Decode a payload whose checksum already matched
pub(crate) fn decode<T: DeserializeOwned>(payload: &[u8], what: &str) -> LogResult<T> {
    postcard::from_bytes(payload).map_err(|e| LogError::corrupt(format!("undecodable {what}: {e}")))
}
