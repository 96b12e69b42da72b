//! Identity binding
//!
//! The first session to open an empty namespace records its public key in
//! the `header` store. Every later session must present the same key.

use hyperlog_core::{PUBLIC_KEY_LENGTH, PartialKeypair};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{LogError, LogResult};
use crate::frame::{self, FrameRead};
use crate::storage::{Storage, Store};

const HEADER_MAGIC: &[u8; 4] = b"HLOG";

/// On-disk format version
pub const FORMAT_VERSION: u8 = 1;

/// Identity a namespace is permanently bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceHeader {
    /// On-disk format version
    pub version: u8,
    /// Public key of the log owner
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
    /// When the namespace was first bound
    pub created_at_millis: i64,
}

impl NamespaceHeader {
    fn new(key_pair: &PartialKeypair) -> Self {
        Self {
            version: FORMAT_VERSION,
            public_key: key_pair.public_bytes(),
            created_at_millis: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn encode(&self) -> LogResult<Vec<u8>> {
        let mut buf = HEADER_MAGIC.to_vec();
        buf.extend(frame::encode(self)?);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> LogResult<Self> {
        let body = buf
            .strip_prefix(HEADER_MAGIC.as_slice())
            .ok_or_else(|| LogError::corrupt("namespace header has wrong magic"))?;

        let header: Self = match frame::read(body, frame::MAX_PAYLOAD) {
            FrameRead::Complete { payload, consumed } if consumed == body.len() => {
                frame::decode(payload, "namespace header")?
            }
            FrameRead::Complete { .. } => {
                return Err(LogError::corrupt("namespace header has trailing bytes"));
            }
            other => {
                return Err(LogError::corrupt(format!(
                    "namespace header is damaged: {other:?}"
                )));
            }
        };

        if header.version != FORMAT_VERSION {
            return Err(LogError::corrupt(format!(
                "unsupported namespace format version {}",
                header.version
            )));
        }
        Ok(header)
    }
}

/// A key pair validated against its namespace
#[derive(Debug, Clone)]
pub struct BoundIdentity {
    /// The key pair the namespace is bound to
    pub key_pair: PartialKeypair,
    /// The persisted header
    pub header: NamespaceHeader,
    /// Whether this bind recorded the identity for the first time
    pub created: bool,
}

/// Bind `key_pair` to the namespace in `storage`
///
/// Fails with [`LogError::IdentityMismatch`] if the namespace was bound to
/// another public key; storage is not touched in that case. A missing header
/// in front of existing entries or commits is [`LogError::CorruptStorage`].
#[instrument(skip_all, fields(key = %key_pair.short_id()))]
pub async fn bind(storage: &Storage, key_pair: PartialKeypair) -> LogResult<BoundIdentity> {
    let store = storage.store(Store::Header);
    let size = store.len().await?;

    if size == 0 {
        let sizes = storage.sizes().await?;
        if sizes.iter().any(|&len| len > 0) {
            return Err(LogError::corrupt(format!(
                "namespace header is missing but stores hold data (sizes {sizes:?})"
            )));
        }

        let header = NamespaceHeader::new(&key_pair);
        let bytes = header.encode()?;
        store
            .write(0, &bytes)
            .await
            .map_err(|e| LogError::durability(format!("failed to write namespace header: {e}")))?;
        store
            .sync_all()
            .await
            .map_err(|e| LogError::durability(format!("failed to sync namespace header: {e}")))?;

        info!("Bound empty namespace");
        return Ok(BoundIdentity {
            key_pair,
            header,
            created: true,
        });
    }

    let header = NamespaceHeader::decode(&store.read(0, size).await?)?;
    if header.public_key != key_pair.public_bytes() {
        return Err(LogError::identity_mismatch(format!(
            "namespace belongs to {}, not {}",
            hex::encode(header.public_key),
            hex::encode(key_pair.public_bytes())
        )));
    }

    debug!(created_at = header.created_at_millis, "Namespace identity matches");
    Ok(BoundIdentity {
        key_pair,
        header,
        created: false,
    })
}
