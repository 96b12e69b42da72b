//! # Hyperlog Core
//!
//! Identity types, shared results and errors for Hyperlog.
//!
//! ## Key Types
//!
//! - [`PartialKeypair`]: the ed25519 key pair owning a log; the secret half
//!   is optional for read-only access
//! - [`AppendOutcome`]: log totals returned by an append
//! - [`Info`]: observable state of an open log
//!
//! ## Example
//!
//! ```rust
//! use hyperlog_core::{PartialKeypair, SigningKey};
//!
//! let kp = PartialKeypair::from_signing_key(SigningKey::from_bytes(&[1u8; 32]));
//! let dir = kp.namespace_in("/var/lib/hyperlog");
//! assert!(dir.starts_with("/var/lib/hyperlog"));
//! ```

pub mod error;
pub mod identity;
pub mod info;

pub use error::{IdentityError, IdentityResult};
pub use identity::{
    KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, PartialKeypair, SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
    namespace_dir, public_key_from_bytes, signing_key_from_bytes,
};
pub use info::{AppendOutcome, Info};

pub use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
