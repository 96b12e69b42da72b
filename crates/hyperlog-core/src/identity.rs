//! Log identity keys
//!
//! Every log is owned by one ed25519 key pair. The public half names the
//! namespace the log lives in and verifies its commits. The secret half,
//! when present, is what makes a log writable.

use std::fmt;
use std::path::{Path, PathBuf};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

pub use ed25519_dalek::{KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH};

use crate::error::{IdentityError, IdentityResult};

/// Key pair where the secret key can be missing for read-only logs
#[derive(Clone)]
pub struct PartialKeypair {
    /// Public key
    pub public: VerifyingKey,
    /// Secret key. If None, the log is read-only.
    pub secret: Option<SigningKey>,
}

impl PartialKeypair {
    /// Build a writable key pair from a signing key
    pub fn from_signing_key(secret: SigningKey) -> Self {
        Self {
            public: secret.verifying_key(),
            secret: Some(secret),
        }
    }

    /// Build a read-only key pair from a public key
    pub fn from_public(public: VerifyingKey) -> Self {
        Self {
            public,
            secret: None,
        }
    }

    /// Parse a key pair from raw bytes
    ///
    /// The public key must be 32 bytes. The secret key may be the 32-byte
    /// seed or the 64-byte `seed || public` form; either way it must belong
    /// to the given public key.
    pub fn from_bytes(public: &[u8], secret: Option<&[u8]>) -> IdentityResult<Self> {
        let public = public_key_from_bytes(public)?;
        let secret = match secret {
            None => None,
            Some(bytes) => Some(signing_key_from_bytes(bytes)?),
        };

        if let Some(secret) = &secret
            && secret.verifying_key() != public
        {
            return Err(IdentityError::KeyMismatch {
                public: hex::encode(public.as_bytes()),
            });
        }

        Ok(Self { public, secret })
    }

    /// Raw public key bytes
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Whether the secret key is present
    pub fn is_writable(&self) -> bool {
        self.secret.is_some()
    }

    /// Drop the secret key, keeping only the public half
    pub fn to_read_only(&self) -> Self {
        Self::from_public(self.public)
    }

    /// Short hex form of the public key (for logging)
    pub fn short_id(&self) -> String {
        hex::encode(&self.public.as_bytes()[..4])
    }

    /// Directory for this key's namespace under `root`
    pub fn namespace_in(&self, root: impl AsRef<Path>) -> PathBuf {
        namespace_dir(root, &self.public)
    }

    /// Sign a message with the secret key
    pub fn sign(&self, message: &[u8]) -> IdentityResult<Signature> {
        let secret = self
            .secret
            .as_ref()
            .ok_or(IdentityError::MissingSecretKey)?;
        Ok(secret.sign(message))
    }

    /// Verify a signature made by this key pair
    pub fn verify(&self, message: &[u8], signature: &Signature) -> IdentityResult<()> {
        self.public
            .verify(message, signature)
            .map_err(|_| IdentityError::SignatureVerificationFailed)
    }
}

impl fmt::Debug for PartialKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialKeypair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolve the namespace directory for a public key
///
/// The same key always maps to `root/<hex(public key)>`.
pub fn namespace_dir(root: impl AsRef<Path>, public: &VerifyingKey) -> PathBuf {
    root.as_ref().join(hex::encode(public.as_bytes()))
}

/// Parse a 32-byte ed25519 public key
pub fn public_key_from_bytes(bytes: &[u8]) -> IdentityResult<VerifyingKey> {
    let bytes: &[u8; PUBLIC_KEY_LENGTH] =
        bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidKeyLength {
                expected: PUBLIC_KEY_LENGTH,
                actual: bytes.len(),
            })?;
    VerifyingKey::from_bytes(bytes).map_err(|e| IdentityError::InvalidKey(e.to_string()))
}

/// Parse a secret key given as a 32-byte seed or a 64-byte key pair
pub fn signing_key_from_bytes(bytes: &[u8]) -> IdentityResult<SigningKey> {
    match bytes.len() {
        SECRET_KEY_LENGTH => {
            let mut seed = [0u8; SECRET_KEY_LENGTH];
            seed.copy_from_slice(bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        KEYPAIR_LENGTH => {
            let mut pair = [0u8; KEYPAIR_LENGTH];
            pair.copy_from_slice(bytes);
            // Rejects a seed whose embedded public half does not match
            SigningKey::from_keypair_bytes(&pair).map_err(|_| IdentityError::KeyMismatch {
                public: hex::encode(&bytes[SECRET_KEY_LENGTH..]),
            })
        }
        actual => Err(IdentityError::InvalidKeyLength {
            expected: SECRET_KEY_LENGTH,
            actual,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; SECRET_KEY_LENGTH])
    }

    #[test]
    fn test_from_bytes_with_matching_seed() {
        let secret = signing_key(7);
        let public = secret.verifying_key();

        let kp = PartialKeypair::from_bytes(public.as_bytes(), Some(&secret.to_bytes())).unwrap();
        assert!(kp.is_writable());
        assert_eq!(kp.public_bytes(), public.to_bytes());
    }

    #[test]
    fn test_from_bytes_with_keypair_form() {
        let secret = signing_key(9);
        let public = secret.verifying_key();

        let kp =
            PartialKeypair::from_bytes(public.as_bytes(), Some(&secret.to_keypair_bytes())).unwrap();
        assert!(kp.is_writable());
    }

    #[test]
    fn test_from_bytes_rejects_foreign_secret() {
        let public = signing_key(1).verifying_key();
        let other = signing_key(2);

        let err = PartialKeypair::from_bytes(public.as_bytes(), Some(&other.to_bytes())).unwrap_err();
        assert!(matches!(err, IdentityError::KeyMismatch { .. }));
    }

    #[test]
    fn test_from_bytes_rejects_tampered_keypair_bytes() {
        let secret = signing_key(3);
        let mut pair = secret.to_keypair_bytes();
        pair[SECRET_KEY_LENGTH..].copy_from_slice(signing_key(4).verifying_key().as_bytes());

        let err = signing_key_from_bytes(&pair).unwrap_err();
        assert!(matches!(err, IdentityError::KeyMismatch { .. }));
    }

    #[test]
    fn test_from_bytes_rejects_bad_lengths() {
        let err = PartialKeypair::from_bytes(&[0u8; 16], None).unwrap_err();
        assert!(matches!(
            err,
            IdentityError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        ));

        let public = signing_key(5).verifying_key();
        let err = PartialKeypair::from_bytes(public.as_bytes(), Some(&[0u8; 40])).unwrap_err();
        assert!(matches!(err, IdentityError::InvalidKeyLength { actual: 40, .. }));
    }

    #[test]
    fn test_read_only_cannot_sign() {
        let kp = PartialKeypair::from_signing_key(signing_key(6)).to_read_only();
        assert!(!kp.is_writable());
        assert!(matches!(
            kp.sign(b"message"),
            Err(IdentityError::MissingSecretKey)
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = PartialKeypair::from_signing_key(signing_key(8));
        let signature = kp.sign(b"commit").unwrap();

        kp.verify(b"commit", &signature).unwrap();
        assert!(kp.verify(b"other", &signature).is_err());
    }

    #[test]
    fn test_namespace_is_deterministic() {
        let kp = PartialKeypair::from_signing_key(signing_key(10));
        let root = tempfile::tempdir().unwrap();

        let first = kp.namespace_in(root.path());
        let second = kp.to_read_only().namespace_in(root.path());
        assert_eq!(first, second);
        assert!(first.ends_with(hex::encode(kp.public_bytes())));

        let other = PartialKeypair::from_signing_key(signing_key(11));
        assert_ne!(first, other.namespace_in(root.path()));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let kp = PartialKeypair::from_signing_key(signing_key(12));
        let debug = format!("{:?}", kp);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&hex::encode([12u8; 32])));
    }
}
