//! Cryptographic digest of raw file bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{ImprintError, Result};

/// Digest size in bytes (SHA3-256).
pub const CONTENT_DIGEST_SIZE: usize = 32;

/// SHA3-256 of the exact file bytes. Two assets match iff digests are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; CONTENT_DIGEST_SIZE]);

impl ContentDigest {
    /// Hash raw bytes.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        let result = hasher.finalize();

        let mut digest = [0u8; CONTENT_DIGEST_SIZE];
        digest.copy_from_slice(&result);
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_DIGEST_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ImprintError::InvalidFingerprint(format!("Invalid digest hex: {e}")))?;
        let digest: [u8; CONTENT_DIGEST_SIZE] = bytes.try_into().map_err(|_| {
            ImprintError::InvalidFingerprint("Digest must be 32 bytes".into())
        })?;
        Ok(Self(digest))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Digest raw bytes.
pub fn digest(data: &[u8]) -> ContentDigest {
    ContentDigest::of(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(digest(b"Hello World"), digest(b"Hello World"));
    }

    #[test]
    fn test_single_byte_change() {
        assert_ne!(digest(b"Hello World"), digest(b"Hello World!"));
    }

    #[test]
    fn test_known_empty_digest() {
        assert_eq!(
            digest(b"").to_hex(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_hex_roundtrip() {
        let d = digest(b"abc");
        assert_eq!(ContentDigest::from_hex(&d.to_hex()).unwrap(), d);
        assert!(ContentDigest::from_hex("abcd").is_err());
        assert!(ContentDigest::from_hex("zz").is_err());
    }
}
