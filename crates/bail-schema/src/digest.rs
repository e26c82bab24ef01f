//! Content digests
//!
//! Provides [`ContentDigest`], a 32-byte Blake3 digest used to fingerprint
//! schema declarations and rendered documents.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content digest (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute Blake3 digest of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| DigestError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DigestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.to_string()
    }
}

/// Errors parsing a digest
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Wrong byte length
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Malformed hex
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(ContentDigest::compute(b"bail"), ContentDigest::compute(b"bail"));
        assert_ne!(ContentDigest::compute(b"bail"), ContentDigest::compute(b"bail2"));
    }

    #[test]
    fn digest_hex_roundtrip() {
        let d = ContentDigest::compute(b"loyer");
        let hex = d.to_string();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex.parse::<ContentDigest>().unwrap(), d);
        assert_eq!(d.short(), &hex[..16]);
    }

    #[test]
    fn digest_rejects_bad_length() {
        assert!(matches!(
            "abcd".parse::<ContentDigest>(),
            Err(DigestError::InvalidLength { actual: 2, .. })
        ));
    }
}
