use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::StorageError;

/// SHA-256 checksum of a stored blob, used to detect on-disk corruption.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Parse a hex-encoded checksum string.
    pub fn from_hex(s: &str) -> Result<Self, StorageError> {
        if s.len() != 64 {
            return Err(StorageError::InvalidChecksum(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }

        let bytes = hex::decode(s)
            .map_err(|e| StorageError::InvalidChecksum(format!("invalid hex: {e}")))?;

        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StorageError::InvalidChecksum("decoded to wrong length".into()))?;

        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
