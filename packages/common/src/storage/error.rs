use std::fmt;

/// Errors that can occur during blob storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested blob was not found.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The provided blob id is not a valid identifier.
    InvalidId(String),
    /// A stored checksum could not be parsed.
    InvalidChecksum(String),
    /// The blob exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// The stored bytes no longer match the checksum recorded at write time.
    Corrupted {
        id: String,
        expected: String,
        actual: String,
    },
    /// The blob info sidecar could not be encoded or decoded.
    Sidecar(serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "blob not found: {id}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidId(msg) => write!(f, "invalid blob id: {msg}"),
            Self::InvalidChecksum(msg) => write!(f, "invalid checksum: {msg}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "blob exceeds size limit ({actual} > {limit} bytes)")
            }
            Self::Corrupted {
                id,
                expected,
                actual,
            } => write!(
                f,
                "blob {id} is corrupted (expected sha256 {expected}, got {actual})"
            ),
            Self::Sidecar(err) => write!(f, "blob info sidecar error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sidecar(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Sidecar(err)
    }
}
