pub mod compress;
pub mod config;
pub mod storage;

pub use compress::{Compressed, CompressError, Compressor, CompressorRegistry, ContentKind};
pub use config::{CompressorConfig, StorageBackend, StorageConfig};
pub use storage::{BlobId, BlobInfo, BlobStore, StorageError};
