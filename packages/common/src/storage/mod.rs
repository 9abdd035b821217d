mod error;
mod hash;
mod id;
mod traits;

pub mod filesystem;
pub mod memory;

pub use error::StorageError;
pub use filesystem::FilesystemBlobStore;
pub use hash::ContentHash;
pub use id::BlobId;
pub use memory::MemoryBlobStore;
pub use traits::{BlobInfo, BlobStore};
