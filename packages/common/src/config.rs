use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::compress::default_ghostscript_bin;
use crate::storage::{BlobStore, FilesystemBlobStore, MemoryBlobStore, StorageError};

/// Compression strategy settings.
#[derive(Debug, Deserialize, Clone)]
pub struct CompressorConfig {
    /// Ghostscript executable. Default: "gs" (the gswin64c.exe install path on Windows).
    #[serde(default = "default_ghostscript_bin")]
    pub ghostscript_bin: String,
    /// Value passed as `-dPDFSETTINGS`. Default: "/ebook".
    #[serde(default = "default_pdf_settings")]
    pub pdf_settings: String,
    /// Wall-clock limit for one Ghostscript run, in seconds. Default: 120.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// JPEG quality for re-encoded images (1-100). Default: 60.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_pdf_settings() -> String {
    "/ebook".into()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_jpeg_quality() -> u8 {
    60
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            ghostscript_bin: default_ghostscript_bin(),
            pdf_settings: default_pdf_settings(),
            timeout_secs: default_timeout_secs(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
}

/// Blob storage settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Which blob store to use. Default: "filesystem".
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory of the filesystem store. Default: "./data/blobs".
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Largest blob the store accepts, in bytes. Default: 64 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/blobs")
}
fn default_max_blob_size() -> u64 {
    64 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            max_blob_size: default_max_blob_size(),
        }
    }
}

impl StorageConfig {
    /// Open the configured blob store.
    pub async fn open(&self) -> Result<Arc<dyn BlobStore>, StorageError> {
        let store: Arc<dyn BlobStore> = match self.backend {
            StorageBackend::Filesystem => {
                Arc::new(FilesystemBlobStore::new(self.path.clone(), self.max_blob_size).await?)
            }
            StorageBackend::Memory => Arc::new(MemoryBlobStore::with_max_size(self.max_blob_size)),
        };
        Ok(store)
    }
}
