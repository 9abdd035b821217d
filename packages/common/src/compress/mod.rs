//! Content-type dispatched compression strategies.
//!
//! `application/pdf` goes through Ghostscript, anything under `image/` is
//! re-encoded as JPEG, everything else is rejected before any work is done.

mod error;
pub mod ghostscript;
pub mod jpeg;
pub mod process;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::CompressorConfig;

pub use error::CompressError;
pub use ghostscript::{GhostscriptCompressor, default_ghostscript_bin};
pub use jpeg::JpegCompressor;

/// A stateless buffer-in, buffer-out transform.
///
/// Implementations must not mutate the input and must be safe to call
/// concurrently from many requests.
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Content type of the produced bytes.
    fn output_type(&self, input_type: &str) -> String {
        input_type.to_string()
    }

    async fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CompressError>;
}

/// The families of content we know how to shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Image,
}

impl ContentKind {
    /// Classify a declared content type. Parameters and case are ignored.
    pub fn classify(content_type: &str) -> Option<Self> {
        let essence = essence(content_type);
        if essence == "application/pdf" {
            Some(Self::Pdf)
        } else if essence.starts_with("image/") && essence.len() > "image/".len() {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// `"Image/PNG; foo=bar"` -> `"image/png"`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub data: Vec<u8>,
    pub content_type: String,
    pub strategy: &'static str,
}

/// Routes a buffer to the strategy registered for its content type.
#[derive(Clone)]
pub struct CompressorRegistry {
    pdf: Arc<dyn Compressor>,
    image: Arc<dyn Compressor>,
}

impl CompressorRegistry {
    pub fn new(pdf: Arc<dyn Compressor>, image: Arc<dyn Compressor>) -> Self {
        Self { pdf, image }
    }

    pub fn from_config(config: &CompressorConfig) -> Self {
        Self::new(
            Arc::new(GhostscriptCompressor::new(
                &config.ghostscript_bin,
                &config.pdf_settings,
                Duration::from_secs(config.timeout_secs),
            )),
            Arc::new(JpegCompressor::new(config.jpeg_quality)),
        )
    }

    pub fn select(&self, content_type: &str) -> Result<&dyn Compressor, CompressError> {
        match ContentKind::classify(content_type) {
            Some(ContentKind::Pdf) => Ok(self.pdf.as_ref()),
            Some(ContentKind::Image) => Ok(self.image.as_ref()),
            None => Err(CompressError::UnsupportedType(content_type.to_string())),
        }
    }

    pub async fn compress(
        &self,
        input: &[u8],
        content_type: &str,
    ) -> Result<Compressed, CompressError> {
        let compressor = self.select(content_type)?;
        let data = compressor.compress(input).await?;
        if data.is_empty() {
            return Err(CompressError::failed(
                compressor.name(),
                "compressor produced no output",
            ));
        }
        Ok(Compressed {
            data,
            content_type: compressor.output_type(&essence(content_type)),
            strategy: compressor.name(),
        })
    }
}
