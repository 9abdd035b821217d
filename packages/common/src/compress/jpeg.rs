use async_trait::async_trait;
use image::ImageResult;
use image::codecs::jpeg::JpegEncoder;
use tracing::instrument;

use super::error::CompressError;
use super::Compressor;

const STRATEGY: &str = "Image";

/// Lossy re-encode of any decodable image to baseline JPEG.
#[derive(Debug, Clone, Copy)]
pub struct JpegCompressor {
    quality: u8,
}

impl JpegCompressor {
    /// `quality` is clamped to the encoder's 1..=100 range.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

fn reencode(input: &[u8], quality: u8) -> ImageResult<Vec<u8>> {
    let decoded = image::load_from_memory(input)?;
    // JPEG has no alpha channel.
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(out)
}

#[async_trait]
impl Compressor for JpegCompressor {
    fn name(&self) -> &'static str {
        STRATEGY
    }

    fn output_type(&self, _input_type: &str) -> String {
        "image/jpeg".to_string()
    }

    #[instrument(skip(self, input), fields(input_bytes = input.len(), quality = self.quality))]
    async fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CompressError> {
        let owned = input.to_vec();
        let quality = self.quality;
        tokio::task::spawn_blocking(move || reencode(&owned, quality))
            .await
            .map_err(|e| CompressError::failed(STRATEGY, format!("encoder task failed: {e}")))?
            .map_err(|e| CompressError::failed(STRATEGY, format!("Image compression failed: {e}")))
    }
}
