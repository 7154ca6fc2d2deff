//! Image decoding with format detection, validation, and timeout support.
//!
//! Fetched bytes are decoded to make sure they really are an image, then
//! re-encoded as RGB PNG, the input form the classifier expects.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::{GatewayError, Stage};

/// Image decoder with configurable limits and timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// An image normalized for the classifier.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// RGB PNG bytes
    pub data: Vec<u8>,
    /// MIME type of `data`
    pub media_type: &'static str,
    /// Format the client's bytes were actually in
    pub source_format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode and normalize fetched bytes, off the async scheduler and under
    /// the configured decode timeout.
    pub async fn prepare(&self, bytes: Vec<u8>, url: &str) -> Result<PreparedImage, GatewayError> {
        let url_owned = url.to_string();
        let max_dim = self.limits.max_image_dimension;
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::prepare_sync(bytes, &url_owned, max_dim)).await
        })
        .await;

        match decode_result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(GatewayError::Internal(format!(
                "decode task for {url} failed: {e}"
            ))),
            Err(_) => Err(GatewayError::Timeout {
                stage: Stage::Decode,
                item: url.to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode + re-encode (runs in spawn_blocking).
    fn prepare_sync(bytes: Vec<u8>, url: &str, max_dim: u32) -> Result<PreparedImage, GatewayError> {
        let decode_err = |message: String| GatewayError::ImageDecode {
            url: url.to_string(),
            message,
        };

        // Header-only pass so oversized images are refused before any pixel allocation
        let (width, height) = image::ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| decode_err(format!("Cannot detect image format: {e}")))?
            .into_dimensions()
            .map_err(|e| decode_err(e.to_string()))?;
        if width > max_dim || height > max_dim {
            return Err(decode_err(format!(
                "Image too large ({width}x{height} > {max_dim})"
            )));
        }

        let reader = image::ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| decode_err(format!("Cannot detect image format: {e}")))?;
        let source_format = reader
            .format()
            .ok_or_else(|| decode_err("Unrecognized image format".to_string()))?;
        let image = reader.decode().map_err(|e| decode_err(e.to_string()))?;

        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut data = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .map_err(|e| decode_err(format!("Re-encode failed: {e}")))?;

        Ok(PreparedImage {
            data,
            media_type: "image/png",
            source_format,
            width,
            height,
        })
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}
