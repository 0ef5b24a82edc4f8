//! Decoding, resizing and re-encoding of uploaded images.
//!
//! # Design Decisions
//!
//! - **Canonical storage format**: every stored image is JPEG. Uploads in any
//!   decodable format are re-encoded on ingestion, so a fetched payload is
//!   always `image/jpeg` regardless of what was uploaded.
//!
//! - **Bounding-box resize**: requested width/height form a bounding box. The
//!   image is scaled to fit within the box preserving aspect ratio, and is
//!   never upscaled beyond its source dimensions. A missing bound defaults to
//!   the source dimension, i.e. no constraint on that axis.
//!
//! - **Quality control**: JPEG quality is configurable per request and passed
//!   through to the encoder; omitted means the encoder default.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

use crate::error::ImageError;

/// The single format all stored images are normalized to.
pub const CANONICAL_FORMAT: ImageFormat = ImageFormat::Jpeg;

/// Default JPEG quality when the caller does not specify one.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Compression Parameters
// =============================================================================

/// Per-request transcoding parameters, carried in the `CompressionParameters`
/// request header as a JSON object.
///
/// All fields are optional; an absent field means "use the source value":
/// no resizing on that axis, encoder-default quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionParams {
    /// JPEG quality (1-100)
    #[serde(default)]
    pub quality: Option<u8>,

    /// Bounding-box width in pixels
    #[serde(default)]
    pub width: Option<u32>,

    /// Bounding-box height in pixels
    #[serde(default)]
    pub height: Option<u32>,
}

// =============================================================================
// Decoded Image
// =============================================================================

/// An image decoded from an uploaded payload, together with its detected
/// source format.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: DynamicImage,
    format: ImageFormat,
}

/// Decode an uploaded payload, sniffing the format from its magic bytes.
///
/// # Errors
///
/// Returns [`ImageError::Decode`] if the format cannot be recognized or the
/// pixel data is malformed. Nothing downstream (resize/encode) runs on an
/// undecodable payload.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode {
            message: e.to_string(),
        })?;

    let format = reader.format().ok_or_else(|| ImageError::Decode {
        message: "unrecognized image format".to_string(),
    })?;

    let image = reader.decode().map_err(|e| ImageError::Decode {
        message: e.to_string(),
    })?;

    Ok(DecodedImage { image, format })
}

impl DecodedImage {
    /// The format the payload was decoded from.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Current `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Scale the image to fit within the given bounding box, preserving
    /// aspect ratio. A missing bound defaults to the source dimension.
    /// The image is never enlarged: bounds larger than the source are a
    /// no-op on that axis.
    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) {
        let (src_w, src_h) = self.dimensions();

        let max_w = width.unwrap_or(src_w).min(src_w);
        let max_h = height.unwrap_or(src_h).min(src_h);

        if max_w < src_w || max_h < src_h {
            self.image = self.image.thumbnail(max_w, max_h);
        }
    }

    /// Encode the image to `format` (defaulting to the decoded source
    /// format). `quality` applies to JPEG output only; omitted means the
    /// encoder default. Deterministic for identical inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Encode`] if the encoder rejects the image.
    pub fn encode(
        &self,
        format: Option<ImageFormat>,
        quality: Option<u8>,
    ) -> Result<Vec<u8>, ImageError> {
        let format = format.unwrap_or(self.format);
        let mut output = Vec::new();

        match format {
            ImageFormat::Jpeg => {
                let quality = clamp_quality(quality.unwrap_or(DEFAULT_JPEG_QUALITY));
                let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
                encoder
                    .encode_image(&self.image)
                    .map_err(|e| ImageError::Encode {
                        message: e.to_string(),
                    })?;
            }
            other => {
                self.image
                    .write_to(&mut Cursor::new(&mut output), other)
                    .map_err(|e| ImageError::Encode {
                        message: e.to_string(),
                    })?;
            }
        }

        Ok(output)
    }
}

/// Run the full ingestion pipeline on an uploaded payload: decode, resize to
/// the requested bounds, and re-encode to the canonical storage format.
///
/// The canonical-format rule is unconditional: even a JPEG upload is
/// re-encoded, so the caller-supplied quality always takes effect and stored
/// bytes are uniformly JPEG.
pub fn process_upload(bytes: &[u8], params: &CompressionParams) -> Result<Vec<u8>, ImageError> {
    let mut decoded = decode(bytes)?;
    decoded.resize(params.width, params.height);
    decoded.encode(Some(CANONICAL_FORMAT), params.quality)
}

/// Clamp quality to the valid JPEG range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
