//! Image pipeline: decode, resize, re-encode.
//!
//! Uploaded payloads pass through this module exactly once, on ingestion:
//!
//! ```text
//! raw bytes ──▶ decode ──▶ resize (bounding box) ──▶ encode (canonical JPEG)
//! ```
//!
//! Stored images are always in the canonical format, so retrieval is a plain
//! byte passthrough with no decoding.

mod pipeline;

pub use pipeline::{
    clamp_quality, decode, process_upload, CompressionParams, DecodedImage, CANONICAL_FORMAT,
    DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
