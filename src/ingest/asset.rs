//! Canonical image representation.
//!
//! Every input source — file select, drag-drop, camera snapshot — funnels
//! into one `ImageAsset`: a decoded RGB pixel buffer plus a display-ready
//! JPEG rendition. Assets are immutable; a new selection supersedes the
//! old one, it never mutates it.

use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use super::IngestError;
use crate::config;

/// Which of the three producers created the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    File,
    Drop,
    Snapshot,
}

/// A decoded, inference-ready candidate image.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    sequence: u64,
    source: ImageSource,
    pixels: RgbImage,
    display_jpeg: Vec<u8>,
}

impl ImageAsset {
    /// Build an asset from already-decoded pixels. Encodes the display
    /// rendition eagerly so consumers never touch the raw buffer.
    pub fn new(sequence: u64, source: ImageSource, pixels: RgbImage) -> Result<Self, IngestError> {
        let mut display_jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(
            Cursor::new(&mut display_jpeg),
            config::SNAPSHOT_JPEG_QUALITY,
        );
        encoder
            .encode_image(&pixels)
            .map_err(|e| IngestError::Encode(e.to_string()))?;

        Ok(Self {
            sequence,
            source,
            pixels,
            display_jpeg,
        })
    }

    /// Monotonically increasing sequence number assigned at ingest.
    /// Used by the orchestrator for last-write-wins result gating.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Decoded pixel buffer for model input.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Display-ready rendition as a data URL for the frontend preview.
    pub fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.display_jpeg);
        format!("data:image/jpeg;base64,{encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, image::Rgb([10, 120, 200]))
    }

    #[test]
    fn asset_keeps_native_dimensions() {
        let asset = ImageAsset::new(1, ImageSource::File, solid_image(64, 48)).unwrap();
        assert_eq!((asset.width(), asset.height()), (64, 48));
        assert_eq!(asset.sequence(), 1);
    }

    #[test]
    fn data_url_is_jpeg() {
        let asset = ImageAsset::new(1, ImageSource::Snapshot, solid_image(8, 8)).unwrap();
        assert!(asset.data_url().starts_with("data:image/jpeg;base64,"));
    }
}
