//! Normalizes the three image sources into one canonical asset.
//!
//! File-select and drag-drop inputs arrive as raw bytes and are validated
//! by magic bytes (extensions can be wrong, magic bytes don't lie), then
//! decoded and EXIF-corrected. Camera snapshots arrive already decoded.
//! Every ingest stops any active capture session first so only one image
//! source is ever live, and replaces the current asset atomically from
//! the consumer's viewpoint.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, RgbImage};
use tracing::debug;

use super::{ImageAsset, ImageSource, IngestError};
use crate::capture::CaptureController;

pub struct IngestPipeline {
    current: Option<Arc<ImageAsset>>,
    next_sequence: u64,
}

impl IngestPipeline {
    pub fn new() -> Self {
        Self {
            current: None,
            next_sequence: 0,
        }
    }

    /// The asset most recently produced by any source, if one exists.
    pub fn current(&self) -> Option<Arc<ImageAsset>> {
        self.current.clone()
    }

    /// Sequence number of the most recent ingest.
    pub fn latest_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Ingest a file selected from storage.
    pub fn from_file(
        &mut self,
        capture: &mut CaptureController,
        bytes: &[u8],
    ) -> Result<Arc<ImageAsset>, IngestError> {
        self.ingest_bytes(capture, bytes, ImageSource::File)
    }

    /// Ingest a file delivered by drag-drop. Same validation as file select.
    pub fn from_drop(
        &mut self,
        capture: &mut CaptureController,
        bytes: &[u8],
    ) -> Result<Arc<ImageAsset>, IngestError> {
        self.ingest_bytes(capture, bytes, ImageSource::Drop)
    }

    /// Ingest a camera snapshot. The frame is already decoded; the capture
    /// session was released by the snapshot itself, but the stop is
    /// idempotent so the precondition is enforced here too.
    pub fn from_snapshot(
        &mut self,
        capture: &mut CaptureController,
        frame: RgbImage,
    ) -> Result<Arc<ImageAsset>, IngestError> {
        capture.stop_capture();
        self.install(ImageSource::Snapshot, frame)
    }

    /// Drop the current asset without replacement.
    pub fn reset(&mut self) {
        self.current = None;
    }

    fn ingest_bytes(
        &mut self,
        capture: &mut CaptureController,
        bytes: &[u8],
        source: ImageSource,
    ) -> Result<Arc<ImageAsset>, IngestError> {
        // Only one image source may be live at a time.
        capture.stop_capture();

        if !is_image_media(bytes) {
            return Err(IngestError::UnsupportedMedia);
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| IngestError::Decode(e.to_string()))?;
        let upright = apply_orientation(decoded, read_exif_orientation(bytes));

        self.install(source, upright.to_rgb8())
    }

    fn install(
        &mut self,
        source: ImageSource,
        pixels: RgbImage,
    ) -> Result<Arc<ImageAsset>, IngestError> {
        let sequence = self.next_sequence + 1;
        let asset = Arc::new(ImageAsset::new(sequence, source, pixels)?);
        self.next_sequence = sequence;
        // The prior asset is superseded, not mutated.
        self.current = Some(asset.clone());
        debug!(
            sequence,
            source = ?asset.source(),
            width = asset.width(),
            height = asset.height(),
            "image asset installed"
        );
        Ok(asset)
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Media-type validation from magic bytes. Accepts the image formats the
/// decoder can turn into pixel data; everything else is rejected before
/// the pipeline advances.
fn is_image_media(bytes: &[u8]) -> bool {
    match bytes {
        // JPEG
        [0xFF, 0xD8, 0xFF, ..] => true,
        // PNG
        [0x89, 0x50, 0x4E, 0x47, ..] => true,
        // GIF87a / GIF89a
        [b'G', b'I', b'F', b'8', ..] => true,
        // BMP
        [b'B', b'M', ..] => true,
        // TIFF, little- and big-endian
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => true,
        // WebP: RIFF container with WEBP fourcc
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => true,
        _ => false,
    }
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform so phone photos arrive upright.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, image::Rgb([0, 200, 0]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn non_image_input_is_rejected_and_changes_nothing() {
        let mut pipeline = IngestPipeline::new();
        let mut capture = CaptureController::new();

        let result = pipeline.from_file(&mut capture, b"%PDF-1.4 not an image");
        assert!(matches!(result, Err(IngestError::UnsupportedMedia)));
        assert!(pipeline.current().is_none());
        assert_eq!(pipeline.latest_sequence(), 0);
    }

    #[test]
    fn truncated_image_fails_decode_without_installing() {
        let mut pipeline = IngestPipeline::new();
        let mut capture = CaptureController::new();

        // Valid PNG magic, garbage body.
        let result = pipeline.from_file(&mut capture, &[0x89, 0x50, 0x4E, 0x47, 0, 1, 2, 3]);
        assert!(matches!(result, Err(IngestError::Decode(_))));
        assert!(pipeline.current().is_none());
    }

    #[test]
    fn file_ingest_supersedes_prior_asset() {
        let mut pipeline = IngestPipeline::new();
        let mut capture = CaptureController::new();

        let first = pipeline.from_file(&mut capture, &png_bytes(4, 4)).unwrap();
        let second = pipeline.from_drop(&mut capture, &png_bytes(6, 2)).unwrap();

        assert_eq!(first.sequence(), 1);
        assert_eq!(second.sequence(), 2);
        assert_eq!(second.source(), ImageSource::Drop);
        let current = pipeline.current().unwrap();
        assert_eq!(current.sequence(), 2);
        assert_eq!((current.width(), current.height()), (6, 2));
    }

    #[test]
    fn snapshot_ingest_accepts_decoded_frame() {
        let mut pipeline = IngestPipeline::new();
        let mut capture = CaptureController::new();

        let frame = RgbImage::from_pixel(10, 5, image::Rgb([1, 2, 3]));
        let asset = pipeline.from_snapshot(&mut capture, frame).unwrap();
        assert_eq!(asset.source(), ImageSource::Snapshot);
        assert_eq!((asset.width(), asset.height()), (10, 5));
    }

    #[test]
    fn reset_drops_current_asset() {
        let mut pipeline = IngestPipeline::new();
        let mut capture = CaptureController::new();

        pipeline.from_file(&mut capture, &png_bytes(4, 4)).unwrap();
        pipeline.reset();
        assert!(pipeline.current().is_none());
        // Sequence keeps advancing across resets.
        let next = pipeline.from_file(&mut capture, &png_bytes(4, 4)).unwrap();
        assert_eq!(next.sequence(), 2);
    }

    #[test]
    fn orientation_transforms_swap_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 2));
        assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (2, 4));
        assert_eq!(apply_orientation(img.clone(), 3).dimensions(), (4, 2));
        assert_eq!(apply_orientation(img, 1).dimensions(), (4, 2));
    }

    #[test]
    fn webp_magic_is_accepted_as_image_media() {
        assert!(is_image_media(b"RIFF\x00\x00\x00\x00WEBPVP8 "));
        assert!(!is_image_media(b"RIFF\x00\x00\x00\x00WAVEfmt "));
    }
}
