pub mod asset;
pub mod pipeline;

pub use asset::{ImageAsset, ImageSource};
pub use pipeline::IngestPipeline;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unsupported media type — expected an image (JPG, PNG, WebP)")]
    UnsupportedMedia,

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
