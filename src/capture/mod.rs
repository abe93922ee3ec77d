pub mod controller;

pub use controller::{probe_camera_support, CaptureController, CaptureState, FacingMode};

use thiserror::Error;

/// Camera failure taxonomy, mirrored from the platform's capture errors.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no camera capability on this device")]
    Unavailable,

    #[error("camera access was declined — allow it in the system settings")]
    Permission,

    #[error("camera is already claimed by another application")]
    Busy,

    #[error("camera is not active")]
    NotActive,

    #[error("camera error: {0}")]
    Camera(String),
}
