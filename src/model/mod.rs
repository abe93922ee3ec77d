pub mod manager;

pub use manager::ModelManager;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model load failed: {0}")]
    Load(String),

    #[error("model is not ready yet")]
    NotReady,

    #[error("inference failed: {0}")]
    Inference(String),
}

/// One (label, probability) pair of a raw model output.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

/// Ordered per-label probabilities, produced fresh per inference call.
/// Labels are unique; the probability sum is trusted, not validated.
#[derive(Debug, Clone)]
pub struct RawPrediction {
    pub entries: Vec<LabelScore>,
}

impl RawPrediction {
    pub fn new(entries: Vec<LabelScore>) -> Self {
        Self { entries }
    }
}
