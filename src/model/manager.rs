//! Lifecycle of the opaque classification model.
//!
//! The model is frozen and externally supplied: two small JSON description
//! resources (topology + label metadata) plus an ONNX weights file under
//! the model asset root. `load` commits all three into a session once per
//! application run; `predict` turns a canonical image into per-label
//! probabilities. Loaded once, held for the session lifetime, never
//! mutated (a Mutex wraps the session only because `ort` requires
//! `&mut self` to run).

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use image::imageops::FilterType;
use ort::session::Session;
use serde::Deserialize;
use tracing::info;

use super::{LabelScore, ModelError, RawPrediction};
use crate::config;
use crate::ingest::ImageAsset;

/// Topology descriptor (`model.json`): names the weights file and the
/// square input geometry the network expects.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopologyDescriptor {
    weights_file: String,
    input_size: u32,
}

/// Label metadata descriptor (`metadata.json`): the label vocabulary, in
/// output-tensor order.
#[derive(Debug, Deserialize)]
struct MetadataDescriptor {
    labels: Vec<String>,
}

struct LoadedModel {
    session: Session,
    labels: Vec<String>,
    input_size: u32,
}

/// Owns the model lifecycle and exposes `load` / `predict`.
pub struct ModelManager {
    inner: Mutex<Option<LoadedModel>>,
    ready: AtomicBool,
}

impl ModelManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
            ready: AtomicBool::new(false),
        }
    }

    /// Ready flag observable by dependents. Stays false until a load
    /// succeeds; a failed load leaves it untouched.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Load the model from the asset root. Blocking — callers dispatch it
    /// off the UI thread. Fails with `ModelError::Load` if either
    /// description resource cannot be read or parsed, or the weights
    /// cannot be committed.
    pub fn load(&self, model_root: &Path) -> Result<(), ModelError> {
        let topology: TopologyDescriptor =
            read_descriptor(&model_root.join(config::MODEL_TOPOLOGY_FILE))?;
        let metadata: MetadataDescriptor =
            read_descriptor(&model_root.join(config::MODEL_METADATA_FILE))?;

        if metadata.labels.is_empty() {
            return Err(ModelError::Load("metadata carries an empty label vocabulary".into()));
        }
        if topology.input_size == 0 {
            return Err(ModelError::Load("topology declares a zero input size".into()));
        }

        let weights_path = model_root.join(&topology.weights_file);
        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::Load(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| ModelError::Load(e.to_string()))?
            .commit_from_file(&weights_path)
            .map_err(|e: ort::Error| {
                ModelError::Load(format!("ONNX load failed for {}: {e}", weights_path.display()))
            })?;

        info!(
            labels = metadata.labels.len(),
            input_size = topology.input_size,
            "classification model loaded from {}",
            model_root.display()
        );

        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ModelError::Load("model lock poisoned".into()))?;
        *guard = Some(LoadedModel {
            session,
            labels: metadata.labels,
            input_size: topology.input_size,
        });
        drop(guard);

        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Run inference on a canonical image, returning one probability per
    /// vocabulary label in output order.
    pub fn predict(&self, asset: &ImageAsset) -> Result<RawPrediction, ModelError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ModelError::Inference("model lock poisoned".into()))?;
        let model = guard.as_mut().ok_or(ModelError::NotReady)?;

        if asset.width() == 0 || asset.height() == 0 {
            return Err(ModelError::Inference("image has no pixel data".into()));
        }

        let side = model.input_size;
        let resized = image::imageops::resize(asset.pixels(), side, side, FilterType::CatmullRom);

        let side = side as usize;
        let mut input = ndarray::Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] = pixel[channel] as f32 / 255.0;
            }
        }

        let tensor = ort::value::TensorRef::from_array_view(&input)
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let outputs = model
            .session
            .run(ort::inputs![tensor])
            .map_err(|e| ModelError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(format!("output extraction: {e}")))?;

        let expected = model.labels.len();
        let total: usize = shape.iter().map(|&d| d as usize).product();
        if total != expected {
            return Err(ModelError::Inference(format!(
                "unexpected output shape {shape:?}, expected {expected} probabilities"
            )));
        }

        let entries = model
            .labels
            .iter()
            .zip(data.iter())
            .map(|(label, &probability)| LabelScore {
                label: label.clone(),
                probability,
            })
            .collect();

        Ok(RawPrediction::new(entries))
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

fn read_descriptor<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ModelError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ModelError::Load(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ModelError::Load(format!("malformed descriptor {}: {e}", path.display())))
}
