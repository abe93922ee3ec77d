//! Image ingest and classification IPC commands.
//!
//! File reads, decoding, and inference are CPU/IO bound and run on
//! blocking threads. The ingest-then-classify path is the main user
//! flow: pick or drop a photo, get an outcome.

use std::sync::Arc;

use tauri::State;

use crate::classify::Outcome;
use crate::core_state::{AppCore, CoreState};
use crate::ingest::{ImageSource, IngestError};
use crate::model::ModelError;

/// Ingest a file chosen via the file dialog and classify it.
#[tauri::command]
pub async fn ingest_file(
    path: String,
    state: State<'_, Arc<CoreState>>,
) -> Result<Option<Outcome>, String> {
    if !state.model.is_ready() {
        return Err(ModelError::NotReady.to_string());
    }
    // Cheap extension check before touching the file; magic bytes have
    // the final say inside the pipeline.
    if let Some(mime) = mime_guess::from_path(&path).first() {
        if mime.type_() != mime_guess::mime::IMAGE {
            return Err(IngestError::UnsupportedMedia.to_string());
        }
    }

    let core_state = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || {
        let bytes = std::fs::read(&path).map_err(|e| format!("{path}: {e}"))?;
        ingest_and_classify(&core_state, &bytes, ImageSource::File)
    })
    .await
    .map_err(|e| format!("Task failed: {e}"))?
}

/// Ingest raw bytes delivered by drag-drop and classify them.
#[tauri::command]
pub async fn ingest_drop(
    bytes: Vec<u8>,
    state: State<'_, Arc<CoreState>>,
) -> Result<Option<Outcome>, String> {
    if !state.model.is_ready() {
        return Err(ModelError::NotReady.to_string());
    }
    let core_state = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || {
        ingest_and_classify(&core_state, &bytes, ImageSource::Drop)
    })
    .await
    .map_err(|e| format!("Task failed: {e}"))?
}

/// Re-run classification on the current image, if any.
#[tauri::command]
pub async fn classify_current(
    state: State<'_, Arc<CoreState>>,
) -> Result<Option<Outcome>, String> {
    let asset = {
        let core = state
            .core
            .lock()
            .map_err(|_| "state lock poisoned".to_string())?;
        core.ingest.current().ok_or_else(|| "no image selected".to_string())?
    };
    let core_state = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || {
        core_state
            .orchestrator
            .classify(&core_state.model, &asset)
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("Task failed: {e}"))?
}

/// Display-ready data URL of the current image for the preview pane.
#[tauri::command]
pub fn current_image(state: State<'_, Arc<CoreState>>) -> Result<Option<String>, String> {
    let core = state
        .core
        .lock()
        .map_err(|_| "state lock poisoned".to_string())?;
    Ok(core.ingest.current().map(|asset| asset.data_url()))
}

/// Reset: release any camera lease and drop the current image.
#[tauri::command]
pub fn reset(state: State<'_, Arc<CoreState>>) -> Result<(), String> {
    let mut core = state
        .core
        .lock()
        .map_err(|_| "state lock poisoned".to_string())?;
    core.capture.stop_capture();
    core.ingest.reset();
    Ok(())
}

fn ingest_and_classify(
    core_state: &CoreState,
    bytes: &[u8],
    source: ImageSource,
) -> Result<Option<Outcome>, String> {
    let asset = {
        let mut core = core_state
            .core
            .lock()
            .map_err(|_| "state lock poisoned".to_string())?;
        let AppCore { capture, ingest } = &mut *core;
        let result = match source {
            ImageSource::File => ingest.from_file(capture, bytes),
            ImageSource::Drop => ingest.from_drop(capture, bytes),
            // Snapshots arrive already decoded through take_snapshot and
            // never enter the byte-ingest route.
            ImageSource::Snapshot => {
                return Err("snapshot frames are ingested by the capture flow".to_string())
            }
        };
        result.map_err(|e| e.to_string())?
    };
    core_state
        .orchestrator
        .classify(&core_state.model, &asset)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_source_never_routes_through_byte_ingest() {
        let state = CoreState::new();
        let result = ingest_and_classify(&state, b"not an image", ImageSource::Snapshot);
        assert!(result.is_err());
    }
}
