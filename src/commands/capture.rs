//! Camera IPC commands.
//!
//! `start_camera` can hang on a permission prompt, so it runs on a
//! blocking thread; the UI shows its loading state until the lease is
//! granted or refused. Every error leaves the controller `Idle` with no
//! stream handle retained.

use std::sync::Arc;

use tauri::State;

use crate::capture::{CaptureError, CaptureState};
use crate::classify::Outcome;
use crate::core_state::{AppCore, CoreState};
use crate::model::ModelError;

/// Capture lease status for the frontend.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStatus {
    pub state: CaptureState,
    /// Negotiated resolution of the granted stream, when active.
    pub resolution: Option<(u32, u32)>,
}

/// Request the camera lease. Refused while the model is still loading,
/// matching the rest of the flow — there is nothing to classify yet.
#[tauri::command]
pub async fn start_camera(state: State<'_, Arc<CoreState>>) -> Result<CaptureStatus, String> {
    if !state.model.is_ready() {
        return Err(ModelError::NotReady.to_string());
    }
    if !state.camera_supported() {
        return Err(CaptureError::Unavailable.to_string());
    }

    let core_state = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || {
        let mut core = core_state
            .core
            .lock()
            .map_err(|_| "state lock poisoned".to_string())?;
        core.capture.start_capture().map_err(|e| e.to_string())?;
        Ok(CaptureStatus {
            state: core.capture.state(),
            resolution: core.capture.resolution(),
        })
    })
    .await
    .map_err(|e| format!("Task failed: {e}"))?
}

/// Explicit cancel. Idempotent by contract.
#[tauri::command]
pub fn stop_camera(state: State<'_, Arc<CoreState>>) -> Result<CaptureStatus, String> {
    let mut core = state
        .core
        .lock()
        .map_err(|_| "state lock poisoned".to_string())?;
    core.capture.stop_capture();
    Ok(CaptureStatus {
        state: core.capture.state(),
        resolution: core.capture.resolution(),
    })
}

/// Capture a still frame, ingest it as the current image, and classify.
/// The successful snapshot releases the camera lease.
#[tauri::command]
pub async fn take_snapshot(state: State<'_, Arc<CoreState>>) -> Result<Option<Outcome>, String> {
    let core_state = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || {
        let asset = {
            let mut core = core_state
                .core
                .lock()
                .map_err(|_| "state lock poisoned".to_string())?;
            let frame = core.capture.take_snapshot().map_err(|e| e.to_string())?;
            let AppCore { capture, ingest } = &mut *core;
            ingest.from_snapshot(capture, frame).map_err(|e| e.to_string())?
        };
        core_state
            .orchestrator
            .classify(&core_state.model, &asset)
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("Task failed: {e}"))?
}
