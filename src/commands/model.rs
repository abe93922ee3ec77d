//! Model lifecycle IPC commands.
//!
//! The load runs on a blocking thread: descriptor parsing and the ONNX
//! session commit take seconds, and the UI observes a loading state in
//! the meantime. A failed load is reported for user-visible retry
//! guidance — never retried automatically.

use std::sync::Arc;

use tauri::{AppHandle, Emitter, State};

use crate::config;
use crate::core_state::CoreState;

/// Model readiness for the frontend status surface.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub ready: bool,
    pub camera_supported: bool,
}

fn status_of(state: &CoreState) -> ModelStatus {
    ModelStatus {
        ready: state.model.is_ready(),
        camera_supported: state.camera_supported(),
    }
}

/// Load the classification model from the model asset root.
#[tauri::command]
pub async fn load_model(
    app: AppHandle,
    state: State<'_, Arc<CoreState>>,
) -> Result<ModelStatus, String> {
    let core = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || {
        core.model.load(&config::model_dir()).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("Task failed: {e}"))??;

    let status = status_of(&state);
    let _ = app.emit("model-ready", status.clone());
    Ok(status)
}

/// Current readiness without side effects.
#[tauri::command]
pub fn model_status(state: State<'_, Arc<CoreState>>) -> ModelStatus {
    status_of(&state)
}
