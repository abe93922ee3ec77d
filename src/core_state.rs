//! Shared application state.
//!
//! One `CoreState` instance is created at startup, wrapped in `Arc`, and
//! managed by Tauri. The model manager and orchestrator are internally
//! synchronized; the capture controller and ingest pipeline share one
//! mutex because every ingest operation must stop the camera first —
//! locking them together makes that supersede-then-ingest step atomic
//! from the consumer's viewpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::capture::CaptureController;
use crate::classify::InferenceOrchestrator;
use crate::ingest::IngestPipeline;
use crate::model::ModelManager;

pub struct CoreState {
    /// Model lifecycle owner. Internally synchronized.
    pub model: ModelManager,
    /// Result interpretation + request sequencing. Internally synchronized.
    pub orchestrator: InferenceOrchestrator,
    /// Camera lease + current image, mutated together.
    pub core: Mutex<AppCore>,
    /// Probed once at startup; the UI hides camera controls without it.
    camera_supported: AtomicBool,
}

pub struct AppCore {
    pub capture: CaptureController,
    pub ingest: IngestPipeline,
}

impl CoreState {
    pub fn new() -> Self {
        Self {
            model: ModelManager::new(),
            orchestrator: InferenceOrchestrator::default(),
            core: Mutex::new(AppCore {
                capture: CaptureController::new(),
                ingest: IngestPipeline::new(),
            }),
            camera_supported: AtomicBool::new(false),
        }
    }

    pub fn camera_supported(&self) -> bool {
        self.camera_supported.load(Ordering::SeqCst)
    }

    pub fn set_camera_supported(&self, supported: bool) {
        self.camera_supported.store(supported, Ordering::SeqCst);
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureState;

    #[test]
    fn fresh_state_is_idle_and_empty() {
        let state = CoreState::new();
        assert!(!state.model.is_ready());
        assert!(!state.camera_supported());

        let core = state.core.lock().unwrap();
        assert_eq!(core.capture.state(), CaptureState::Idle);
        assert!(core.ingest.current().is_none());
    }

    #[test]
    fn camera_capability_flag_round_trips() {
        let state = CoreState::new();
        state.set_camera_supported(true);
        assert!(state.camera_supported());
    }
}
