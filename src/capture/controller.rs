//! Camera hardware lease and still-frame capture.
//!
//! The lease is strictly exclusive: at most one capture session is active
//! at a time, and `start_capture` always tears down any prior session
//! before requesting a new one. The camera itself lives on a dedicated
//! worker thread (platform capture handles are not guaranteed to be
//! thread-movable); the controller talks to it over channels and joins
//! the worker on every stop path.

use std::sync::mpsc;
use std::thread::JoinHandle;

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{query, Camera, NokhwaError};
use tracing::{debug, info, warn};

use super::CaptureError;
use crate::config;

/// Preferred lens direction. Advisory — resolved to a device by name
/// heuristics since desktop capture stacks expose no facing attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front-facing ("user") camera.
    User,
    /// Rear-facing ("environment") camera.
    Environment,
}

impl FacingMode {
    /// Rear-facing on handheld form factors, front-facing otherwise.
    pub fn preferred() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            FacingMode::Environment
        } else {
            FacingMode::User
        }
    }
}

/// Controller state machine. `Capturing` is the transient window inside
/// `take_snapshot` between the frame read and the lease release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Active,
    Capturing,
}

/// Requests the controller sends to the camera worker.
enum LeaseRequest {
    Snapshot(mpsc::Sender<Result<RgbImage, CaptureError>>),
    Stop,
}

/// An active hardware lease: the command channel to the worker thread
/// plus the resolution the device actually negotiated.
struct CaptureSession {
    commands: mpsc::Sender<LeaseRequest>,
    resolution: (u32, u32),
    worker: Option<JoinHandle<()>>,
}

/// Owns the camera lease. Exactly one owner may mutate the session.
pub struct CaptureController {
    state: CaptureState,
    session: Option<CaptureSession>,
    facing: FacingMode,
}

impl CaptureController {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            session: None,
            facing: FacingMode::preferred(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Resolution read back from the granted stream, if a lease is active.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.session.as_ref().map(|s| s.resolution)
    }

    /// Request a hardware lease. Any prior session is fully released first
    /// so two leases can never coexist. On failure the state stays `Idle`.
    pub fn start_capture(&mut self) -> Result<(), CaptureError> {
        self.stop_capture();

        let devices = query(ApiBackend::Auto).map_err(classify_nokhwa_error)?;
        if devices.is_empty() {
            return Err(CaptureError::Unavailable);
        }

        let names: Vec<String> = devices.iter().map(|d| d.human_name()).collect();
        let pick = pick_device(&names, self.facing);
        let index = devices[pick].index().clone();
        debug!(device = %names[pick], "requesting camera lease");

        self.lease(move |ready, commands| lease_worker(index, ready, commands))
    }

    /// Spawn a worker owning the device and wait for its verdict over the
    /// ready channel. On any failure — refused lease or a worker that
    /// exits without answering — no session is retained and the state
    /// stays `Idle`.
    fn lease<F>(&mut self, worker_body: F) -> Result<(), CaptureError>
    where
        F: FnOnce(mpsc::Sender<Result<(u32, u32), CaptureError>>, mpsc::Receiver<LeaseRequest>)
            + Send
            + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("camera-lease".into())
            .spawn(move || worker_body(ready_tx, cmd_rx))
            .map_err(|e| CaptureError::Camera(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(resolution)) => {
                info!(width = resolution.0, height = resolution.1, "camera lease granted");
                self.session = Some(CaptureSession {
                    commands: cmd_tx,
                    resolution,
                    worker: Some(worker),
                });
                self.state = CaptureState::Active;
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CaptureError::Camera("capture worker exited early".into()))
            }
        }
    }

    /// Release every hardware track and clear the session. Idempotent —
    /// a no-op on an already-idle controller, never an error. Invoked on
    /// every exit path: cancel, successful snapshot, teardown, and
    /// immediately before any new start.
    pub fn stop_capture(&mut self) {
        if let Some(mut session) = self.session.take() {
            let _ = session.commands.send(LeaseRequest::Stop);
            if let Some(worker) = session.worker.take() {
                let _ = worker.join();
            }
            info!("camera lease released");
        }
        self.state = CaptureState::Idle;
    }

    /// Read the current video frame at its native decoded dimensions and
    /// release the lease. If no frame has been decoded yet this fails with
    /// `NotActive` (never a blank image) and the lease stays active.
    pub fn take_snapshot(&mut self) -> Result<RgbImage, CaptureError> {
        if self.state != CaptureState::Active {
            return Err(CaptureError::NotActive);
        }
        let session = self.session.as_ref().ok_or(CaptureError::NotActive)?;

        self.state = CaptureState::Capturing;
        let (reply_tx, reply_rx) = mpsc::channel();
        let delivered = session.commands.send(LeaseRequest::Snapshot(reply_tx)).is_ok();

        let frame = if delivered {
            match reply_rx.recv() {
                Ok(result) => result,
                Err(_) => Err(CaptureError::Camera("capture worker exited".into())),
            }
        } else {
            Err(CaptureError::Camera("capture worker exited".into()))
        };

        match frame {
            Ok(image) => {
                // Successful snapshot is an exit path: release the lease.
                self.stop_capture();
                debug!(width = image.width(), height = image.height(), "snapshot captured");
                Ok(image)
            }
            Err(CaptureError::NotActive) => {
                // Frame not ready yet — keep the lease so the user can retry.
                self.state = CaptureState::Active;
                Err(CaptureError::NotActive)
            }
            Err(e) => {
                self.stop_capture();
                Err(e)
            }
        }
    }
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

/// Camera worker: opens the device, reports the negotiated resolution,
/// then serves snapshot requests until told to stop. The stream is
/// always torn down before the thread exits.
fn lease_worker(
    index: CameraIndex,
    ready: mpsc::Sender<Result<(u32, u32), CaptureError>>,
    commands: mpsc::Receiver<LeaseRequest>,
) {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
        CameraFormat::new(
            Resolution::new(config::PREFERRED_CAPTURE_WIDTH, config::PREFERRED_CAPTURE_HEIGHT),
            FrameFormat::MJPEG,
            30,
        ),
    ));

    let mut camera = match Camera::new(index, requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(classify_nokhwa_error(e)));
            return;
        }
    };
    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(classify_nokhwa_error(e)));
        return;
    }

    // The 1280x720 request is advisory — report what was actually granted.
    let negotiated = camera.resolution();
    if ready.send(Ok((negotiated.width(), negotiated.height()))).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    while let Ok(request) = commands.recv() {
        match request {
            LeaseRequest::Snapshot(reply) => {
                let result = match camera.frame().and_then(|b| b.decode_image::<RgbFormat>()) {
                    Ok(decoded) => {
                        let (width, height) = (decoded.width(), decoded.height());
                        // The capture stack decodes with its own image crate
                        // version; rebuild from raw bytes to stay on ours.
                        RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
                            CaptureError::Camera("frame buffer size mismatch".into())
                        })
                    }
                    Err(e) => {
                        // No decodable frame yet reads as "not active", per
                        // the no-blank-image contract.
                        debug!(error = %e, "frame not ready");
                        Err(CaptureError::NotActive)
                    }
                };
                let _ = reply.send(result);
            }
            LeaseRequest::Stop => break,
        }
    }

    if let Err(e) = camera.stop_stream() {
        warn!(error = %e, "camera stream teardown reported an error");
    }
}

/// Map the platform capture error onto the user-facing taxonomy.
fn classify_nokhwa_error(error: NokhwaError) -> CaptureError {
    let text = error.to_string();
    let lower = text.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not allowed") {
        CaptureError::Permission
    } else if lower.contains("busy") || lower.contains("in use") || lower.contains("already") {
        CaptureError::Busy
    } else if lower.contains("not found") || lower.contains("no device") {
        CaptureError::Unavailable
    } else {
        CaptureError::Camera(text)
    }
}

/// Pick a device index from the enumerated names for the preferred facing
/// mode. Falls back to the first device when nothing matches.
fn pick_device(names: &[String], facing: FacingMode) -> usize {
    let hints: &[&str] = match facing {
        FacingMode::Environment => &["back", "rear", "environment"],
        FacingMode::User => &["front", "user", "facetime", "integrated"],
    };
    names
        .iter()
        .position(|name| {
            let lower = name.to_lowercase();
            hints.iter().any(|hint| lower.contains(hint))
        })
        .unwrap_or(0)
}

/// Startup probe: does this device expose any camera at all?
pub fn probe_camera_support() -> bool {
    match query(ApiBackend::Auto) {
        Ok(devices) => !devices.is_empty(),
        Err(e) => {
            debug!(error = %e, "camera enumeration failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_on_idle_controller_is_not_active() {
        let mut controller = CaptureController::new();
        assert!(matches!(
            controller.take_snapshot(),
            Err(CaptureError::NotActive)
        ));
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[test]
    fn stop_is_idempotent_on_idle() {
        let mut controller = CaptureController::new();
        controller.stop_capture();
        controller.stop_capture();
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(controller.resolution().is_none());
    }

    #[test]
    fn refused_lease_leaves_idle_with_no_session() {
        let mut controller = CaptureController::new();
        let result = controller.lease(|ready, _commands| {
            let _ = ready.send(Err(CaptureError::Permission));
        });
        assert!(matches!(result, Err(CaptureError::Permission)));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(controller.resolution().is_none());
    }

    #[test]
    fn worker_dying_before_verdict_leaves_idle() {
        let mut controller = CaptureController::new();
        let result = controller.lease(|_ready, _commands| {});
        assert!(matches!(result, Err(CaptureError::Camera(_))));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(controller.resolution().is_none());
    }

    // Worker body standing in for a granted device: reports the given
    // resolution, then serves whatever each snapshot request scripts.
    fn granted_worker(
        resolution: (u32, u32),
        frame: impl Fn() -> Result<RgbImage, CaptureError> + Send + 'static,
    ) -> impl FnOnce(
        mpsc::Sender<Result<(u32, u32), CaptureError>>,
        mpsc::Receiver<LeaseRequest>,
    ) + Send
           + 'static {
        move |ready, commands| {
            let _ = ready.send(Ok(resolution));
            while let Ok(request) = commands.recv() {
                match request {
                    LeaseRequest::Snapshot(reply) => {
                        let _ = reply.send(frame());
                    }
                    LeaseRequest::Stop => break,
                }
            }
        }
    }

    #[test]
    fn successful_snapshot_releases_the_lease() {
        let mut controller = CaptureController::new();
        controller
            .lease(granted_worker((640, 480), || Ok(RgbImage::new(640, 480))))
            .unwrap();
        assert_eq!(controller.state(), CaptureState::Active);
        assert_eq!(controller.resolution(), Some((640, 480)));

        let frame = controller.take_snapshot().unwrap();
        assert_eq!(frame.dimensions(), (640, 480));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert!(controller.resolution().is_none());
    }

    #[test]
    fn frame_not_ready_keeps_the_lease() {
        let mut controller = CaptureController::new();
        controller
            .lease(granted_worker((320, 240), || Err(CaptureError::NotActive)))
            .unwrap();

        assert!(matches!(
            controller.take_snapshot(),
            Err(CaptureError::NotActive)
        ));
        // The lease survives so the user can retry.
        assert_eq!(controller.state(), CaptureState::Active);
        assert_eq!(controller.resolution(), Some((320, 240)));

        controller.stop_capture();
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[test]
    fn device_pick_prefers_facing_hint() {
        let names = vec!["USB Webcam".to_string(), "Back Camera".to_string()];
        assert_eq!(pick_device(&names, FacingMode::Environment), 1);
        assert_eq!(pick_device(&names, FacingMode::User), 0);
    }

    #[test]
    fn device_pick_falls_back_to_first() {
        let names = vec!["Capture Device A".to_string(), "Capture Device B".to_string()];
        assert_eq!(pick_device(&names, FacingMode::Environment), 0);
    }

    #[test]
    fn permission_errors_are_classified() {
        let e = NokhwaError::OpenDeviceError("0".into(), "Permission denied by user".into());
        assert!(matches!(classify_nokhwa_error(e), CaptureError::Permission));

        let e = NokhwaError::OpenStreamError("device is busy".into());
        assert!(matches!(classify_nokhwa_error(e), CaptureError::Busy));
    }
}
