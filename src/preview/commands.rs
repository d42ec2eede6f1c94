use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tauri::{AppHandle, Emitter, State};

use super::compress;
use super::session::DetectionSession;
use super::slot::ImageSlot;
use super::surface::{DetectionErrorPayload, ErrorCallback, SessionStatus};
use crate::camera::backend::CameraSource;
use crate::classify::backend::EmotionClassifier;
use crate::config::ConfigState;
use crate::diagnostics::stats::LoopSnapshot;
use crate::overlay::OverlayStyle;

/// Event emitted when the detection loop stops on an error.
pub const DETECTION_ERROR_EVENT: &str = "detection-error";

/// Managed state holding the (at most one) detection session.
///
/// The session lock is only held to read or swap the handle; joining a
/// capture thread happens outside it so status polls never wait on a stop.
pub struct DetectionState {
    session: Mutex<Option<Arc<DetectionSession>>>,
    /// Serialises start requests so two loops never hold the camera at once.
    starting: Mutex<()>,
    slot: Arc<ImageSlot>,
}

/// What the UI polls to update its controls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStatus {
    pub status: SessionStatus,
    pub label: Option<String>,
    pub sequence: u64,
}

impl DetectionState {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            starting: Mutex::new(()),
            slot: Arc::new(ImageSlot::new()),
        }
    }

    /// Stop any running session and start a new one.
    ///
    /// The previous session is joined first so only one loop ever holds
    /// the camera.
    pub fn start(
        &self,
        source: Box<dyn CameraSource>,
        classifier: Box<dyn EmotionClassifier>,
        style: OverlayStyle,
        on_error: Option<ErrorCallback>,
    ) -> Result<(), String> {
        let _starting = self.starting.lock();
        let previous = self.session.lock().clone();
        if let Some(previous) = previous {
            previous.stop();
        }
        self.slot.clear();

        let started = DetectionSession::start(
            source,
            classifier,
            style,
            Arc::clone(&self.slot),
            on_error,
        )
        .map_err(|e| format!("failed to spawn capture thread: {e}"))?;
        let replaced = self.session.lock().replace(Arc::new(started));
        // Already stopped above; dropped outside the lock.
        drop(replaced);
        Ok(())
    }

    /// Stop the current session, if any. Idempotent.
    ///
    /// The finished session is kept so its final status stays visible.
    pub fn stop(&self) {
        let current = self.session.lock().clone();
        if let Some(session) = current {
            session.stop();
        }
    }

    /// Latest published frame as base64-encoded JPEG.
    pub fn frame_jpeg(&self, quality: u8) -> Result<String, String> {
        let latest = self
            .slot
            .latest()
            .ok_or_else(|| "no frame available".to_string())?;
        let frame = &latest.frame;
        let jpeg = compress::compress_jpeg(&frame.data, frame.width, frame.height, quality)
            .map_err(|e| e.to_string())?;
        Ok(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            &jpeg,
        ))
    }

    pub fn status(&self) -> DetectionStatus {
        let status = self
            .session
            .lock()
            .as_ref()
            .map_or(SessionStatus::Idle, |s| s.status());
        DetectionStatus {
            status,
            label: self.slot.latest().map(|f| f.label.clone()),
            sequence: self.slot.sequence(),
        }
    }

    pub fn diagnostics(&self) -> Result<LoopSnapshot, String> {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.diagnostics())
            .ok_or_else(|| "no detection session".to_string())
    }
}

impl Default for DetectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward loop errors to the webview as `detection-error` events.
fn emit_errors(app: AppHandle) -> ErrorCallback {
    Arc::new(move |payload: &DetectionErrorPayload| {
        if let Err(e) = app.emit(DETECTION_ERROR_EVENT, payload) {
            tracing::warn!("Failed to emit {DETECTION_ERROR_EVENT} event: {e}");
        }
    })
}

/// Start emotion detection with the configured camera and classifier.
#[tauri::command]
pub async fn start_detection(
    app: AppHandle,
    state: State<'_, DetectionState>,
    config_state: State<'_, ConfigState>,
) -> Result<(), String> {
    let config = &config_state.config;
    tracing::info!("start_detection called for camera {}", config.camera.index);

    let source = crate::create_camera_source(&config.camera);
    let classifier = crate::create_classifier(&config.classifier);
    state.start(
        source,
        classifier,
        config.overlay.clone(),
        Some(emit_errors(app)),
    )
}

/// Stop emotion detection. Idempotent.
#[tauri::command]
pub async fn stop_detection(state: State<'_, DetectionState>) -> Result<(), String> {
    state.stop();
    Ok(())
}

/// Get the latest annotated frame as base64-encoded JPEG.
#[tauri::command]
pub async fn get_frame(
    state: State<'_, DetectionState>,
    config_state: State<'_, ConfigState>,
) -> Result<String, String> {
    state.frame_jpeg(config_state.config.preview_quality)
}

#[tauri::command]
pub async fn get_status(state: State<'_, DetectionState>) -> Result<DetectionStatus, String> {
    Ok(state.status())
}

/// Get loop stats for the current (or last) session.
#[tauri::command]
pub async fn get_diagnostics(state: State<'_, DetectionState>) -> Result<LoopSnapshot, String> {
    state.diagnostics()
}
