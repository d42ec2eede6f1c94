use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::slot::{ImageSlot, PublishedFrame};
use crate::pipeline::{DetectionError, ErrorKind};

/// Callback type for reporting loop errors to the frontend.
pub type ErrorCallback = Arc<dyn Fn(&DetectionErrorPayload) + Send + Sync>;

/// What the detection loop needs from the UI.
///
/// The UI owns the image slot and the stop control; the loop only writes
/// frames, samples the control, and reports fatal errors.
pub trait PresentationSurface {
    /// Overwrite the displayed frame.
    fn publish(&self, frame: PublishedFrame);

    /// Whether the user asked the loop to stop.
    fn stop_requested(&self) -> bool;

    /// Show a fatal error to the user.
    fn report_error(&self, error: &DetectionError);
}

/// User-controlled stop flag.
#[derive(Clone, Default)]
pub struct StopControl(Arc<AtomicBool>);

impl StopControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Payload emitted via the `detection-error` Tauri event when the loop fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionErrorPayload {
    pub kind: ErrorKind,
    /// Message shown in the UI banner.
    pub message: String,
    /// Underlying cause, for logs and tooltips.
    pub detail: String,
}

impl From<&DetectionError> for DetectionErrorPayload {
    fn from(error: &DetectionError) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message(),
            detail: error.to_string(),
        }
    }
}

/// Lifecycle of a detection session as seen by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Running,
    Stopped { frames: u64 },
    Failed { error: DetectionErrorPayload },
}

/// Presentation surface backed by the shared slot, stop control, and status.
pub struct SessionSurface {
    slot: Arc<ImageSlot>,
    stop: StopControl,
    status: Arc<Mutex<SessionStatus>>,
    on_error: Option<ErrorCallback>,
}

impl SessionSurface {
    pub fn new(
        slot: Arc<ImageSlot>,
        stop: StopControl,
        status: Arc<Mutex<SessionStatus>>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self {
            slot,
            stop,
            status,
            on_error,
        }
    }
}

impl PresentationSurface for SessionSurface {
    fn publish(&self, frame: PublishedFrame) {
        self.slot.publish(frame);
    }

    fn stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    fn report_error(&self, error: &DetectionError) {
        let payload = DetectionErrorPayload::from(error);
        *self.status.lock() = SessionStatus::Failed {
            error: payload.clone(),
        };
        if let Some(cb) = &self.on_error {
            cb(&payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::error::CameraError;
    use crate::camera::types::{ChannelOrder, Frame};

    fn surface(on_error: Option<ErrorCallback>) -> (SessionSurface, Arc<ImageSlot>, StopControl, Arc<Mutex<SessionStatus>>) {
        let slot = Arc::new(ImageSlot::new());
        let stop = StopControl::new();
        let status = Arc::new(Mutex::new(SessionStatus::Running));
        let s = SessionSurface::new(Arc::clone(&slot), stop.clone(), Arc::clone(&status), on_error);
        (s, slot, stop, status)
    }

    #[test]
    fn stop_control_is_shared_between_clones() {
        let stop = StopControl::new();
        let other = stop.clone();
        assert!(!other.is_stop_requested());
        stop.request_stop();
        assert!(other.is_stop_requested());
    }

    #[test]
    fn publish_writes_to_slot() {
        let (s, slot, _, _) = surface(None);
        s.publish(PublishedFrame {
            frame: Frame {
                data: vec![1; 3],
                width: 1,
                height: 1,
                order: ChannelOrder::Rgb,
                timestamp_us: 0,
            },
            label: "happy".into(),
        });
        assert_eq!(slot.latest().unwrap().label, "happy");
    }

    #[test]
    fn surface_reflects_stop_control() {
        let (s, _, stop, _) = surface(None);
        assert!(!s.stop_requested());
        stop.request_stop();
        assert!(s.stop_requested());
    }

    #[test]
    fn report_error_sets_failed_status_and_fires_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let cb: ErrorCallback = Arc::new(move |p| seen_clone.lock().push(p.clone()));
        let (s, _, _, status) = surface(Some(cb));

        let err = DetectionError::Capture(CameraError::ReadFailed("unplugged".into()));
        s.report_error(&err);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, ErrorKind::Capture);
        assert_eq!(seen[0].message, "Failed to capture image.");
        assert!(seen[0].detail.contains("unplugged"));
        assert!(matches!(*status.lock(), SessionStatus::Failed { .. }));
    }

    #[test]
    fn status_serialises_with_state_tag() {
        let json = serde_json::to_value(SessionStatus::Stopped { frames: 7 }).unwrap();
        assert_eq!(json["state"], "stopped");
        assert_eq!(json["frames"], 7);
        let idle = serde_json::to_value(SessionStatus::Idle).unwrap();
        assert_eq!(idle["state"], "idle");
    }

    #[test]
    fn error_callback_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ErrorCallback>();
    }
}
