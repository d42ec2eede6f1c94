use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::slot::ImageSlot;
use super::surface::{
    ErrorCallback, PresentationSurface, SessionStatus, SessionSurface, StopControl,
};
use crate::camera::backend::CameraSource;
use crate::classify::backend::EmotionClassifier;
use crate::diagnostics::stats::{LoopSnapshot, LoopStats};
use crate::overlay::OverlayStyle;
use crate::pipeline::{run_detection_loop, DetectionError};

/// A running (or finished) detection loop on its own capture thread.
pub struct DetectionSession {
    stop: StopControl,
    status: Arc<Mutex<SessionStatus>>,
    stats: Arc<Mutex<LoopStats>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl DetectionSession {
    /// Spawn the capture thread and start the loop.
    ///
    /// The camera is opened on the capture thread. If `on_error` is provided,
    /// it is called with the error payload when the loop fails.
    pub fn start(
        source: Box<dyn CameraSource>,
        classifier: Box<dyn EmotionClassifier>,
        style: OverlayStyle,
        slot: Arc<ImageSlot>,
        on_error: Option<ErrorCallback>,
    ) -> std::io::Result<Self> {
        let stop = StopControl::new();
        let status = Arc::new(Mutex::new(SessionStatus::Running));
        let stats = Arc::new(Mutex::new(LoopStats::new()));

        let surface = SessionSurface::new(
            slot,
            stop.clone(),
            Arc::clone(&status),
            on_error,
        );
        let status_clone = Arc::clone(&status);
        let stats_clone = Arc::clone(&stats);
        let index = source.index();

        let thread = std::thread::Builder::new()
            .name(format!("capture-{index}"))
            .spawn(move || {
                tracing::info!("capture thread starting for camera {index}");
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_detection_loop(
                        source.as_ref(),
                        classifier.as_ref(),
                        &surface,
                        &style,
                        &stats_clone,
                    )
                }));
                match result {
                    Ok(Ok(summary)) => {
                        *status_clone.lock() = SessionStatus::Stopped {
                            frames: summary.frames,
                        };
                    }
                    // Already reported by the loop.
                    Ok(Err(_)) => {}
                    Err(payload) => {
                        let error = DetectionError::Panicked(panic_message(payload.as_ref()));
                        tracing::error!("detection loop aborted: {error}");
                        surface.report_error(&error);
                    }
                }
                tracing::info!("capture thread exiting for camera {index}");
            })?;

        Ok(Self {
            stop,
            status,
            stats,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Current lifecycle state.
    pub fn status(&self) -> SessionStatus {
        self.status.lock().clone()
    }

    /// Whether the loop is still cycling.
    pub fn is_running(&self) -> bool {
        matches!(*self.status.lock(), SessionStatus::Running)
    }

    /// Take a snapshot of loop stats for this session.
    pub fn diagnostics(&self) -> LoopSnapshot {
        self.stats.lock().snapshot()
    }

    /// Stop the session and wait for the camera to be released.
    /// Idempotent.
    ///
    /// Waits for at most one in-flight iteration.
    pub fn stop(&self) {
        self.stop.request_stop();
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("capture thread panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::dummy::DummySource;
    use crate::camera::types::{CameraIndex, ChannelOrder, Frame};
    use crate::classify::dummy::{DummyClassifier, DUMMY_LABELS};
    use crate::classify::error::Result as ClassifyResult;
    use crate::classify::types::{AnalyzeRequest, FaceAnalysis};
    use crate::pipeline::ErrorKind;
    use crate::preview::surface::DetectionErrorPayload;
    use std::time::{Duration, Instant};

    fn dummy_camera() -> Box<dyn CameraSource> {
        Box::new(DummySource::new(CameraIndex::default()).with_size(160, 80))
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn session_publishes_annotated_rgb_frames() {
        let slot = Arc::new(ImageSlot::new());
        let session = DetectionSession::start(
            dummy_camera(),
            Box::new(DummyClassifier::new().with_no_subject_every(None)),
            OverlayStyle::default(),
            Arc::clone(&slot),
            None,
        )
        .unwrap();

        assert!(wait_until(|| slot.sequence() >= 3));
        let latest = slot.latest().unwrap();
        assert_eq!(latest.frame.order, ChannelOrder::Rgb);
        assert!(DUMMY_LABELS.contains(&latest.label.as_str()));

        session.stop();
        assert!(matches!(session.status(), SessionStatus::Stopped { frames } if frames >= 3));
        assert!(session.diagnostics().frame_count >= 3);
    }

    #[test]
    fn session_stop_is_idempotent() {
        let session = DetectionSession::start(
            dummy_camera(),
            Box::new(DummyClassifier::new()),
            OverlayStyle::default(),
            Arc::new(ImageSlot::new()),
            None,
        )
        .unwrap();
        session.stop();
        session.stop(); // Should not panic
        assert!(!session.is_running());
    }

    #[test]
    fn capture_failure_fires_error_callback() {
        let seen: Arc<Mutex<Vec<DetectionErrorPayload>>> = Arc::new(Mutex::new(vec![]));
        let seen_clone = Arc::clone(&seen);
        let on_error: ErrorCallback = Arc::new(move |p| seen_clone.lock().push(p.clone()));

        let source = DummySource::new(CameraIndex::default())
            .with_size(160, 80)
            .with_fail_after(Some(2));
        let slot = Arc::new(ImageSlot::new());
        let session = DetectionSession::start(
            Box::new(source),
            Box::new(DummyClassifier::new()),
            OverlayStyle::default(),
            Arc::clone(&slot),
            Some(on_error),
        )
        .unwrap();

        assert!(wait_until(|| !seen.lock().is_empty()));
        session.stop();

        assert_eq!(seen.lock()[0].kind, ErrorKind::Capture);
        assert_eq!(slot.sequence(), 2);
        assert!(matches!(session.status(), SessionStatus::Failed { .. }));
    }

    #[test]
    fn unopenable_camera_fails_without_frames() {
        let source = DummySource::new(CameraIndex::new(4)).with_size(0, 0);
        let slot = Arc::new(ImageSlot::new());
        let session = DetectionSession::start(
            Box::new(source),
            Box::new(DummyClassifier::new()),
            OverlayStyle::default(),
            Arc::clone(&slot),
            None,
        )
        .unwrap();
        session.stop();

        match session.status() {
            SessionStatus::Failed { error } => {
                assert_eq!(error.kind, ErrorKind::DeviceUnavailable)
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(slot.sequence(), 0);
    }

    struct PanickingClassifier;

    impl EmotionClassifier for PanickingClassifier {
        fn name(&self) -> &str {
            "panicking"
        }

        fn analyze(&self, _frame: &Frame, _request: &AnalyzeRequest) -> ClassifyResult<Vec<FaceAnalysis>> {
            panic!("model exploded")
        }
    }

    #[test]
    fn classifier_panic_is_reported_as_failure() {
        let seen: Arc<Mutex<Vec<DetectionErrorPayload>>> = Arc::new(Mutex::new(vec![]));
        let seen_clone = Arc::clone(&seen);
        let on_error: ErrorCallback = Arc::new(move |p| seen_clone.lock().push(p.clone()));

        let slot = Arc::new(ImageSlot::new());
        let session = DetectionSession::start(
            dummy_camera(),
            Box::new(PanickingClassifier),
            OverlayStyle::default(),
            Arc::clone(&slot),
            Some(on_error),
        )
        .unwrap();

        assert!(wait_until(|| !seen.lock().is_empty()));
        session.stop();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, ErrorKind::Internal);
        assert!(seen[0].message.contains("model exploded"));
        match session.status() {
            SessionStatus::Failed { error } => assert_eq!(error.kind, ErrorKind::Internal),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(slot.sequence(), 0);
    }
}
