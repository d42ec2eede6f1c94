//! The capture-and-annotate loop.
//!
//! One call to [`run_detection_loop`] opens the camera, then repeats
//! acquire → classify → annotate → publish until the stop control is set or
//! a step fails. Every failure ends the run; nothing is retried.

use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::camera::backend::{CameraSource, CaptureGuard};
use crate::camera::error::CameraError;
use crate::classify::backend::EmotionClassifier;
use crate::classify::error::ClassifyError;
use crate::classify::types::{AnalyzeRequest, Classification};
use crate::diagnostics::stats::LoopStats;
use crate::overlay::{self, AnnotateError, OverlayStyle};
use crate::preview::slot::PublishedFrame;
use crate::preview::surface::PresentationSurface;

/// Errors that end a detection run.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("could not open camera {index}: {source}")]
    DeviceUnavailable {
        index: u32,
        #[source]
        source: CameraError,
    },

    #[error("frame capture failed: {0}")]
    Capture(#[source] CameraError),

    #[error("emotion analysis failed: {0}")]
    Inference(#[from] ClassifyError),

    #[error("frame annotation failed: {0}")]
    Annotation(#[from] AnnotateError),

    #[error("capture thread panicked: {0}")]
    Panicked(String),
}

/// Serialisable error category for the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    DeviceUnavailable,
    Capture,
    Inference,
    Annotation,
    Internal,
}

impl DetectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            Self::Capture(_) => ErrorKind::Capture,
            Self::Inference(_) => ErrorKind::Inference,
            Self::Annotation(_) => ErrorKind::Annotation,
            Self::Panicked(_) => ErrorKind::Internal,
        }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::DeviceUnavailable {
                source: CameraError::NoBackend,
                ..
            } => "This build has no camera support. Rebuild with the `native` feature."
                .to_string(),
            Self::DeviceUnavailable { .. } => {
                "Could not access the webcam. Make sure it's properly connected.".to_string()
            }
            Self::Capture(_) => "Failed to capture image.".to_string(),
            Self::Inference(e) => format!("Error: {e}"),
            Self::Annotation(e) => format!("Error: {e}"),
            Self::Panicked(detail) => format!("Error: {detail}"),
        }
    }
}

/// How a run that was not cut short by an error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
}

/// Run the loop until the surface asks to stop or a step fails.
///
/// Errors are reported once through `surface` and returned. The camera is
/// released exactly once on every path that opened it.
pub fn run_detection_loop(
    source: &dyn CameraSource,
    classifier: &dyn EmotionClassifier,
    surface: &dyn PresentationSurface,
    style: &OverlayStyle,
    stats: &Mutex<LoopStats>,
) -> Result<LoopSummary, DetectionError> {
    let result = drive(source, classifier, surface, style, stats);
    match &result {
        Ok(summary) => info!(
            "detection loop stopped after {} frames",
            summary.frames
        ),
        Err(e) => {
            error!("detection loop failed: {e}");
            surface.report_error(e);
        }
    }
    result
}

fn drive(
    source: &dyn CameraSource,
    classifier: &dyn EmotionClassifier,
    surface: &dyn PresentationSurface,
    style: &OverlayStyle,
    stats: &Mutex<LoopStats>,
) -> Result<LoopSummary, DetectionError> {
    let index = source.index();
    let stream = source
        .open()
        .map_err(|e| DetectionError::DeviceUnavailable {
            index: index.as_u32(),
            source: e,
        })?;
    let mut camera = CaptureGuard::new(index, stream);
    info!(
        "camera {index} opened, classifying with '{}'",
        classifier.name()
    );

    let request = AnalyzeRequest::emotion();
    let mut frames = 0u64;

    while !surface.stop_requested() {
        let frame = camera.read_frame().map_err(DetectionError::Capture)?;
        let bytes = frame.data.len();

        let started = Instant::now();
        let results = classifier.analyze(&frame, &request)?;
        let inference = started.elapsed();

        let classification = Classification::from_results(&results);
        let label = classification.label().to_string();
        debug!(
            "frame {frames}: {label} ({} subjects, {} ms)",
            results.len(),
            inference.as_millis()
        );

        let annotated = overlay::annotate(frame, &label, style)?;
        surface.publish(PublishedFrame {
            frame: annotated.into_rgb(),
            label,
        });

        frames += 1;
        stats
            .lock()
            .record_frame(bytes, inference, classification.has_subject());
    }

    camera.release();
    Ok(LoopSummary { frames })
}
