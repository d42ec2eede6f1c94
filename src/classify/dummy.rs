use std::sync::atomic::{AtomicU64, Ordering};

use crate::camera::types::Frame;
use crate::classify::backend::EmotionClassifier;
use crate::classify::error::Result;
use crate::classify::types::{AnalyzeRequest, FaceAnalysis};

/// Emotion labels reported by the dummy classifier, in cycle order.
pub const DUMMY_LABELS: &[&str] = &[
    "happy", "neutral", "surprise", "sad", "angry", "fear", "disgust",
];

/// Frames each label is held for before moving to the next.
const FRAMES_PER_LABEL: u64 = 15;

/// A fake classifier for running without a model service.
///
/// Cycles through [`DUMMY_LABELS`], holding each one for a few frames, and
/// reports an empty result on every `no_subject_every`-th call.
///
/// Enable via `DUMMY_CLASSIFIER=1` environment variable.
pub struct DummyClassifier {
    calls: AtomicU64,
    no_subject_every: Option<u64>,
}

impl DummyClassifier {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            no_subject_every: Some(10),
        }
    }

    pub fn with_no_subject_every(mut self, every: Option<u64>) -> Self {
        self.no_subject_every = every.filter(|n| *n > 0);
        self
    }

    /// Whether the dummy classifier is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CLASSIFIER").is_ok_and(|v| v == "1" || v == "true")
    }
}

impl Default for DummyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionClassifier for DummyClassifier {
    fn name(&self) -> &str {
        "dummy"
    }

    fn analyze(&self, _frame: &Frame, _request: &AnalyzeRequest) -> Result<Vec<FaceAnalysis>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.no_subject_every.is_some_and(|n| call % n == 0) {
            return Ok(vec![]);
        }

        let idx = ((call - 1) / FRAMES_PER_LABEL) as usize % DUMMY_LABELS.len();
        let label = DUMMY_LABELS[idx];
        let mut analysis = FaceAnalysis::with_dominant(label);
        analysis.emotion.insert(label.to_string(), 90.0);
        analysis.face_confidence = Some(0.9);
        Ok(vec![analysis])
    }
}
