use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label shown when the classifier finds no subject in a frame.
pub const NO_FACE_LABEL: &str = "No face detected";

/// Facial attribute a classifier is asked to analyse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Emotion,
}

/// Parameters of a single analysis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeRequest {
    pub actions: Vec<Action>,
    /// When false, a frame without a face yields an empty result instead of
    /// an error.
    pub enforce_detection: bool,
}

impl AnalyzeRequest {
    /// Emotion only, detection not enforced.
    pub fn emotion() -> Self {
        Self {
            actions: vec![Action::Emotion],
            enforce_detection: false,
        }
    }
}

impl Default for AnalyzeRequest {
    fn default() -> Self {
        Self::emotion()
    }
}

/// Per-subject analysis reported by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceAnalysis {
    #[serde(default)]
    pub dominant_emotion: Option<String>,
    /// Confidence per emotion label.
    #[serde(default)]
    pub emotion: BTreeMap<String, f32>,
    #[serde(default)]
    pub face_confidence: Option<f32>,
}

impl FaceAnalysis {
    pub fn with_dominant(label: impl Into<String>) -> Self {
        Self {
            dominant_emotion: Some(label.into()),
            ..Self::default()
        }
    }

    /// The highest-confidence emotion label for this subject.
    ///
    /// Uses the classifier's own `dominant_emotion` when present, otherwise
    /// the arg-max of the score map.
    pub fn dominant(&self) -> Option<&str> {
        if let Some(label) = self.dominant_emotion.as_deref().filter(|l| !l.is_empty()) {
            return Some(label);
        }
        self.emotion
            .iter()
            .filter(|(_, score)| score.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(label, _)| label.as_str())
    }
}

/// Outcome of classifying one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Subject { label: String },
    NoSubject,
}

impl Classification {
    /// Pick the dominant emotion of the first detected subject.
    pub fn from_results(results: &[FaceAnalysis]) -> Self {
        match results.first().and_then(FaceAnalysis::dominant) {
            Some(label) => Self::Subject {
                label: label.to_string(),
            },
            None => Self::NoSubject,
        }
    }

    /// Text to display for this classification.
    pub fn label(&self) -> &str {
        match self {
            Self::Subject { label } => label,
            Self::NoSubject => NO_FACE_LABEL,
        }
    }

    pub fn has_subject(&self) -> bool {
        matches!(self, Self::Subject { .. })
    }
}
