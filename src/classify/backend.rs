use crate::camera::types::Frame;
use crate::classify::error::Result;
use crate::classify::types::{AnalyzeRequest, FaceAnalysis};

/// External facial-emotion classifier.
///
/// Implementations report one entry per detected subject. A frame with no
/// subject yields `Ok(vec![])` when `request.enforce_detection` is false.
pub trait EmotionClassifier: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Analyse a single frame. Blocks until the model answers.
    fn analyze(&self, frame: &Frame, request: &AnalyzeRequest) -> Result<Vec<FaceAnalysis>>;
}
