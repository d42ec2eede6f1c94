use thiserror::Error;

/// Emotion classifier errors.
///
/// "No face in frame" is not an error: classifiers report it as an empty
/// result list.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed classifier response: {0}")]
    Response(String),

    #[error("frame could not be encoded for analysis: {0}")]
    Encode(String),

    #[error("model failure: {0}")]
    Model(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ClassifyError>;
