use thiserror::Error;

/// Camera subsystem errors.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("device {index} unavailable: {reason}")]
    DeviceUnavailable { index: u32, reason: String },

    #[error("no capture backend available on this build")]
    NoBackend,

    #[error("frame read failed: {0}")]
    ReadFailed(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;
