// Emotion classification: the model seam and its backends.

pub mod backend;
pub mod dummy;
pub mod error;
pub mod http;
pub mod types;
