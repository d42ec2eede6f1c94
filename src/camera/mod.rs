// Camera domain: device sources and frame capture.

pub mod backend;
pub mod dummy;
pub mod error;
#[cfg(feature = "native")]
pub mod native;
pub mod types;
