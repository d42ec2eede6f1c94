// Presentation surface: image slot, stop control and IPC delivery.

pub mod commands;
pub mod compress;
pub mod session;
pub mod slot;
pub mod surface;
