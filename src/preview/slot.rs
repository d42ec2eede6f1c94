use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::camera::types::Frame;

/// An annotated frame ready for display, with the label drawn on it.
pub struct PublishedFrame {
    /// RGB pixels.
    pub frame: Frame,
    pub label: String,
}

/// Single-slot image holder shared between the loop and the UI.
///
/// Every publish overwrites the previous frame; there is no queue and no
/// backpressure. Frames are wrapped in `Arc` so readers get a cheap
/// reference-counted pointer instead of cloning the pixel buffer.
pub struct ImageSlot {
    current: Mutex<Option<Arc<PublishedFrame>>>,
    /// Monotonic counter incremented on each publish, so the UI can tell a
    /// new frame from the one it already shows.
    sequence: AtomicU64,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    /// Replace the displayed frame.
    pub fn publish(&self, frame: PublishedFrame) {
        *self.current.lock() = Some(Arc::new(frame));
        self.sequence.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of frames published so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// The most recently published frame, if any.
    pub fn latest(&self) -> Option<Arc<PublishedFrame>> {
        self.current.lock().clone()
    }

    /// Drop the displayed frame, e.g. when a new session starts.
    pub fn clear(&self) {
        *self.current.lock() = None;
    }
}

impl Default for ImageSlot {
    fn default() -> Self {
        Self::new()
    }
}
