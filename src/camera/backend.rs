use crate::camera::error::Result;
use crate::camera::types::{CameraIndex, Frame};

/// Platform-agnostic camera source.
///
/// A source knows how to open one capture device. Opening happens on the
/// thread that will read from the stream, so streams themselves need not be
/// `Send`.
pub trait CameraSource: Send + Sync {
    /// The device index this source opens.
    fn index(&self) -> CameraIndex;

    /// Open the device and start streaming.
    fn open(&self) -> Result<Box<dyn CameraStream>>;
}

/// An open capture stream with synchronous "read next frame" semantics.
pub trait CameraStream {
    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Stop streaming and release the device.
    fn release(&mut self);
}

/// Exclusive owner of an open stream.
///
/// Releases the underlying device exactly once, either through
/// [`CaptureGuard::release`] or on drop. Reads are impossible after release
/// because both paths consume the guard.
pub struct CaptureGuard {
    stream: Option<Box<dyn CameraStream>>,
    index: CameraIndex,
}

impl CaptureGuard {
    pub fn new(index: CameraIndex, stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream: Some(stream),
            index,
        }
    }

    /// Read the next frame from the device.
    pub fn read_frame(&mut self) -> Result<Frame> {
        match self.stream.as_mut() {
            Some(stream) => stream.read_frame(),
            None => Err(crate::camera::error::CameraError::ReadFailed(
                "camera already released".to_string(),
            )),
        }
    }

    /// Release the device now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            tracing::info!("camera {} released", self.index);
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}
