use std::time::{Duration, Instant};

use crate::camera::backend::{CameraSource, CameraStream};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CameraIndex, ChannelOrder, Frame};

const DUMMY_WIDTH: u32 = 320;
const DUMMY_HEIGHT: u32 = 240;
/// Roughly 30 fps, like a typical webcam.
const DUMMY_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// A fake camera for running without real hardware.
///
/// Produces BGR gradient frames whose pattern drifts one step per frame, the
/// same channel order a typical OpenCV-style capture delivers. With
/// `fail_after` set, the read following that many frames fails, which drives
/// the capture-error path end to end.
///
/// Enable via `DUMMY_CAMERA=1` environment variable.
pub struct DummySource {
    index: CameraIndex,
    width: u32,
    height: u32,
    fail_after: Option<u64>,
    frame_interval: Duration,
}

impl DummySource {
    pub fn new(index: CameraIndex) -> Self {
        Self {
            index,
            width: DUMMY_WIDTH,
            height: DUMMY_HEIGHT,
            fail_after: None,
            frame_interval: DUMMY_FRAME_INTERVAL,
        }
    }

    /// Fail the read after `frames` successful ones.
    pub fn with_fail_after(mut self, frames: Option<u64>) -> Self {
        self.fail_after = frames;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }
}

impl CameraSource for DummySource {
    fn index(&self) -> CameraIndex {
        self.index
    }

    fn open(&self) -> Result<Box<dyn CameraStream>> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::DeviceUnavailable {
                index: self.index.as_u32(),
                reason: "zero-sized dummy frames".to_string(),
            });
        }
        tracing::info!(
            "dummy camera {} opened ({}x{})",
            self.index,
            self.width,
            self.height
        );
        Ok(Box::new(DummyStream {
            width: self.width,
            height: self.height,
            fail_after: self.fail_after,
            frame_interval: self.frame_interval,
            produced: 0,
            opened_at: Instant::now(),
            last_read: None,
        }))
    }
}

struct DummyStream {
    width: u32,
    height: u32,
    fail_after: Option<u64>,
    frame_interval: Duration,
    produced: u64,
    opened_at: Instant,
    last_read: Option<Instant>,
}

impl DummyStream {
    fn pattern(&self) -> Vec<u8> {
        let shift = (self.produced % 256) as u32;
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x + shift) % 256) as u8); // B
                data.push(((y + shift) % 256) as u8); // G
                data.push(96); // R
            }
        }
        data
    }
}

impl CameraStream for DummyStream {
    fn read_frame(&mut self) -> Result<Frame> {
        if self.fail_after.is_some_and(|n| self.produced >= n) {
            return Err(CameraError::ReadFailed(
                "dummy camera disconnected".to_string(),
            ));
        }
        if let Some(last) = self.last_read {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_read = Some(Instant::now());

        let frame = Frame {
            data: self.pattern(),
            width: self.width,
            height: self.height,
            order: ChannelOrder::Bgr,
            timestamp_us: self.opened_at.elapsed().as_micros() as u64,
        };
        self.produced += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        tracing::debug!("dummy camera stream stopped after {} frames", self.produced);
    }
}
