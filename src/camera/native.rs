//! Platform capture backend built on `nokhwa`.
//!
//! Uses V4L2 on Linux, AVFoundation on macOS and Media Foundation on Windows.
//! Frames are decoded to packed RGB.

use std::time::Instant;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use crate::camera::backend::{CameraSource, CameraStream};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CameraIndex, ChannelOrder, Frame};

/// Opens a real camera by index.
pub struct NativeSource {
    index: CameraIndex,
}

impl NativeSource {
    pub fn new(index: CameraIndex) -> Self {
        Self { index }
    }
}

impl CameraSource for NativeSource {
    fn index(&self) -> CameraIndex {
        self.index
    }

    fn open(&self) -> Result<Box<dyn CameraStream>> {
        let unavailable = |reason: String| CameraError::DeviceUnavailable {
            index: self.index.as_u32(),
            reason,
        };

        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(
            nokhwa::utils::CameraIndex::Index(self.index.as_u32()),
            requested,
        )
        .map_err(|e| unavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| unavailable(e.to_string()))?;

        let resolution = camera.resolution();
        tracing::info!(
            "camera {} opened: {} ({}x{})",
            self.index,
            camera.info().human_name(),
            resolution.width(),
            resolution.height()
        );

        Ok(Box::new(NativeStream {
            camera,
            opened_at: Instant::now(),
        }))
    }
}

struct NativeStream {
    camera: Camera,
    opened_at: Instant,
}

impl CameraStream for NativeStream {
    fn read_frame(&mut self) -> Result<Frame> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CameraError::ReadFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::InvalidFrame(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());

        Ok(Frame {
            data: decoded.into_raw(),
            width,
            height,
            order: ChannelOrder::Rgb,
            timestamp_us: self.opened_at.elapsed().as_micros() as u64,
        })
    }

    fn release(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("failed to stop camera stream: {e}");
        }
    }
}
