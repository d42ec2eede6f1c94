use serde::Serialize;
use std::time::{Duration, Instant};

/// Collects statistics for a detection session.
pub struct LoopStats {
    frame_count: u64,
    no_subject_count: u64,
    total_bytes: u64,
    start_time: Instant,
    inference_us: u64,
    total_inference_us: u64,
}

/// Snapshot of loop stats for IPC serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopSnapshot {
    pub fps: f64,
    pub frame_count: u64,
    pub no_subject_count: u64,
    pub no_subject_rate: f64,
    pub inference_ms: f64,
    pub avg_inference_ms: f64,
    pub bandwidth_bps: u64,
}

impl LoopStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            no_subject_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            inference_us: 0,
            total_inference_us: 0,
        }
    }

    /// Record a frame that went through the whole cycle.
    pub fn record_frame(&mut self, bytes: usize, inference: Duration, had_subject: bool) {
        self.frame_count += 1;
        self.total_bytes += bytes as u64;
        self.inference_us = inference.as_micros() as u64;
        self.total_inference_us += self.inference_us;
        if !had_subject {
            self.no_subject_count += 1;
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Calculate current FPS based on elapsed time.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frame_count as f64 / elapsed
    }

    /// Share of frames without a subject, as a percentage (0.0 - 100.0).
    pub fn no_subject_rate(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        (self.no_subject_count as f64 / self.frame_count as f64) * 100.0
    }

    /// Latest classifier latency in milliseconds.
    pub fn inference_ms(&self) -> f64 {
        self.inference_us as f64 / 1000.0
    }

    /// Mean classifier latency in milliseconds.
    pub fn avg_inference_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.total_inference_us as f64 / self.frame_count as f64 / 1000.0
    }

    /// Captured bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            fps: self.fps(),
            frame_count: self.frame_count,
            no_subject_count: self.no_subject_count,
            no_subject_rate: self.no_subject_rate(),
            inference_ms: self.inference_ms(),
            avg_inference_ms: self.avg_inference_ms(),
            bandwidth_bps: self.bandwidth_bps(),
        }
    }
}

impl Default for LoopStats {
    fn default() -> Self {
        Self::new()
    }
}
