//! Client for a DeepFace-compatible analysis service.
//!
//! Frames are sent as base64 JPEG data URIs to `POST {endpoint}/analyze`; the
//! service answers with `{"results": [...]}`, one entry per detected face.

use std::sync::OnceLock;
use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::camera::types::Frame;
use crate::classify::backend::EmotionClassifier;
use crate::classify::error::{ClassifyError, Result};
use crate::classify::types::{Action, AnalyzeRequest, FaceAnalysis};
use crate::preview::compress;

const JPEG_QUALITY: u8 = 90;

/// Longest error body kept in a [`ClassifyError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct AnalyzeBody<'a> {
    img: String,
    actions: &'a [Action],
    enforce_detection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detector_backend: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnalyzeResponse {
    Wrapped { results: Vec<FaceAnalysis> },
    Bare(Vec<FaceAnalysis>),
}

impl AnalyzeResponse {
    fn into_results(self) -> Vec<FaceAnalysis> {
        match self {
            Self::Wrapped { results } | Self::Bare(results) => results,
        }
    }
}

/// Classifier backed by an HTTP analysis service.
///
/// The blocking client is built on first use so that it is created (and
/// later dropped) on the capture thread rather than inside the async runtime.
pub struct HttpClassifier {
    endpoint: String,
    timeout: Duration,
    max_upload_width: u32,
    detector_backend: Option<String>,
    min_face_confidence: Option<f32>,
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            endpoint,
            timeout,
            max_upload_width: 0,
            detector_backend: None,
            min_face_confidence: None,
            client: OnceLock::new(),
        }
    }

    /// Downscale frames wider than `width` before upload. `0` disables.
    pub fn with_max_upload_width(mut self, width: u32) -> Self {
        self.max_upload_width = width;
        self
    }

    pub fn with_detector_backend(mut self, backend: Option<String>) -> Self {
        self.detector_backend = backend.filter(|b| !b.is_empty());
        self
    }

    /// Drop results whose face confidence is below `threshold`.
    ///
    /// Without enforced detection the service reports the whole frame with
    /// confidence 0 when it finds no face.
    pub fn with_min_face_confidence(mut self, threshold: Option<f32>) -> Self {
        self.min_face_confidence = threshold;
        self
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        let _ = self.client.set(client);
        self.client
            .get()
            .ok_or_else(|| ClassifyError::Transport("HTTP client unavailable".to_string()))
    }

    /// Encode the frame as an RGB JPEG data URI, downscaling if configured.
    fn encode_frame(&self, frame: &Frame) -> Result<String> {
        if !frame.is_well_formed() {
            return Err(ClassifyError::Encode(format!(
                "{} bytes for {}x{} frame",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }
        let rgb = frame.clone().into_rgb();
        let (data, width, height) =
            compress::downscale_rgb(&rgb.data, rgb.width, rgb.height, self.max_upload_width)
                .map_err(|e| ClassifyError::Encode(e.to_string()))?;
        let jpeg = compress::compress_jpeg(&data, width, height, JPEG_QUALITY)
            .map_err(|e| ClassifyError::Encode(e.to_string()))?;

        Ok(format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(jpeg)
        ))
    }

    fn postprocess(&self, results: Vec<FaceAnalysis>) -> Vec<FaceAnalysis> {
        results
            .into_iter()
            .filter(|r| match (self.min_face_confidence, r.face_confidence) {
                (Some(min), Some(confidence)) => confidence >= min,
                _ => true,
            })
            .collect()
    }
}

/// Shorten `text` to at most `max` bytes without splitting a character.
fn truncate_on_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let cut = (0..=max)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    text.truncate(cut);
}

impl EmotionClassifier for HttpClassifier {
    fn name(&self) -> &str {
        "http"
    }

    fn analyze(&self, frame: &Frame, request: &AnalyzeRequest) -> Result<Vec<FaceAnalysis>> {
        let img = self.encode_frame(frame)?;
        let body = AnalyzeBody {
            img,
            actions: &request.actions,
            enforce_detection: request.enforce_detection,
            detector_backend: self.detector_backend.as_deref(),
        };

        let response = self
            .client()?
            .post(format!("{}/analyze", self.endpoint))
            .json(&body)
            .send()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().unwrap_or_default();
            truncate_on_char_boundary(&mut text, MAX_ERROR_BODY);
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: AnalyzeResponse = response
            .json()
            .map_err(|e| ClassifyError::Response(e.to_string()))?;
        Ok(self.postprocess(parsed.into_results()))
    }
}
