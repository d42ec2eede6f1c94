//! Application configuration.
//!
//! Read from `emotion-cam.json` in the app config directory when present,
//! then overridden by environment variables. Nothing is ever written back.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::camera::dummy::DummySource;
use crate::camera::types::CameraIndex;
use crate::classify::dummy::DummyClassifier;
use crate::overlay::OverlayStyle;

/// File name looked up in the app config directory.
pub const CONFIG_FILE_NAME: &str = "emotion-cam.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

/// Settings for the HTTP emotion classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of the analysis service.
    pub endpoint: String,
    pub timeout_ms: u64,
    /// Frames wider than this are downscaled before upload; 0 disables.
    pub max_upload_width: u32,
    pub detector_backend: Option<String>,
    pub min_face_confidence: Option<f32>,
    /// Use the built-in dummy classifier instead of the service.
    pub dummy: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5005".to_string(),
            timeout_ms: 10_000,
            max_upload_width: 640,
            detector_backend: None,
            min_face_confidence: None,
            dummy: false,
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for the camera source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    /// Use the simulated camera instead of a real device.
    pub dummy: bool,
    /// Make the simulated camera fail after this many frames.
    pub dummy_fail_after: Option<u64>,
    /// Frame size of the simulated camera, `[width, height]`.
    pub dummy_resolution: Option<[u32; 2]>,
}

impl CameraConfig {
    pub fn index(&self) -> CameraIndex {
        CameraIndex::new(self.index)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
    pub overlay: OverlayStyle,
    /// JPEG quality for frames sent to the webview (1-100).
    pub preview_quality: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            classifier: ClassifierConfig::default(),
            overlay: OverlayStyle::default(),
            preview_quality: 85,
        }
    }
}

impl AppConfig {
    /// Load from a JSON file, returning default on missing file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config.sanitized())
    }

    /// Clamp values that the renderer cannot use as given.
    fn sanitized(mut self) -> Self {
        self.overlay = self.overlay.clamped();
        self
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Each variable is applied on its own; invalid ones are skipped and
    /// returned so the caller can report them.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        if let Some(index) = parse_env(&lookup, "EMOTION_CAM_CAMERA_INDEX", &mut errors) {
            self.camera.index = index;
        }
        if let Some(ms) = parse_env(&lookup, "EMOTION_CAM_CLASSIFIER_TIMEOUT_MS", &mut errors) {
            self.classifier.timeout_ms = ms;
        }
        if let Some(frames) = parse_env(&lookup, "DUMMY_CAMERA_FAIL_AFTER", &mut errors) {
            self.camera.dummy_fail_after = Some(frames);
        }
        if let Some(url) = lookup("EMOTION_CAM_CLASSIFIER_URL") {
            self.classifier.endpoint = url;
        }
        if lookup("DUMMY_CAMERA").is_some_and(|v| is_truthy(&v)) {
            self.camera.dummy = true;
        }
        if lookup("DUMMY_CLASSIFIER").is_some_and(|v| is_truthy(&v)) {
            self.classifier.dummy = true;
        }
        errors
    }

    /// Load the config file (if any) and apply process environment overrides.
    ///
    /// Errors are logged and the offending layer is skipped.
    pub fn load(dir: Option<&Path>) -> Self {
        let mut config = match dir.map(|d| d.join(CONFIG_FILE_NAME)) {
            Some(path) => Self::load_file(&path).unwrap_or_else(|e| {
                tracing::warn!("{e}; using defaults");
                Self::default()
            }),
            None => Self::default(),
        };
        for e in config.apply_env(|k| std::env::var(k).ok()) {
            tracing::warn!("ignoring environment override: {e}");
        }
        // Keep the backends' own switches authoritative.
        config.camera.dummy |= DummySource::is_enabled();
        config.classifier.dummy |= DummyClassifier::is_enabled();
        config
    }
}

/// Managed state holding the configuration loaded at startup.
pub struct ConfigState {
    pub config: AppConfig,
}

fn is_truthy(v: &str) -> bool {
    v == "1" || v == "true"
}

/// Parse a numeric variable, recording a `ConfigError` if it is malformed.
fn parse_env<T, F>(lookup: &F, var: &'static str, errors: &mut Vec<ConfigError>) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(ConfigError::Env { var, value });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_demo_behaviour() {
        let config = AppConfig::default();
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.overlay.origin, (50, 50));
        assert_eq!(config.overlay.color, [0, 255, 0]);
        assert!(!config.camera.dummy);
        assert!(!config.classifier.dummy);
    }

    #[test]
    fn load_file_returns_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_file(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_file_merges_partial_json_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "camera": {"index": 2},
                "classifier": {"endpoint": "http://gpu-box:5005", "min_face_confidence": 0.4},
                "overlay": {"color": [255, 0, 0]}
            }"#,
        )
        .unwrap();

        let config = AppConfig::load_file(&path).unwrap();
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.classifier.endpoint, "http://gpu-box:5005");
        assert_eq!(config.classifier.min_face_confidence, Some(0.4));
        assert_eq!(config.classifier.timeout_ms, 10_000);
        assert_eq!(config.overlay.color, [255, 0, 0]);
        assert_eq!(config.overlay.origin, (50, 50));
        assert_eq!(config.preview_quality, 85);
    }

    #[test]
    fn load_file_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        let err = AppConfig::load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_env(env(&[
                ("EMOTION_CAM_CAMERA_INDEX", "1"),
                ("EMOTION_CAM_CLASSIFIER_URL", "http://localhost:9000"),
                ("EMOTION_CAM_CLASSIFIER_TIMEOUT_MS", "2500"),
                ("DUMMY_CAMERA", "true"),
                ("DUMMY_CAMERA_FAIL_AFTER", "30"),
                ("DUMMY_CLASSIFIER", "1"),
            ]))
            .is_empty());
        assert_eq!(config.camera.index, 1);
        assert_eq!(config.classifier.endpoint, "http://localhost:9000");
        assert_eq!(config.classifier.timeout(), Duration::from_millis(2500));
        assert!(config.camera.dummy);
        assert_eq!(config.camera.dummy_fail_after, Some(30));
        assert!(config.classifier.dummy);
    }

    #[test]
    fn env_rejects_non_numeric_index() {
        let mut config = AppConfig::default();
        let errors = config.apply_env(env(&[("EMOTION_CAM_CAMERA_INDEX", "front")]));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ConfigError::Env {
                var: "EMOTION_CAM_CAMERA_INDEX",
                ..
            }
        ));
        assert_eq!(config.camera.index, 0);
    }

    #[test]
    fn bad_variable_does_not_block_later_overrides() {
        let mut config = AppConfig::default();
        let errors = config.apply_env(env(&[
            ("EMOTION_CAM_CLASSIFIER_TIMEOUT_MS", "abc"),
            ("DUMMY_CAMERA_FAIL_AFTER", "5"),
            ("EMOTION_CAM_CAMERA_INDEX", "99999999999"),
            ("DUMMY_CAMERA", "1"),
        ]));
        assert_eq!(errors.len(), 2);
        assert_eq!(config.classifier.timeout_ms, 10_000);
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.camera.dummy_fail_after, Some(5));
        assert!(config.camera.dummy);
    }

    #[test]
    fn load_file_clamps_overlay_scale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"overlay": {"scale": 4000000000, "thickness": 0}}"#).unwrap();
        let config = AppConfig::load_file(&path).unwrap();
        assert_eq!(config.overlay.scale, 16);
        assert_eq!(config.overlay.thickness, 1);
    }

    #[test]
    fn falsy_dummy_flags_are_ignored() {
        let mut config = AppConfig::default();
        let errors = config.apply_env(env(&[("DUMMY_CAMERA", "0"), ("DUMMY_CLASSIFIER", "no")]));
        assert!(errors.is_empty());
        assert!(!config.camera.dummy);
        assert!(!config.classifier.dummy);
    }
}
