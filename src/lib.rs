mod camera;
mod classify;
mod config;
mod diagnostics;
mod overlay;
mod pipeline;
mod preview;

use tauri::Manager;

use camera::backend::CameraSource;
use classify::backend::EmotionClassifier;
use config::{AppConfig, CameraConfig, ClassifierConfig, ConfigState};
use preview::commands::{
    get_diagnostics, get_frame, get_status, start_detection, stop_detection, DetectionState,
};

/// Create the camera source for the configured device.
///
/// When `DUMMY_CAMERA=1` is set, a simulated camera is used instead.
pub(crate) fn create_camera_source(config: &CameraConfig) -> Box<dyn CameraSource> {
    if config.dummy {
        let mut source = camera::dummy::DummySource::new(config.index())
            .with_fail_after(config.dummy_fail_after);
        if let Some([width, height]) = config.dummy_resolution {
            source = source.with_size(width, height);
        }
        return Box::new(source);
    }

    #[cfg(feature = "native")]
    {
        Box::new(camera::native::NativeSource::new(config.index()))
    }

    #[cfg(not(feature = "native"))]
    {
        Box::new(NullSource(config.index()))
    }
}

/// Create the emotion classifier.
///
/// When `DUMMY_CLASSIFIER=1` is set, labels are cycled locally instead of
/// calling the analysis service.
pub(crate) fn create_classifier(config: &ClassifierConfig) -> Box<dyn EmotionClassifier> {
    if config.dummy {
        return Box::new(classify::dummy::DummyClassifier::new());
    }
    Box::new(
        classify::http::HttpClassifier::new(config.endpoint.clone(), config.timeout())
            .with_max_upload_width(config.max_upload_width)
            .with_detector_backend(config.detector_backend.clone())
            .with_min_face_confidence(config.min_face_confidence),
    )
}

/// Source used on builds without a native capture backend.
#[cfg(not(feature = "native"))]
struct NullSource(camera::types::CameraIndex);

#[cfg(not(feature = "native"))]
impl CameraSource for NullSource {
    fn index(&self) -> camera::types::CameraIndex {
        self.0
    }

    fn open(&self) -> camera::error::Result<Box<dyn camera::backend::CameraStream>> {
        Err(camera::error::CameraError::NoBackend)
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            if let Some(window) = app.get_webview_window("main") {
                let _ = window.show();
                let _ = window.set_focus();
            }
        }))
        .manage(DetectionState::new())
        .invoke_handler(tauri::generate_handler![
            start_detection,
            stop_detection,
            get_frame,
            get_status,
            get_diagnostics,
        ])
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::new()
                        .targets([
                            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Stdout),
                            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Webview),
                            tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::LogDir {
                                file_name: None,
                            }),
                        ])
                        .level(log::LevelFilter::Debug)
                        .build(),
                )?;
            }

            let config_dir = app.path().app_config_dir().ok();
            let config = AppConfig::load(config_dir.as_deref());
            tracing::info!(
                "camera {} ({}), classifier {}",
                config.camera.index,
                if config.camera.dummy { "dummy" } else { "device" },
                if config.classifier.dummy {
                    "dummy"
                } else {
                    config.classifier.endpoint.as_str()
                }
            );
            app.manage(ConfigState { config });

            Ok(())
        })
        .on_window_event(|window, event| {
            // Release the camera before the main window goes away.
            if window.label() == "main" {
                if let tauri::WindowEvent::CloseRequested { .. } = event {
                    window.state::<DetectionState>().stop();
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
