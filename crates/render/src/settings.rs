use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors from loading or validating render settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Rendering server configuration, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Initial window extent in pixels.
    pub window_size: [u32; 2],
    pub window_title: String,
    /// Skip drawables whose bounds miss the camera frustum.
    pub frustum_culling: bool,
    /// Draw in ascending render-key order instead of registration order.
    pub sort_by_render_key: bool,
    pub clear_color: [f32; 4],
    /// Stop the main loop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            window_size: [1280, 720],
            window_title: "lumen".to_string(),
            frustum_culling: true,
            sort_by_render_key: true,
            clear_color: [0.05, 0.05, 0.08, 1.0],
            max_frames: None,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [w, h] = self.window_size;
        if w == 0 || h == 0 {
            return Err(ConfigError::Invalid(format!(
                "window_size must be non-zero, got {w}x{h}"
            )));
        }
        if self.max_frames == Some(0) {
            return Err(ConfigError::Invalid("max_frames must be at least 1".into()));
        }
        Ok(())
    }

    /// Save settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.validate()?;
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load and validate settings from JSON. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let settings: Self = serde_json::from_reader(file)?;
        settings.validate()?;
        Ok(settings)
    }
}
