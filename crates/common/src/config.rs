//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SlidecastError, SlidecastResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Frame output settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Narration request settings.
    #[serde(default)]
    pub narration: NarrationConfig,

    /// Media encoder settings.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Frame output parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Frames per second of the rendered stream.
    pub fps: u32,

    /// Frame target width in pixels.
    pub width: u32,

    /// Frame target height in pixels.
    pub height: u32,

    /// Wait after the last frame before the recorder is stopped.
    pub trailing_margin_ms: u64,
}

/// Parameters passed along with every narration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationConfig {
    /// Whether narration requests are dispatched at all.
    pub enabled: bool,

    /// Speaking rate multiplier (1.0 = engine default).
    pub rate: f32,

    /// Pitch multiplier (1.0 = engine default).
    pub pitch: f32,

    /// Volume in `[0.0, 1.0]`.
    pub volume: f32,

    /// Speech command to spawn (e.g. "espeak-ng", "espeak").
    pub command: String,

    /// Engine speed in words per minute at `rate = 1.0`.
    pub base_words_per_minute: u32,
}

/// Media encoder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Path or name of the ffmpeg binary.
    pub ffmpeg_path: String,

    /// Container formats in order of preference (e.g. "webm-vp9").
    pub preferred_formats: Vec<String>,

    /// Maximum bytes read from the encoder per emitted chunk.
    pub chunk_size_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slidecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 1280,
            height: 720,
            trailing_margin_ms: 1000,
        }
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
            command: "espeak-ng".to_string(),
            base_words_per_minute: 175,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            preferred_formats: vec!["webm-vp9".to_string(), "webm-vp8".to_string()],
            chunk_size_bytes: 64 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> SlidecastResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> SlidecastResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> SlidecastResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings the encoder or render loop cannot work with.
    pub fn validate(&self) -> SlidecastResult<()> {
        if self.render.fps == 0 {
            return Err(SlidecastError::config("render.fps must be non-zero"));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(SlidecastError::config(
                "render.width/height must be non-zero",
            ));
        }
        if self.render.width % 2 != 0 || self.render.height % 2 != 0 {
            // yuv420p output needs even dimensions.
            return Err(SlidecastError::config(format!(
                "render size must be even, got {}x{}",
                self.render.width, self.render.height
            )));
        }
        if self.encoder.preferred_formats.is_empty() {
            return Err(SlidecastError::config(
                "encoder.preferred_formats must list at least one format",
            ));
        }
        if self.encoder.chunk_size_bytes == 0 {
            return Err(SlidecastError::config(
                "encoder.chunk_size_bytes must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("slidecast").join("config.json")
}
