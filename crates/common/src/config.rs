//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Transcode engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Where and how finished clips are written.
    #[serde(default)]
    pub export: ExportSettings,

    /// Remembered trim parameters.
    #[serde(default)]
    pub trim: TrimDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transcode engine location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path (or bare name resolved through `PATH`) of the ffmpeg binary.
    pub ffmpeg_path: PathBuf,
}

/// Export placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Subdirectory created inside the target directory for exported clips.
    pub subdir: String,

    /// Folder that receives fallback downloads.
    pub downloads_dir: PathBuf,

    /// How long finished tasks stay visible before they are reaped.
    pub reap_delay_ms: u64,
}

/// Trim parameters remembered between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimDefaults {
    /// Clip length used when none is given.
    pub duration_secs: f64,

    /// Keep `duration_secs` when switching sources instead of resetting it.
    pub duration_locked: bool,

    /// Default export mode ("fast" or "precise").
    pub mode: String,

    /// Default frame rate for precise exports.
    pub fps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cliptrim=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Clip length used when nothing has been saved or the lock is off.
pub const DEFAULT_CLIP_SECS: f64 = 10.0;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            subdir: "export".to_string(),
            downloads_dir: default_downloads_dir(),
            reap_delay_ms: 3000,
        }
    }
}

impl Default for TrimDefaults {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_CLIP_SECS,
            duration_locked: false,
            mode: "fast".to_string(),
            fps: 30,
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

impl TrimDefaults {
    /// Duration to start a freshly selected source with.
    ///
    /// A locked duration is carried over; otherwise every new source starts
    /// at the stock clip length.
    pub fn initial_duration(&self) -> f64 {
        if self.duration_locked && self.duration_secs.is_finite() && self.duration_secs > 0.0 {
            self.duration_secs
        } else {
            DEFAULT_CLIP_SECS
        }
    }

    /// Remember `duration_secs` and lock it.
    pub fn save_duration(&mut self, duration_secs: f64) {
        self.duration_secs = duration_secs;
        self.duration_locked = true;
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to `path`.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("cliptrim").join("config.json")
}

/// Default folder for fallback downloads.
fn default_downloads_dir() -> PathBuf {
    std::env::var("XDG_DOWNLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join("Downloads"))
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
}
