//! Export modes and trim parameters.

use std::fmt;
use std::str::FromStr;

use cliptrim_common::error::{ClipResult, ClipTrimError};
use serde::{Deserialize, Serialize};

/// How the clip is extracted from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Stream copy. Cut points snap to the nearest keyframe.
    #[default]
    Fast,
    /// Full re-encode. Frame-accurate, slower.
    Precise,
}

impl ExportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Precise => "precise",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = ClipTrimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "precise" => Ok(Self::Precise),
            other => Err(ClipTrimError::invalid_request(format!(
                "Unknown export mode: {other}. Use: fast, precise"
            ))),
        }
    }
}

/// The time range and encoding choice for one export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimParams {
    /// Seek offset into the source, in seconds.
    pub start_secs: f64,

    /// Length of the clip, in seconds.
    pub duration_secs: f64,

    /// Extraction strategy.
    pub mode: ExportMode,

    /// Output frame rate. Only used by [`ExportMode::Precise`].
    pub fps: u32,
}

impl TrimParams {
    pub fn new(start_secs: f64, duration_secs: f64, mode: ExportMode, fps: u32) -> Self {
        Self {
            start_secs,
            duration_secs,
            mode,
            fps,
        }
    }

    /// Reject parameters the transcode command cannot express.
    pub fn validate(&self) -> ClipResult<()> {
        if !self.start_secs.is_finite() || self.start_secs < 0.0 {
            return Err(ClipTrimError::invalid_request(format!(
                "start must be a non-negative number of seconds, got {}",
                self.start_secs
            )));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(ClipTrimError::invalid_request(format!(
                "duration must be positive, got {}",
                self.duration_secs
            )));
        }
        if self.fps == 0 {
            return Err(ClipTrimError::invalid_request("fps must be positive"));
        }
        Ok(())
    }

    /// End of the requested range in source time.
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// Round a clip length to whole seconds for naming.
///
/// Only the file name uses this; trim boundaries keep full precision.
pub fn round_duration_secs(duration_secs: f64) -> u64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 0;
    }
    duration_secs.round() as u64
}
