//! Task identity, lifecycle status, and progress samples.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, unique task identifier. Stable for the task's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of an export task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for its turn.
    Pending,
    /// Being transcoded and saved. At most one task holds this state.
    Processing,
    /// Saved; carries the output file name.
    Completed,
    /// Gave up; carries the error text.
    Failed,
}

impl TaskStatus {
    /// Completed and failed tasks never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress report from the transcode engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Fraction complete, `[0.0, 1.0]`.
    pub ratio: f64,

    /// Seconds of output processed so far.
    pub time_secs: f64,
}

impl ProgressSample {
    pub fn new(ratio: f64, time_secs: f64) -> Self {
        Self { ratio, time_secs }
    }

    /// Ratio quantized to a whole percentage in `0..=100`.
    pub fn percent(&self) -> u8 {
        if !self.ratio.is_finite() {
            return 0;
        }
        (self.ratio * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

/// Where a finished clip ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedLocation {
    /// Written into the export subdirectory of the target directory.
    Directory,
    /// Handed to the download fallback.
    Download,
}

impl fmt::Display for SavedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Directory => "directory",
            Self::Download => "download",
        })
    }
}
