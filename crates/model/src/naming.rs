//! The `{sequence}_{seconds}s.mp4` output naming convention.
//!
//! Exported clips are named with a sequence number followed by the rounded
//! clip length, e.g. `12_5s.mp4`. Names sort by recency and never collide
//! within one export directory.

use std::fmt;

use crate::media::OUTPUT_EXTENSION;

/// A parsed export file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExportName {
    pub sequence: u64,
    pub seconds: u64,
}

impl ExportName {
    pub fn new(sequence: u64, seconds: u64) -> Self {
        Self { sequence, seconds }
    }

    /// Parse a file name that matches `^\d+_\d+s\.mp4$` exactly.
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name
            .strip_suffix(OUTPUT_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))?;
        let (sequence, seconds) = stem.split_once('_')?;
        let seconds = seconds.strip_suffix('s')?;
        Some(Self {
            sequence: parse_digits(sequence)?,
            seconds: parse_digits(seconds)?,
        })
    }
}

impl fmt::Display for ExportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}s.{}", self.sequence, self.seconds, OUTPUT_EXTENSION)
    }
}

/// Unsigned ASCII digits only; no sign, no whitespace.
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
