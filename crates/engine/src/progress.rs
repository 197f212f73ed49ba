//! Parsing of ffmpeg `-progress` output.
//!
//! ffmpeg writes blocks of `key=value` lines and terminates each block with
//! `progress=continue` or `progress=end`. One sample is emitted per block.

use cliptrim_model::task::ProgressSample;

#[derive(Debug, Default)]
pub(crate) struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    /// Feed one `key=value` pair. Returns a sample when a block ends.
    pub(crate) fn update(
        &mut self,
        key: &str,
        value: &str,
        expected_duration_secs: Option<f64>,
    ) -> Option<ProgressSample> {
        match key {
            // Despite the name, ffmpeg reports microseconds here.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    if us.is_finite() && us >= 0.0 {
                        self.out_time_secs = us / 1_000_000.0;
                    }
                }
                None
            }
            "progress" => {
                self.complete = value == "end";
                Some(self.sample(expected_duration_secs))
            }
            _ => None,
        }
    }

    fn sample(&self, expected_duration_secs: Option<f64>) -> ProgressSample {
        let ratio = if self.complete {
            1.0
        } else {
            match expected_duration_secs {
                Some(total) if total > 0.0 => (self.out_time_secs / total).clamp(0.0, 1.0),
                _ => 0.0,
            }
        };
        ProgressSample::new(ratio, self.out_time_secs)
    }
}

/// Split a progress line into its key and value.
pub(crate) fn parse_progress_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.split_once('=')
}
