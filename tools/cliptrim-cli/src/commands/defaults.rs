//! Show or change the remembered trim defaults.

use cliptrim_common::config::{config_file_path, AppConfig};
use cliptrim_model::trim::ExportMode;

pub fn run(
    config: &mut AppConfig,
    duration: Option<f64>,
    lock: bool,
    unlock: bool,
) -> anyhow::Result<()> {
    let changed = duration.is_some() || lock || unlock;

    if let Some(duration) = duration {
        if !duration.is_finite() || duration <= 0.0 {
            anyhow::bail!("duration must be positive, got {duration}");
        }
        config.trim.save_duration(duration);
    }
    if lock {
        config.trim.duration_locked = true;
    }
    if unlock {
        config.trim.duration_locked = false;
    }

    if changed {
        config
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to save config: {e}"))?;
        tracing::info!(path = %config_file_path().display(), "Trim defaults saved");
    }

    let trim = &config.trim;
    let mode = trim.mode.parse::<ExportMode>().unwrap_or_default();
    println!("Trim defaults");
    let lock_state = if trim.duration_locked {
        "locked"
    } else {
        "unlocked"
    };
    println!("  Duration: {:.2}s ({lock_state})", trim.duration_secs);
    println!("  New sources start at: {:.2}s", trim.initial_duration());
    println!("  Mode: {mode}");
    println!("  FPS: {}", trim.fps);
    Ok(())
}
