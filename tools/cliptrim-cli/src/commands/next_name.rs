//! Preview the name of the next clip in a directory.

use std::path::PathBuf;

use cliptrim_common::config::AppConfig;
use cliptrim_export::{FsDirectory, NamingResolver};

pub async fn run(config: &AppConfig, dir: PathBuf, duration: f64) -> anyhow::Result<()> {
    if !duration.is_finite() || duration <= 0.0 {
        anyhow::bail!("duration must be positive, got {duration}");
    }

    // Scan without creating the export subdirectory.
    let export_dir = FsDirectory::new(dir.join(&config.export.subdir));
    let name = NamingResolver::new()
        .next_in_directory(&export_dir, duration)
        .await?;
    println!("{name}");
    Ok(())
}
