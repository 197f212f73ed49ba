//! Check that the transcode engine is usable.

use std::sync::Arc;

use cliptrim_common::config::{config_file_path, AppConfig};
use cliptrim_engine::{FfmpegLoader, TrimExecutor};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("ClipTrim System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }

    let executor = TrimExecutor::new(Arc::new(FfmpegLoader::new(&config.engine.ffmpeg_path)));
    let engine_ok = match executor.engine().await {
        Ok(engine) => {
            println!(
                "[OK] Engine: {} ({})",
                engine.name(),
                config.engine.ffmpeg_path.display()
            );
            true
        }
        Err(e) => {
            println!("[WARN] Engine: {e}");
            println!("       Install ffmpeg or set engine.ffmpeg_path in the config file.");
            false
        }
    };

    let downloads = &config.export.downloads_dir;
    if downloads.is_dir() {
        println!("[OK] Downloads folder: {}", downloads.display());
    } else {
        println!(
            "[WARN] Downloads folder: {} (will be created on first download)",
            downloads.display()
        );
    }
    println!("     Export subdirectory: {}", config.export.subdir);

    println!();
    if engine_ok {
        println!("ClipTrim is ready.");
        Ok(())
    } else {
        anyhow::bail!("transcode engine unavailable")
    }
}
