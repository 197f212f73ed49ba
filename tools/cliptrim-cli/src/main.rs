//! ClipTrim CLI: trim video files into numbered clips.
//!
//! Usage:
//!   cliptrim export <FILES>...     Trim and export clips, one per file
//!   cliptrim check                 Check that the transcode engine loads
//!   cliptrim defaults              Show or change saved trim defaults
//!   cliptrim next-name <DIR>       Show the name the next clip would get

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cliptrim_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "cliptrim",
    about = "Trim video files into numbered clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trim each file and export the clips, one at a time
    Export(commands::export::ExportArgs),

    /// Check that the transcode engine can be loaded
    Check,

    /// Show or change the saved trim defaults
    Defaults {
        /// Remember this clip duration (seconds); implies --lock
        #[arg(long)]
        duration: Option<f64>,

        /// Keep the saved duration for new sources
        #[arg(long, conflicts_with = "unlock")]
        lock: bool,

        /// Start new sources at the stock duration again
        #[arg(long)]
        unlock: bool,
    },

    /// Print the file name the next clip would get in a directory
    NextName {
        /// Target directory (the export subdirectory inside it is scanned)
        dir: PathBuf,

        /// Clip duration in seconds
        #[arg(short, long)]
        duration: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    cliptrim_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Export(args) => commands::export::run(&mut config, args).await,
        Commands::Check => commands::check::run(&config).await,
        Commands::Defaults {
            duration,
            lock,
            unlock,
        } => commands::defaults::run(&mut config, duration, lock, unlock),
        Commands::NextName { dir, duration } => {
            commands::next_name::run(&config, dir, duration).await
        }
    }
}
