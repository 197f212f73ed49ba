//! Trim files and export the clips.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use cliptrim_common::config::AppConfig;
use cliptrim_common::error::ClipResult;
use cliptrim_common::timecode::format_timecode;
use cliptrim_engine::{FfmpegLoader, TrimExecutor};
use cliptrim_export::{
    DirectoryHandle, DownloadsFolder, ExportPipeline, ExportQueue, FsDirectory, NamingResolver,
    PersistenceStrategy, QueueConfig, QueueSnapshot, QueueView, TaskSnapshot, TrimRequest,
};
use cliptrim_model::media::{filter_sources, SourceMedia, ACCEPTED_EXTENSIONS};
use cliptrim_model::task::{TaskId, TaskStatus};
use cliptrim_model::trim::{ExportMode, TrimParams};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Source video files; unsupported files are skipped
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Start of the clip (seconds)
    #[arg(short, long, default_value = "0")]
    start: f64,

    /// Clip length (seconds); defaults to the saved duration
    #[arg(short, long)]
    duration: Option<f64>,

    /// Export mode: fast|precise
    #[arg(short, long)]
    mode: Option<String>,

    /// Output frame rate for precise mode
    #[arg(long)]
    fps: Option<u32>,

    /// Skip directory writes and save every clip as a download
    #[arg(long, conflicts_with = "out_dir")]
    download: bool,

    /// Directory to write clips into (defaults to each source's directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Print the final task list as JSON
    #[arg(long)]
    json: bool,
}

/// How one requested export ended.
#[derive(Debug)]
struct ExportOutcome {
    source: String,
    result: ClipResult<TaskSnapshot>,
}

impl ExportOutcome {
    fn is_failure(&self) -> bool {
        match &self.result {
            Ok(task) => task.status != TaskStatus::Completed,
            Err(_) => true,
        }
    }
}

#[derive(Serialize)]
struct LostExport<'a> {
    source: &'a str,
    error: String,
}

#[derive(Serialize)]
struct ExportReport<'a> {
    view: QueueView,
    tasks: Vec<&'a TaskSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    lost: Vec<LostExport<'a>>,
}

pub async fn run(config: &mut AppConfig, args: ExportArgs) -> anyhow::Result<()> {
    let sources = filter_sources(&args.files);
    if sources.is_empty() {
        anyhow::bail!(
            "No supported video files given (accepted: {})",
            ACCEPTED_EXTENSIONS.join(", ")
        );
    }

    let mode: ExportMode = match &args.mode {
        Some(mode) => mode.parse()?,
        None => config.trim.mode.parse()?,
    };
    let duration = args
        .duration
        .unwrap_or_else(|| config.trim.initial_duration());
    let fps = args.fps.unwrap_or(config.trim.fps);
    let params = TrimParams::new(args.start, duration, mode, fps);
    params.validate()?;

    if config.trim.duration_locked && args.duration.is_some() {
        config.trim.save_duration(duration);
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "Failed to remember clip duration");
        }
    }

    let mut requests = Vec::with_capacity(sources.len());
    for path in &sources {
        let source = SourceMedia::load(path)?;
        let directory = target_directory(path, args.out_dir.as_deref(), args.download);
        requests.push(TrimRequest::new(source, params, directory)?);
    }

    let loader = Arc::new(FfmpegLoader::new(&config.engine.ffmpeg_path));
    let executor = Arc::new(TrimExecutor::new(loader));
    let persistence = PersistenceStrategy::new(
        Arc::new(NamingResolver::new()),
        Arc::new(DownloadsFolder::new(&config.export.downloads_dir)),
    )
    .with_subdir(&config.export.subdir);
    let queue = ExportQueue::spawn(
        ExportPipeline::new(executor, persistence),
        QueueConfig::from_settings(&config.export),
    );

    println!(
        "Exporting {} clip(s): {} to {}, mode {mode}",
        requests.len(),
        format_timecode(params.start_secs),
        format_timecode(params.end_secs()),
    );

    let outcomes = export_all(&queue, requests).await;
    println!();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report(&outcomes))?);
    } else {
        for outcome in &outcomes {
            print_outcome(outcome);
        }
    }

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} export(s) failed", outcomes.len());
    }
    Ok(())
}

/// Queue every request and wait for each one's final state, in request order.
///
/// Outcomes are requested right after enqueueing, so tasks that finish and
/// get reaped early are still reported.
async fn export_all(queue: &ExportQueue, requests: Vec<TrimRequest>) -> Vec<ExportOutcome> {
    let mut ids = Vec::with_capacity(requests.len());
    let mut pending = Vec::with_capacity(requests.len());
    for request in requests {
        let source = request.source.name().to_string();
        let id = queue.enqueue(request);
        pending.push((source, queue.outcome(&id)));
        ids.push(id);
    }

    let renderer = tokio::spawn(render_progress(queue.clone(), ids));
    let mut outcomes = Vec::with_capacity(pending.len());
    for (source, outcome) in pending {
        outcomes.push(ExportOutcome {
            source,
            result: outcome.await,
        });
    }
    renderer.abort();
    outcomes
}

fn report(outcomes: &[ExportOutcome]) -> ExportReport<'_> {
    let mut tasks = Vec::new();
    let mut lost = Vec::new();
    for outcome in outcomes {
        match &outcome.result {
            Ok(task) => tasks.push(task),
            Err(e) => lost.push(LostExport {
                source: &outcome.source,
                error: e.to_string(),
            }),
        }
    }
    let view = QueueView::from_snapshot(&QueueSnapshot {
        tasks: tasks.iter().map(|task| (*task).clone()).collect(),
    });
    ExportReport { view, tasks, lost }
}

/// Where a source's clip should be written, if anywhere.
fn target_directory(
    source: &Path,
    out_dir: Option<&Path>,
    download: bool,
) -> Option<Arc<dyn DirectoryHandle>> {
    if download {
        return None;
    }
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };
    Some(Arc::new(FsDirectory::new(dir)))
}

async fn render_progress(queue: ExportQueue, ids: Vec<TaskId>) {
    let mut updates = queue.subscribe();
    let mut last: Option<(TaskId, u8)> = None;
    while updates.changed().await.is_ok() {
        let line = {
            let snapshot = updates.borrow();
            let Some(task) = snapshot.active() else {
                continue;
            };
            let Some(index) = ids.iter().position(|id| id == &task.id) else {
                continue;
            };
            let key = (task.id.clone(), task.progress);
            if last.as_ref() == Some(&key) {
                continue;
            }
            last = Some(key);
            format!(
                "\r  [{}/{}] {}: {:>3}% {} processed   ",
                index + 1,
                ids.len(),
                task.source_name,
                task.progress,
                format_timecode(task.processed_secs),
            )
        };
        print!("{line}");
        let _ = std::io::stdout().flush();
    }
}

fn print_outcome(outcome: &ExportOutcome) {
    let task = match &outcome.result {
        Ok(task) => task,
        Err(e) => {
            println!("[FAIL] {}: {e}", outcome.source);
            return;
        }
    };
    match task.status {
        TaskStatus::Completed => println!(
            "[OK]   {} -> {} ({})",
            task.source_name,
            task.filename.as_deref().unwrap_or("?"),
            task.saved_to
                .map(|l| l.to_string())
                .unwrap_or_default(),
        ),
        TaskStatus::Failed => println!(
            "[FAIL] {}: {}",
            task.source_name,
            task.error.as_deref().unwrap_or("unknown error")
        ),
        status => println!("[WARN] {}: still {status}", task.source_name),
    }
}
