//! The trim executor: one trim in, one clip out.

use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use cliptrim_common::error::ClipResult;
use cliptrim_model::trim::TrimParams;

use crate::command::{build_trim_args, INPUT_NAME, OUTPUT_NAME};
use crate::engine::{EngineLoader, ProgressFn, TranscodeEngine};

/// Runs trims against a lazily loaded, shared transcode engine.
///
/// The engine is loaded on the first [`run`](Self::run). Callers that arrive
/// while loading is in progress wait for that load instead of starting
/// another. A failed load leaves the executor unloaded, so the next run
/// tries again and fails the same way until the engine becomes available.
pub struct TrimExecutor {
    loader: Arc<dyn EngineLoader>,
    engine: OnceCell<Arc<dyn TranscodeEngine>>,
    // Workspace names are fixed, so invocations must not overlap.
    invocation: Mutex<()>,
}

impl TrimExecutor {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            engine: OnceCell::new(),
            invocation: Mutex::new(()),
        }
    }

    /// Whether the engine has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    /// Load the engine if needed and return it.
    pub async fn engine(&self) -> ClipResult<Arc<dyn TranscodeEngine>> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                tracing::info!("Loading transcode engine");
                let loaded = self.loader.load().await;
                if let Err(err) = &loaded {
                    tracing::error!(error = %err, "Transcode engine failed to load");
                }
                loaded
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Extract the range described by `params` from `source`.
    ///
    /// Progress samples are forwarded to `on_progress` exactly as the engine
    /// emits them. Input and output are removed from the engine workspace
    /// whether or not the command succeeds.
    pub async fn run(
        &self,
        source: &[u8],
        params: &TrimParams,
        on_progress: &ProgressFn,
    ) -> ClipResult<Vec<u8>> {
        let engine = self.engine().await?;
        let _guard = self.invocation.lock().await;

        let args = build_trim_args(params, INPUT_NAME, OUTPUT_NAME);
        tracing::info!(
            engine = engine.name(),
            mode = %params.mode,
            start_secs = params.start_secs,
            duration_secs = params.duration_secs,
            fps = params.fps,
            source_bytes = source.len(),
            "Starting trim"
        );

        let started = std::time::Instant::now();
        let result = invoke(engine.as_ref(), source, &args, on_progress).await;

        for name in [INPUT_NAME, OUTPUT_NAME] {
            if let Err(err) = engine.delete_file(name).await {
                tracing::warn!(file = name, error = %err, "Failed to clean engine workspace");
            }
        }

        match &result {
            Ok(output) => tracing::info!(
                output_bytes = output.len(),
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Trim finished"
            ),
            Err(err) => tracing::warn!(error = %err, "Trim failed"),
        }
        result
    }
}

async fn invoke(
    engine: &dyn TranscodeEngine,
    source: &[u8],
    args: &[String],
    on_progress: &ProgressFn,
) -> ClipResult<Vec<u8>> {
    engine.write_file(INPUT_NAME, source).await?;
    engine.exec(args, on_progress).await?;
    engine.read_file(OUTPUT_NAME).await
}
