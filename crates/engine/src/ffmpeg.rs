//! ffmpeg-backed transcode engine.
//!
//! Each loaded engine owns a private temporary directory that plays the role
//! of the engine's virtual file system. Commands run with that directory as
//! their working directory, so relative names like `input.mp4` resolve
//! inside it.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use cliptrim_common::error::{ClipResult, ClipTrimError};

use crate::command::requested_duration;
use crate::engine::{validate_workspace_name, EngineLoader, ProgressFn, TranscodeEngine};
use crate::progress::{parse_progress_line, ProgressState};

/// Arguments placed before every command: overwrite silently, keep stderr
/// for real errors, and stream machine-readable progress on stdout.
const GLOBAL_ARGS: [&str; 7] = [
    "-y",
    "-hide_banner",
    "-loglevel",
    "error",
    "-nostats",
    "-progress",
    "pipe:1",
];

/// Loads an [`FfmpegEngine`] from a binary location.
#[derive(Debug, Clone)]
pub struct FfmpegLoader {
    binary: PathBuf,
}

impl FfmpegLoader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait::async_trait]
impl EngineLoader for FfmpegLoader {
    async fn load(&self) -> ClipResult<Arc<dyn TranscodeEngine>> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ClipTrimError::engine_load(format!(
                    "cannot run {}: {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            return Err(ClipTrimError::engine_load(format!(
                "{} -version exited with {}",
                self.binary.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("unknown version")
            .trim()
            .to_string();

        let workspace = tempfile::Builder::new()
            .prefix("cliptrim-engine-")
            .tempdir()
            .map_err(|e| {
                ClipTrimError::engine_load(format!("cannot create engine workspace: {e}"))
            })?;

        tracing::info!(
            binary = %self.binary.display(),
            version = %version,
            workspace = %workspace.path().display(),
            "ffmpeg engine loaded"
        );

        Ok(Arc::new(FfmpegEngine {
            binary: self.binary.clone(),
            workspace,
        }))
    }
}

/// A loaded ffmpeg engine. The workspace is removed when the engine drops.
#[derive(Debug)]
pub struct FfmpegEngine {
    binary: PathBuf,
    workspace: tempfile::TempDir,
}

impl FfmpegEngine {
    fn resolve(&self, name: &str) -> ClipResult<PathBuf> {
        validate_workspace_name(name)?;
        Ok(self.workspace.path().join(name))
    }
}

#[async_trait::async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> ClipResult<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> ClipResult<Vec<u8>> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ClipTrimError::execution(
                format!("ffmpeg produced no {name}"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, name: &str) -> ClipResult<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exec(&self, args: &[String], progress: &ProgressFn) -> ClipResult<()> {
        let expected_duration = requested_duration(args);
        let mut full_args: Vec<String> = GLOBAL_ARGS.iter().map(|a| a.to_string()).collect();
        full_args.extend(args.iter().cloned());

        tracing::debug!(args = ?full_args, "Running ffmpeg");
        let mut cmd = Command::new(&self.binary);
        cmd.args(&full_args)
            .current_dir(self.workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ClipTrimError::execution(format!("Failed to start ffmpeg: {e}")))?;

        tracing::debug!(pid = child.id(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipTrimError::execution("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipTrimError::execution("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ClipTrimError::execution(format!("Failed reading ffmpeg progress: {e}")))?
        {
            if let Some((key, value)) = parse_progress_line(&line) {
                if let Some(sample) = state.update(key, value, expected_duration) {
                    progress(sample);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ClipTrimError::execution(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ClipTrimError::execution(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        tracing::debug!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
