//! Export task records and the snapshots readers see.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cliptrim_common::error::ClipResult;
use cliptrim_model::media::SourceMedia;
use cliptrim_model::task::{ProgressSample, SavedLocation, TaskId, TaskStatus};
use cliptrim_model::trim::TrimParams;

use crate::persist::SavedOutput;
use crate::storage::DirectoryHandle;

/// Everything needed to export one clip, captured when export is invoked.
#[derive(Debug, Clone)]
pub struct TrimRequest {
    pub source: SourceMedia,
    pub params: TrimParams,
    pub directory: Option<Arc<dyn DirectoryHandle>>,
}

impl TrimRequest {
    /// Build a request, rejecting malformed trim parameters.
    pub fn new(
        source: SourceMedia,
        params: TrimParams,
        directory: Option<Arc<dyn DirectoryHandle>>,
    ) -> ClipResult<Self> {
        params.validate()?;
        Ok(Self {
            source,
            params,
            directory,
        })
    }
}

/// A queued export and its mutable outcome. Owned by the queue actor.
#[derive(Debug)]
pub(crate) struct ExportTask {
    pub(crate) id: TaskId,
    pub(crate) request: TrimRequest,
    pub(crate) status: TaskStatus,
    pub(crate) progress: u8,
    pub(crate) processed_secs: f64,
    pub(crate) filename: Option<String>,
    pub(crate) saved_to: Option<SavedLocation>,
    pub(crate) error: Option<String>,
    pub(crate) enqueued_at: DateTime<Utc>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl ExportTask {
    pub(crate) fn new(id: TaskId, request: TrimRequest) -> Self {
        Self {
            id,
            request,
            status: TaskStatus::Pending,
            progress: 0,
            processed_secs: 0.0,
            filename: None,
            saved_to: None,
            error: None,
            enqueued_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = TaskStatus::Processing;
    }

    /// Apply a sample. Returns whether anything visible changed.
    pub(crate) fn record_progress(&mut self, sample: ProgressSample) -> bool {
        if self.status != TaskStatus::Processing {
            return false;
        }
        let mut changed = false;
        if sample.time_secs.is_finite() && sample.time_secs > self.processed_secs {
            self.processed_secs = sample.time_secs;
            changed = true;
        }
        let percent = sample.percent();
        if percent > self.progress {
            self.progress = percent;
            changed = true;
        }
        changed
    }

    pub(crate) fn complete(&mut self, saved: SavedOutput) {
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.filename = Some(saved.filename);
        self.saved_to = Some(saved.location);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id.clone(),
            source_name: self.request.source.name().to_string(),
            params: self.request.params,
            has_directory: self.request.directory.is_some(),
            status: self.status,
            progress: self.progress,
            processed_secs: self.processed_secs,
            filename: self.filename.clone(),
            saved_to: self.saved_to,
            error: self.error.clone(),
            enqueued_at: self.enqueued_at,
            finished_at: self.finished_at,
        }
    }
}

/// Read-only view of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub source_name: String,
    pub params: TrimParams,
    pub has_directory: bool,
    pub status: TaskStatus,
    /// Whole percent, never decreasing while processing.
    pub progress: u8,
    /// Seconds of output produced so far.
    pub processed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<SavedLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Read-only view of the whole queue, in enqueue order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub tasks: Vec<TaskSnapshot>,
}

impl QueueSnapshot {
    pub fn get(&self, id: &TaskId) -> Option<&TaskSnapshot> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// The task currently being processed, if any.
    pub fn active(&self) -> Option<&TaskSnapshot> {
        self.tasks
            .iter()
            .find(|task| task.status == TaskStatus::Processing)
    }

    /// No task is pending or processing.
    pub fn is_idle(&self) -> bool {
        self.tasks.iter().all(|task| task.status.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
