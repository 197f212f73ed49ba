//! Summary of a queue snapshot for status displays.

use serde::Serialize;

use cliptrim_model::task::{TaskId, TaskStatus};

use crate::task::QueueSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueView {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    /// Task currently being processed.
    pub active: Option<TaskId>,
    /// Progress of the active task.
    pub active_percent: Option<u8>,
}

impl QueueView {
    pub fn from_snapshot(snapshot: &QueueSnapshot) -> Self {
        let mut view = Self::default();
        for task in &snapshot.tasks {
            match task.status {
                TaskStatus::Pending => view.pending += 1,
                TaskStatus::Processing => {
                    view.processing += 1;
                    view.active = Some(task.id.clone());
                    view.active_percent = Some(task.progress);
                }
                TaskStatus::Completed => view.completed += 1,
                TaskStatus::Failed => view.failed += 1,
            }
        }
        view
    }

    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}
