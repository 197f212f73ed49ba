//! The sequential export queue.
//!
//! A single actor task owns every [`ExportTask`]. The cloneable
//! [`ExportQueue`] handle talks to it over a command channel, and readers
//! observe the queue through [`QueueSnapshot`]s published on a watch channel.
//!
//! Exactly one task is processed at a time, oldest first. When a task
//! finishes the actor starts the next pending one right away; finished tasks
//! stay visible for the reap delay and are then dropped. Callers that need a
//! task's result regardless of reaping ask for its [`ExportQueue::outcome`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use cliptrim_common::config::ExportSettings;
use cliptrim_common::error::{ClipResult, ClipTrimError};
use cliptrim_engine::TrimExecutor;
use cliptrim_model::task::{ProgressSample, TaskId, TaskStatus};

use crate::persist::{PersistenceStrategy, SavedOutput};
use crate::task::{ExportTask, QueueSnapshot, TaskSnapshot, TrimRequest};

/// Default time a finished task stays visible.
pub const DEFAULT_REAP_DELAY: Duration = Duration::from_millis(3000);

/// Queue tuning.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub reap_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            reap_delay: DEFAULT_REAP_DELAY,
        }
    }
}

impl QueueConfig {
    pub fn from_settings(settings: &ExportSettings) -> Self {
        Self {
            reap_delay: Duration::from_millis(settings.reap_delay_ms),
        }
    }
}

/// Turns one request into a saved clip: trim, then persist.
pub struct ExportPipeline {
    executor: Arc<TrimExecutor>,
    persistence: PersistenceStrategy,
}

impl ExportPipeline {
    pub fn new(executor: Arc<TrimExecutor>, persistence: PersistenceStrategy) -> Self {
        Self {
            executor,
            persistence,
        }
    }

    pub async fn process(
        &self,
        request: &TrimRequest,
        on_progress: &cliptrim_engine::ProgressFn,
    ) -> ClipResult<SavedOutput> {
        let clip = self
            .executor
            .run(request.source.bytes(), &request.params, on_progress)
            .await?;
        self.persistence
            .save(
                clip,
                request.params.duration_secs,
                request.directory.as_ref(),
            )
            .await
    }
}

enum Command {
    Enqueue(ExportTask),
    Remove {
        id: TaskId,
        reply: oneshot::Sender<ClipResult<()>>,
    },
    ClearTerminal {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    WaitIdle {
        reply: oneshot::Sender<()>,
    },
    Outcome {
        id: TaskId,
        reply: oneshot::Sender<ClipResult<TaskSnapshot>>,
    },
}

enum Event {
    Progress {
        id: TaskId,
        sample: ProgressSample,
    },
    Finished {
        id: TaskId,
        outcome: Result<SavedOutput, String>,
    },
    Reap(TaskId),
}

/// Handle to a running export queue.
#[derive(Clone)]
pub struct ExportQueue {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<QueueSnapshot>,
}

impl ExportQueue {
    /// Start the queue actor on the current tokio runtime.
    pub fn spawn(pipeline: ExportPipeline, config: QueueConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(QueueSnapshot::default());

        let actor = QueueActor {
            pipeline: Arc::new(pipeline),
            config,
            tasks: Vec::new(),
            in_flight: None,
            events: events_tx,
            snapshots: snapshots_tx,
            idle_waiters: Vec::new(),
            outcome_waiters: Vec::new(),
        };
        tokio::spawn(actor.run(commands_rx, events_rx));

        Self {
            commands: commands_tx,
            snapshots: snapshots_rx,
        }
    }

    /// Append a request to the queue. Never blocks and never fails.
    pub fn enqueue(&self, request: TrimRequest) -> TaskId {
        let id = TaskId::generate();
        tracing::info!(
            task_id = %id,
            source = %request.source.name(),
            mode = %request.params.mode,
            start_secs = request.params.start_secs,
            duration_secs = request.params.duration_secs,
            "Export task queued"
        );
        let task = ExportTask::new(id.clone(), request);
        if self.commands.send(Command::Enqueue(task)).is_err() {
            tracing::warn!(task_id = %id, "Export queue stopped, request dropped");
        }
        id
    }

    /// Remove a finished or not yet started task.
    pub async fn remove(&self, id: &TaskId) -> ClipResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Remove {
            id: id.clone(),
            reply,
        })?;
        rx.await.map_err(|_| ClipTrimError::QueueClosed)?
    }

    /// Remove every completed and failed task. Returns how many were removed.
    pub async fn clear_terminal(&self) -> ClipResult<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ClearTerminal { reply })?;
        rx.await.map_err(|_| ClipTrimError::QueueClosed)
    }

    /// Current state, including every request sent before this call.
    pub async fn snapshot(&self) -> QueueSnapshot {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::Snapshot { reply }).is_err() {
            return self.latest();
        }
        rx.await.unwrap_or_else(|_| self.latest())
    }

    /// Last published state, without a round trip to the actor.
    pub fn latest(&self) -> QueueSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that sees every published state change.
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshots.clone()
    }

    /// Resolve once nothing is pending or processing.
    pub async fn wait_idle(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::WaitIdle { reply }).is_err() {
            return;
        }
        let _ = rx.await;
    }

    /// Final state of a task, resolved when it completes or fails.
    ///
    /// The request is registered before this returns, so the result is kept
    /// even if the task is reaped before the future is polled. Resolves to
    /// [`ClipTrimError::TaskNotFound`] for unknown tasks and for tasks removed
    /// before they finished.
    pub fn outcome(
        &self,
        id: &TaskId,
    ) -> impl Future<Output = ClipResult<TaskSnapshot>> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        let sent = self.send(Command::Outcome {
            id: id.clone(),
            reply,
        });
        async move {
            sent?;
            rx.await.map_err(|_| ClipTrimError::QueueClosed)?
        }
    }

    fn send(&self, command: Command) -> ClipResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ClipTrimError::QueueClosed)
    }
}

struct QueueActor {
    pipeline: Arc<ExportPipeline>,
    config: QueueConfig,
    tasks: Vec<ExportTask>,
    in_flight: Option<TaskId>,
    events: mpsc::UnboundedSender<Event>,
    snapshots: watch::Sender<QueueSnapshot>,
    idle_waiters: Vec<oneshot::Sender<()>>,
    outcome_waiters: Vec<(TaskId, oneshot::Sender<ClipResult<TaskSnapshot>>)>,
}

impl QueueActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        tracing::debug!("Export queue started");
        let mut commands_open = true;

        loop {
            let changed = tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        commands_open = false;
                        false
                    }
                },
                Some(event) = events.recv() => self.handle_event(event),
            };

            let started = self.schedule();
            if changed || started {
                self.publish();
            }
            if self.in_flight.is_none() {
                for waiter in self.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
                if !commands_open {
                    break;
                }
            }
        }
        tracing::debug!("Export queue stopped");
    }

    /// Returns whether any task changed.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Enqueue(task) => {
                self.tasks.push(task);
                true
            }
            Command::Remove { id, reply } => {
                let result = self.remove(&id);
                let changed = result.is_ok();
                let _ = reply.send(result);
                changed
            }
            Command::ClearTerminal { reply } => {
                let before = self.tasks.len();
                self.tasks.retain(|task| !task.status.is_terminal());
                let removed = before - self.tasks.len();
                let _ = reply.send(removed);
                removed > 0
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                false
            }
            Command::WaitIdle { reply } => {
                self.idle_waiters.push(reply);
                false
            }
            Command::Outcome { id, reply } => {
                match self.tasks.iter().find(|task| task.id == id) {
                    Some(task) if task.status.is_terminal() => {
                        let _ = reply.send(Ok(task.snapshot()));
                    }
                    Some(_) => self.outcome_waiters.push((id, reply)),
                    None => {
                        let _ = reply.send(Err(ClipTrimError::TaskNotFound {
                            id: id.to_string(),
                        }));
                    }
                }
                false
            }
        }
    }

    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Progress { id, sample } => match self.task_mut(&id) {
                Some(task) => task.record_progress(sample),
                None => false,
            },
            Event::Finished { id, outcome } => {
                if self.in_flight.as_ref() == Some(&id) {
                    self.in_flight = None;
                }
                let Some(task) = self.task_mut(&id) else {
                    return false;
                };
                match outcome {
                    Ok(saved) => {
                        tracing::info!(
                            task_id = %id,
                            filename = %saved.filename,
                            saved_to = %saved.location,
                            "Export task completed"
                        );
                        task.complete(saved);
                    }
                    Err(error) => {
                        tracing::warn!(task_id = %id, error = %error, "Export task failed");
                        task.fail(error);
                    }
                }
                let finished = task.snapshot();
                self.resolve_outcome(&id, || Ok(finished.clone()));
                self.schedule_reap(id);
                true
            }
            Event::Reap(id) => {
                let before = self.tasks.len();
                self.tasks
                    .retain(|task| !(task.id == id && task.status.is_terminal()));
                let reaped = self.tasks.len() != before;
                if reaped {
                    tracing::debug!(task_id = %id, "Export task reaped");
                }
                reaped
            }
        }
    }

    fn remove(&mut self, id: &TaskId) -> ClipResult<()> {
        let index = self
            .tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| ClipTrimError::TaskNotFound { id: id.to_string() })?;

        let status = self.tasks[index].status;
        if status == TaskStatus::Processing {
            return Err(ClipTrimError::TaskBusy {
                id: id.to_string(),
                status: status.to_string(),
            });
        }
        self.tasks.remove(index);
        self.resolve_outcome(id, || Err(ClipTrimError::TaskNotFound { id: id.to_string() }));
        tracing::debug!(task_id = %id, status = %status, "Export task removed");
        Ok(())
    }

    /// Start the oldest pending task if nothing is in flight.
    fn schedule(&mut self) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        let Some(task) = self
            .tasks
            .iter_mut()
            .find(|task| task.status == TaskStatus::Pending)
        else {
            return false;
        };

        task.start();
        let id = task.id.clone();
        let request = task.request.clone();
        self.in_flight = Some(id.clone());
        tracing::info!(task_id = %id, source = %request.source.name(), "Export task started");

        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        let progress_id = id.clone();
        let progress_events = self.events.clone();
        let worker = tokio::spawn(async move {
            let on_progress = move |sample: ProgressSample| {
                let _ = progress_events.send(Event::Progress {
                    id: progress_id.clone(),
                    sample,
                });
            };
            pipeline.process(&request, &on_progress).await
        });

        // A panicking worker fails its task instead of stalling the queue.
        tokio::spawn(async move {
            let outcome = match worker.await {
                Ok(Ok(saved)) => Ok(saved),
                Ok(Err(err)) => Err(err.to_string()),
                Err(join_err) => Err(format!("Export worker crashed: {join_err}")),
            };
            let _ = events.send(Event::Finished { id, outcome });
        });
        true
    }

    fn resolve_outcome(&mut self, id: &TaskId, outcome: impl Fn() -> ClipResult<TaskSnapshot>) {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.outcome_waiters)
            .into_iter()
            .partition(|(waiter, _)| waiter == id);
        self.outcome_waiters = waiting;
        for (_, reply) in ready {
            let _ = reply.send(outcome());
        }
    }

    fn schedule_reap(&self, id: TaskId) {
        let events = self.events.clone();
        let delay = self.config.reap_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::Reap(id));
        });
    }

    fn task_mut(&mut self, id: &TaskId) -> Option<&mut ExportTask> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tasks: self.tasks.iter().map(ExportTask::snapshot).collect(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
