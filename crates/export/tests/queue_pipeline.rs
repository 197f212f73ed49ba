use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cliptrim_common::error::{ClipResult, ClipTrimError};
use cliptrim_engine::{
    EngineLoader, ProgressFn, TranscodeEngine, TrimExecutor, INPUT_NAME, OUTPUT_NAME,
};
use cliptrim_export::{
    DirEntry, DirectoryHandle, Download, DownloadSink, ExportPipeline, ExportQueue, FsDirectory,
    NamingResolver, PersistenceStrategy, QueueConfig, QueueView, TrimRequest, WritableFile,
};
use cliptrim_model::media::SourceMedia;
use cliptrim_model::task::{ProgressSample, SavedLocation, TaskId, TaskStatus};
use cliptrim_model::trim::{ExportMode, TrimParams};

/// Copies input to output. Inputs starting with `corrupt` fail, inputs
/// starting with `panic` crash the worker.
#[derive(Default)]
struct FakeEngine {
    files: Mutex<HashMap<String, Vec<u8>>>,
    processed: Mutex<Vec<Vec<u8>>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
    samples: Vec<ProgressSample>,
    work: Duration,
}

#[async_trait::async_trait]
impl TranscodeEngine for FakeEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> ClipResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> ClipResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ClipTrimError::execution(format!("no {name}")))
    }

    async fn delete_file(&self, name: &str) -> ClipResult<()> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }

    async fn exec(&self, _args: &[String], progress: &ProgressFn) -> ClipResult<()> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        let input = self.read_file(INPUT_NAME).await?;
        for sample in &self.samples {
            progress(*sample);
            tokio::task::yield_now().await;
        }
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if input.starts_with(b"panic") {
            panic!("engine crashed");
        }
        if input.starts_with(b"corrupt") {
            return Err(ClipTrimError::execution(
                "Invalid data found when processing input",
            ));
        }
        self.processed.lock().unwrap().push(input.clone());
        self.write_file(OUTPUT_NAME, &input).await
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeLoader {
    engine: Arc<FakeEngine>,
    loads: AtomicUsize,
    available: bool,
}

#[async_trait::async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self) -> ClipResult<Arc<dyn TranscodeEngine>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(ClipTrimError::engine_load("ffmpeg not installed"));
        }
        Ok(self.engine.clone())
    }
}

#[derive(Debug, Default)]
struct MemorySink {
    received: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait::async_trait]
impl DownloadSink for MemorySink {
    async fn trigger(&self, download: Download) -> ClipResult<String> {
        let name = download.filename().to_string();
        self.received
            .lock()
            .unwrap()
            .push((name.clone(), download.bytes().to_vec()));
        Ok(name)
    }
}

/// Grants access but refuses to create files.
#[derive(Debug)]
struct ReadOnlyDirectory;

#[async_trait::async_trait]
impl DirectoryHandle for ReadOnlyDirectory {
    async fn get_or_create_subdir(&self, _name: &str) -> ClipResult<Arc<dyn DirectoryHandle>> {
        Ok(Arc::new(ReadOnlyDirectory))
    }

    async fn entries(&self) -> ClipResult<Vec<DirEntry>> {
        Ok(vec![DirEntry::file("4_5s.mp4")])
    }

    async fn create_file(&self, _name: &str) -> ClipResult<Box<dyn WritableFile>> {
        Err(ClipTrimError::persistence("read-only file system"))
    }

    fn display_name(&self) -> String {
        "read-only".to_string()
    }
}

struct Harness {
    queue: ExportQueue,
    loader: Arc<FakeLoader>,
    sink: Arc<MemorySink>,
}

fn harness(engine: FakeEngine, available: bool, reap_delay: Duration) -> Harness {
    let loader = Arc::new(FakeLoader {
        engine: Arc::new(engine),
        loads: AtomicUsize::new(0),
        available,
    });
    let sink = Arc::new(MemorySink::default());
    let executor = Arc::new(TrimExecutor::new(loader.clone()));
    let persistence = PersistenceStrategy::new(Arc::new(NamingResolver::new()), sink.clone());
    let queue = ExportQueue::spawn(
        ExportPipeline::new(executor, persistence),
        QueueConfig { reap_delay },
    );
    Harness {
        queue,
        loader,
        sink,
    }
}

fn request(bytes: &[u8], directory: Option<Arc<dyn DirectoryHandle>>) -> TrimRequest {
    TrimRequest::new(
        SourceMedia::new("clip.mp4", bytes.to_vec()),
        TrimParams::new(1.0, 5.0, ExportMode::Fast, 30),
        directory,
    )
    .expect("valid request")
}

const LONG: Duration = Duration::from_secs(600);

#[tokio::test]
async fn tasks_complete_in_enqueue_order_one_at_a_time() {
    let h = harness(
        FakeEngine {
            work: Duration::from_millis(5),
            ..FakeEngine::default()
        },
        true,
        LONG,
    );

    let max_processing = Arc::new(AtomicUsize::new(0));
    let mut updates = h.queue.subscribe();
    let observed = max_processing.clone();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let processing = updates
                .borrow()
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Processing)
                .count();
            observed.fetch_max(processing, Ordering::SeqCst);
        }
    });

    let ids: Vec<_> = (0..4u8)
        .map(|i| h.queue.enqueue(request(&[b'a' + i], None)))
        .collect();
    h.queue.wait_idle().await;

    let snapshot = h.queue.snapshot().await;
    let order: Vec<_> = snapshot.tasks.iter().map(|t| t.id.clone()).collect();
    assert_eq!(order, ids);
    for (i, task) in snapshot.tasks.iter().enumerate() {
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.filename.as_deref(), Some(format!("{}_5s.mp4", i + 1).as_str()));
        assert_eq!(task.saved_to, Some(SavedLocation::Download));
    }

    let engine = &h.loader.engine;
    assert_eq!(
        *engine.processed.lock().unwrap(),
        vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]
    );
    assert_eq!(engine.max_running.load(Ordering::SeqCst), 1);
    assert_eq!(h.loader.loads.load(Ordering::SeqCst), 1);

    drop(h);
    watcher.await.expect("watcher should finish");
    assert!(max_processing.load(Ordering::SeqCst) <= 1);
}

#[tokio::test]
async fn clips_continue_directory_numbering() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(tmp.path().join("export")).expect("export dir");
    std::fs::write(tmp.path().join("export").join("7_2s.mp4"), b"").expect("seed");
    let dir: Arc<dyn DirectoryHandle> = Arc::new(FsDirectory::new(tmp.path()));

    let h = harness(FakeEngine::default(), true, LONG);
    h.queue.enqueue(request(b"first", Some(dir.clone())));
    h.queue.enqueue(request(b"second", Some(dir)));
    h.queue.wait_idle().await;

    let names: Vec<_> = h
        .queue
        .snapshot()
        .await
        .tasks
        .into_iter()
        .map(|t| (t.filename, t.saved_to))
        .collect();
    assert_eq!(
        names,
        vec![
            (Some("8_5s.mp4".to_string()), Some(SavedLocation::Directory)),
            (Some("9_5s.mp4".to_string()), Some(SavedLocation::Directory)),
        ]
    );
    let saved = std::fs::read(tmp.path().join("export").join("9_5s.mp4")).expect("saved clip");
    assert_eq!(saved, b"second");
    assert!(h.sink.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn persistence_failure_still_completes_via_download() {
    let h = harness(FakeEngine::default(), true, LONG);
    let dir: Arc<dyn DirectoryHandle> = Arc::new(ReadOnlyDirectory);
    let id = h.queue.enqueue(request(b"clip", Some(dir)));
    h.queue.wait_idle().await;

    let snapshot = h.queue.snapshot().await;
    let task = snapshot.get(&id).expect("task present");
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.saved_to, Some(SavedLocation::Download));
    assert_eq!(task.filename.as_deref(), Some("1_5s.mp4"));
    assert_eq!(
        *h.sink.received.lock().unwrap(),
        vec![("1_5s.mp4".to_string(), b"clip".to_vec())]
    );
}

#[tokio::test]
async fn transcode_failure_fails_task_and_queue_moves_on() {
    let h = harness(FakeEngine::default(), true, LONG);
    let bad = h.queue.enqueue(request(b"corrupt", None));
    let good = h.queue.enqueue(request(b"fine", None));
    h.queue.wait_idle().await;

    let snapshot = h.queue.snapshot().await;
    let failed = snapshot.get(&bad).expect("failed task present");
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed
        .error
        .as_deref()
        .is_some_and(|e| e.contains("Invalid data found")));
    assert!(failed.filename.is_none());

    let done = snapshot.get(&good).expect("next task present");
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.filename.as_deref(), Some("1_5s.mp4"));
}

#[tokio::test]
async fn crashed_worker_fails_task_and_queue_moves_on() {
    let h = harness(FakeEngine::default(), true, LONG);
    let crashed = h.queue.enqueue(request(b"panic", None));
    let next = h.queue.enqueue(request(b"fine", None));
    h.queue.wait_idle().await;

    let snapshot = h.queue.snapshot().await;
    let task = snapshot.get(&crashed).expect("crashed task present");
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(
        snapshot.get(&next).map(|t| t.status),
        Some(TaskStatus::Completed)
    );
}

#[tokio::test]
async fn unavailable_engine_fails_every_task_identically() {
    let h = harness(FakeEngine::default(), false, LONG);
    h.queue.enqueue(request(b"a", None));
    h.queue.enqueue(request(b"b", None));
    h.queue.wait_idle().await;

    let snapshot = h.queue.snapshot().await;
    let errors: Vec<_> = snapshot
        .tasks
        .iter()
        .map(|t| (t.status, t.error.clone()))
        .collect();
    let expected = Some(
        "Failed to load video processing engine: ffmpeg not installed".to_string(),
    );
    assert_eq!(
        errors,
        vec![
            (TaskStatus::Failed, expected.clone()),
            (TaskStatus::Failed, expected),
        ]
    );
    assert_eq!(h.loader.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn progress_is_whole_percent_and_never_decreases() {
    let h = harness(
        FakeEngine {
            samples: vec![
                ProgressSample::new(0.205, 1.0),
                ProgressSample::new(0.5, 2.5),
                ProgressSample::new(0.3, 1.5),
                ProgressSample::new(1.0, 5.0),
            ],
            ..FakeEngine::default()
        },
        true,
        LONG,
    );

    let mut updates = h.queue.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            if let Some(task) = updates.borrow().tasks.first() {
                if seen.last() != Some(&task.progress) {
                    seen.push(task.progress);
                }
            }
        }
        seen
    });

    h.queue.enqueue(request(b"clip", None));
    h.queue.wait_idle().await;
    drop(h);

    let seen = watcher.await.expect("watcher should finish");
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.iter().all(|p| [0, 20, 50, 100].contains(p)), "{seen:?}");
}

#[tokio::test(start_paused = true)]
async fn finished_tasks_are_reaped_after_delay() {
    let h = harness(FakeEngine::default(), true, Duration::from_millis(3000));
    let id = h.queue.enqueue(request(b"clip", None));
    h.queue.wait_idle().await;
    assert!(h.queue.snapshot().await.get(&id).is_some());

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert!(h.queue.snapshot().await.get(&id).is_some());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.queue.snapshot().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn manual_remove_is_immediate() {
    let h = harness(FakeEngine::default(), true, Duration::from_millis(3000));
    let id = h.queue.enqueue(request(b"clip", None));
    h.queue.wait_idle().await;

    h.queue.remove(&id).await.expect("terminal task is removable");
    assert!(h.queue.snapshot().await.is_empty());

    let err = h.queue.remove(&id).await.unwrap_err();
    assert!(matches!(err, ClipTrimError::TaskNotFound { .. }));

    // The pending reap for the removed task is harmless.
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert!(h.queue.snapshot().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn processing_task_cannot_be_removed_but_pending_can() {
    let h = harness(
        FakeEngine {
            work: Duration::from_millis(500),
            ..FakeEngine::default()
        },
        true,
        LONG,
    );
    let running = h.queue.enqueue(request(b"one", None));
    let waiting = h.queue.enqueue(request(b"two", None));

    let view = QueueView::from_snapshot(&h.queue.snapshot().await);
    assert_eq!(view.active, Some(running.clone()));
    assert_eq!(view.pending, 1);

    let err = h.queue.remove(&running).await.unwrap_err();
    assert!(matches!(err, ClipTrimError::TaskBusy { .. }));
    h.queue.remove(&waiting).await.expect("pending task is removable");

    h.queue.wait_idle().await;
    let snapshot = h.queue.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.get(&running).map(|t| t.status),
        Some(TaskStatus::Completed)
    );
    assert_eq!(*h.loader.engine.processed.lock().unwrap(), vec![b"one".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn failed_tasks_are_reaped_after_delay() {
    let h = harness(FakeEngine::default(), true, Duration::from_millis(3000));
    let id = h.queue.enqueue(request(b"corrupt", None));
    h.queue.wait_idle().await;
    assert_eq!(
        h.queue.snapshot().await.get(&id).map(|t| t.status),
        Some(TaskStatus::Failed)
    );

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert!(h.queue.snapshot().await.get(&id).is_some());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(h.queue.snapshot().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn clear_terminal_keeps_unfinished_tasks() {
    let h = harness(
        FakeEngine {
            work: Duration::from_millis(500),
            ..FakeEngine::default()
        },
        true,
        LONG,
    );
    let done = h.queue.enqueue(request(b"corrupt", None));
    let running = h.queue.enqueue(request(b"two", None));
    let waiting = h.queue.enqueue(request(b"three", None));

    let first = h.queue.outcome(&done).await.expect("first task finishes");
    assert_eq!(first.status, TaskStatus::Failed);

    assert_eq!(h.queue.clear_terminal().await.expect("queue running"), 1);
    let snapshot = h.queue.snapshot().await;
    assert!(snapshot.get(&done).is_none());
    assert_eq!(
        snapshot.get(&running).map(|t| t.status),
        Some(TaskStatus::Processing)
    );
    assert_eq!(
        snapshot.get(&waiting).map(|t| t.status),
        Some(TaskStatus::Pending)
    );

    h.queue.wait_idle().await;
    let snapshot = h.queue.snapshot().await;
    let statuses: Vec<_> = snapshot.tasks.iter().map(|t| (t.id.clone(), t.status)).collect();
    assert_eq!(
        statuses,
        vec![
            (running, TaskStatus::Completed),
            (waiting, TaskStatus::Completed),
        ]
    );
    assert_eq!(h.queue.clear_terminal().await.expect("queue running"), 2);
    assert!(QueueView::from_snapshot(&h.queue.snapshot().await).is_idle());
}

#[tokio::test(start_paused = true)]
async fn outcome_survives_reaping_of_earlier_tasks() {
    let h = harness(
        FakeEngine {
            work: Duration::from_millis(1000),
            ..FakeEngine::default()
        },
        true,
        Duration::from_millis(300),
    );
    let failed = h.queue.enqueue(request(b"corrupt", None));
    let slow = h.queue.enqueue(request(b"slow", None));
    let failed_outcome = h.queue.outcome(&failed);
    let slow_outcome = h.queue.outcome(&slow);

    let last = slow_outcome.await.expect("second task finishes");
    assert_eq!(last.status, TaskStatus::Completed);

    // The failed task has been reaped by now, its outcome was kept.
    assert!(h.queue.snapshot().await.get(&failed).is_none());
    let first = failed_outcome.await.expect("outcome kept after reap");
    assert_eq!(first.status, TaskStatus::Failed);
    assert!(first
        .error
        .as_deref()
        .is_some_and(|e| e.contains("Invalid data found")));
}

#[tokio::test(start_paused = true)]
async fn outcome_of_unknown_or_removed_task_is_not_found() {
    let h = harness(
        FakeEngine {
            work: Duration::from_millis(500),
            ..FakeEngine::default()
        },
        true,
        LONG,
    );
    let running = h.queue.enqueue(request(b"one", None));
    let waiting = h.queue.enqueue(request(b"two", None));
    let removed_outcome = h.queue.outcome(&waiting);

    h.queue.remove(&waiting).await.expect("pending task is removable");
    let err = removed_outcome.await.unwrap_err();
    assert!(matches!(err, ClipTrimError::TaskNotFound { .. }));

    let err = h
        .queue
        .outcome(&TaskId::from("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClipTrimError::TaskNotFound { .. }));

    let done = h.queue.outcome(&running).await.expect("running task finishes");
    assert_eq!(done.status, TaskStatus::Completed);
    // Asking again after completion answers from the finished record.
    let again = h.queue.outcome(&running).await.expect("still visible");
    assert_eq!(again, done);
}
