//! Command handlers against an in-memory store.

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use veo_genai::{GenAiConfig, HttpArtifactFetcher, VeoClient};
use veo_models::{JobId, JobSpec};
use veo_queue::{EngineConfig, JobStore, QueueEngine, QueueError, TracingNotifier};
use veo_storage::{FileStore, MemoryStore, Preferences, Slot, SnapshotStore};
use veo_worker::{App, Cli, DataDirLock, WorkerError};

fn app(cache: &Path) -> App {
    app_over(Arc::new(MemoryStore::new()), cache)
}

/// App sharing `dir/data` with any other app built the same way.
fn shared_app(dir: &Path) -> App {
    let data = dir.join("data");
    app_over(Arc::new(FileStore::new(&data)), dir).with_data_dir(data)
}

fn app_over(store: Arc<dyn SnapshotStore>, cache: &Path) -> App {
    let prefs = Preferences::new(store, cache.join("out"));
    // Never contacted: these tests do not run the queue.
    let client = VeoClient::new(GenAiConfig::default().with_base_url("http://127.0.0.1:9")).unwrap();
    let engine = QueueEngine::new(
        EngineConfig::default(),
        prefs.clone(),
        Arc::new(client),
        Arc::new(HttpArtifactFetcher::new(&GenAiConfig::default(), cache).unwrap()),
        Arc::new(TracingNotifier),
    );
    App::from_parts(engine, prefs)
}

async fn run(app: &App, args: &[&str]) -> Result<String, WorkerError> {
    let cli = Cli::try_parse_from(std::iter::once("veo-worker").chain(args.iter().copied())).unwrap();
    app.execute(cli.command).await
}

#[tokio::test]
async fn test_add_then_list() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let out = run(&app, &["add", "a paper boat", "--count", "2", "--aspect-ratio", "9:16"])
        .await
        .unwrap();
    assert_eq!(out.lines().count(), 2);

    let listing = run(&app, &["list"]).await.unwrap();
    assert_eq!(listing.matches("a paper boat").count(), 2);
    assert!(listing.contains("VEO 3.0 Fast"));
    assert!(listing.trim_end().ends_with("2 queued"));
}

#[tokio::test]
async fn test_add_with_reference_image() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("ref.jpg");
    tokio::fs::write(&image, [0xff, 0xd8, 0xff]).await.unwrap();
    let app = app(dir.path());

    run(&app, &["add", "p", "--image", image.to_str().unwrap()]).await.unwrap();

    let jobs = app.engine.jobs().await;
    let reference = jobs[0].reference_image.as_ref().unwrap();
    assert_eq!(reference.bytes, vec![0xff, 0xd8, 0xff]);
    assert_eq!(reference.mime_type, "image/jpeg");
}

#[tokio::test]
async fn test_add_rejects_oversized_batch() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let err = run(&app, &["add", "p", "--count", "25"]).await.unwrap_err();
    assert!(err.to_string().contains("between 1 and 20"));
    assert!(app.engine.jobs().await.is_empty());
}

#[tokio::test]
async fn test_key_is_masked_in_show() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let shown = run(&app, &["config", "show"]).await.unwrap();
    assert!(shown.contains("API key:       not set"));

    run(&app, &["config", "set-key", "AIzaSyLongEnoughKey5678"]).await.unwrap();
    let shown = run(&app, &["config", "show"]).await.unwrap();
    assert!(shown.contains("5678"));
    assert!(!shown.contains("AIzaSyLongEnoughKey5678"));

    let err = run(&app, &["config", "set-key", "short"]).await.unwrap_err();
    assert!(matches!(err, WorkerError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_naming_and_folder() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let out = run(&app, &["config", "naming", "--prefix", "take_", "--start", "7", "--position", "before"])
        .await
        .unwrap();
    assert!(out.contains("007take_.mp4"));

    let missing = dir.path().join("missing");
    assert!(run(&app, &["config", "folder", missing.to_str().unwrap()]).await.is_err());

    run(&app, &["config", "folder", dir.path().to_str().unwrap()]).await.unwrap();
    let shown = run(&app, &["config", "show"]).await.unwrap();
    assert!(shown.contains(&format!("Output folder: {}", dir.path().display())));
}

#[tokio::test]
async fn test_clear_and_export_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    run(&app, &["add", "p"]).await.unwrap();

    let err = run(&app, &["export", "no-such-job"]).await.unwrap_err();
    assert!(err.to_string().contains("no-such-job"));

    assert_eq!(run(&app, &["clear"]).await.unwrap(), "Queue cleared.");
    assert!(app.engine.jobs().await.is_empty());
}

#[tokio::test]
async fn test_queue_changes_refused_while_another_process_runs() {
    let dir = tempfile::tempdir().unwrap();
    let first = shared_app(dir.path());
    run(&first, &["add", "first"]).await.unwrap();

    // Stands in for a `run` in another terminal.
    let mut running = DataDirLock::open(&dir.path().join("data")).unwrap();
    let held = running.try_acquire().unwrap();
    assert!(held.is_some());

    let second = shared_app(dir.path());
    let err = run(&second, &["add", "late"]).await.unwrap_err();
    assert!(matches!(err, WorkerError::Queue(QueueError::Busy)));
    let err = run(&second, &["clear"]).await.unwrap_err();
    assert!(matches!(err, WorkerError::Queue(QueueError::Busy)));
    assert_eq!(
        run(&second, &["run"]).await.unwrap(),
        "Queue is already being processed."
    );
    // Preferences stay editable.
    run(&second, &["config", "naming", "--prefix", "take_"]).await.unwrap();

    drop(held);
    run(&second, &["add", "late"]).await.unwrap();
    let listing = run(&shared_app(dir.path()), &["list"]).await.unwrap();
    assert!(listing.contains("first"));
    assert!(listing.contains("late"));
}

#[tokio::test]
async fn test_list_during_a_run_does_not_touch_the_active_job() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let store = FileStore::new(&data);

    let mut saved = JobStore::new();
    for job in JobSpec::new("in progress").into_jobs().unwrap() {
        saved.enqueue(job).unwrap();
    }
    let active: JobId = saved.jobs()[0].id.clone();
    saved.update(&active, |j| j.start().unwrap()).unwrap();
    let bytes = saved.snapshot().unwrap();
    store.save(Slot::Queue, &bytes).await.unwrap();

    let mut running = DataDirLock::open(&data).unwrap();
    let held = running.try_acquire().unwrap();

    let listing = run(&shared_app(dir.path()), &["list"]).await.unwrap();
    assert!(listing.contains("generating"));
    assert_eq!(store.load(Slot::Queue).await.unwrap().unwrap(), bytes);

    // With the runner gone the job is recovered as interrupted.
    drop(held);
    let listing = run(&shared_app(dir.path()), &["list"]).await.unwrap();
    assert!(listing.contains("failed"));
    assert!(!listing.contains("generating"));
}
