//! Queue engine.
//!
//! Drives one job at a time from `queued` to a terminal state:
//! submit, poll until ready, fetch the video, export it, then persist and
//! report. Per-job failures are recorded on the job and the loop moves on;
//! only a missing credential halts a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};
use veo_genai::{
    ArtifactFetcher, ExportOutcome, GenAiError, GenerationClient, GenerationRequest, MaterializedArtifact,
};
use veo_models::{ApiKey, FailureKind, Job, JobId, JobResult, JobSpec, NamingSettings, TransitionError};
use veo_storage::{Preferences, Slot};

use crate::config::EngineConfig;
use crate::error::{QueueError, QueueResult};
use crate::events::{QueueEvent, QueueStats};
use crate::logging::JobLogger;
use crate::naming::compute_filename;
use crate::notifier::Notifier;
use crate::store::JobStore;

const INVALID_KEY_MESSAGE: &str = "API key not valid. Please check it in the configuration.";
const EVENT_CAPACITY: usize = 256;

/// Why a run stopped before the queue drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    MissingCredential,
}

/// Result of [`QueueEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No queued jobs remain
    Drained { processed: usize },
    /// Another run was already active; nothing was done
    AlreadyRunning,
    /// The run stopped on a systemic precondition
    Halted { reason: HaltReason, processed: usize },
}

/// Per-job failure, recorded on the job.
#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Map a client error, singling out a rejected credential.
    fn from_client(err: &GenAiError, kind: FailureKind, message: impl Into<String>) -> Self {
        if err.is_invalid_credential() {
            return Self::new(FailureKind::InvalidCredential, INVALID_KEY_MESSAGE);
        }
        Self::new(kind, message)
    }
}

/// Clears the processing flag when a run ends, including on panic.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Inner {
    config: EngineConfig,
    store: RwLock<JobStore>,
    processing: AtomicBool,
    prefs: Preferences,
    client: Arc<dyn GenerationClient>,
    fetcher: Arc<dyn ArtifactFetcher>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<QueueEvent>,
}

/// Sequential generation queue. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct QueueEngine {
    inner: Arc<Inner>,
}

impl QueueEngine {
    pub fn new(
        config: EngineConfig,
        prefs: Preferences,
        client: Arc<dyn GenerationClient>,
        fetcher: Arc<dyn ArtifactFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                store: RwLock::new(JobStore::new()),
                processing: AtomicBool::new(false),
                prefs,
                client,
                fetcher,
                notifier,
                events,
            }),
        }
    }

    /// Restore the saved queue. Jobs interrupted mid-generation are failed.
    ///
    /// An unreadable or unavailable snapshot is logged and leaves the queue
    /// empty. Returns the number of jobs loaded.
    pub async fn load(&self) -> QueueResult<usize> {
        self.restore(true).await
    }

    /// Restore the saved queue exactly as stored, without recovery and
    /// without writing back. For inspecting a queue another process owns.
    pub async fn load_read_only(&self) -> QueueResult<usize> {
        self.restore(false).await
    }

    async fn restore(&self, recover: bool) -> QueueResult<usize> {
        let (count, recovered) = {
            let mut store = self.inner.store.write().await;
            if self.is_processing() {
                return Err(QueueError::Busy);
            }

            let bytes = match self.inner.prefs.store().load(Slot::Queue).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return Ok(0),
                Err(e) => {
                    warn!("Failed to load saved queue: {}", e);
                    return Ok(0);
                }
            };
            if let Err(e) = store.restore(&bytes) {
                warn!("Saved queue unreadable, starting empty: {}", e);
                return Ok(0);
            }
            let recovered = if recover { store.recover_interrupted().len() } else { 0 };
            (store.len(), recovered)
        };

        if recovered > 0 {
            warn!("Marked {} interrupted job(s) as failed", recovered);
            self.persist().await;
        }

        info!("Loaded {} job(s) from saved queue", count);
        Ok(count)
    }

    /// Add the jobs described by `spec` to the tail of the queue.
    pub async fn enqueue(&self, spec: JobSpec) -> QueueResult<Vec<JobId>> {
        let jobs = spec.into_jobs()?;
        let ids: Vec<JobId> = jobs.iter().map(|j| j.id.clone()).collect();

        {
            let mut store = self.inner.store.write().await;
            for job in &jobs {
                store.enqueue(job.clone())?;
            }
        }
        self.persist().await;

        for job in jobs {
            self.emit(QueueEvent::JobUpdated(job));
        }
        let n = ids.len();
        self.inner
            .notifier
            .notify_transient(&format!("Added {} job{} to queue!", n, if n > 1 { "s" } else { "" }));

        Ok(ids)
    }

    /// Whether a run is active.
    pub fn is_processing(&self) -> bool {
        self.inner.processing.load(Ordering::SeqCst)
    }

    /// Remove every job. Rejected while a run is active.
    pub async fn clear(&self) -> QueueResult<()> {
        {
            let mut store = self.inner.store.write().await;
            if self.is_processing() {
                self.inner
                    .notifier
                    .notify_transient("Cannot clear queue while processing.");
                return Err(QueueError::Busy);
            }
            store.clear();
        }
        self.persist().await;
        info!("Queue cleared");
        Ok(())
    }

    /// Copy of all jobs in insertion order.
    pub async fn jobs(&self) -> Vec<Job> {
        self.inner.store.read().await.jobs().to_vec()
    }

    pub async fn job(&self, id: &JobId) -> Option<Job> {
        self.inner.store.read().await.get(id).cloned()
    }

    pub async fn stats(&self) -> QueueStats {
        self.inner.store.read().await.stats()
    }

    /// Filename the job would be exported under right now.
    pub async fn filename_for(&self, id: &JobId) -> QueueResult<String> {
        let naming = self.naming().await;
        let store = self.inner.store.read().await;
        let job = store.get(id).ok_or_else(|| QueueError::NotFound(id.clone()))?;
        Ok(compute_filename(job, &store, &naming))
    }

    /// Receive state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Process queued jobs until none remain.
    ///
    /// Returns immediately with [`RunOutcome::AlreadyRunning`] if a run is
    /// active, so at most one loop ever exists.
    pub async fn start(&self) -> RunOutcome {
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Start requested while already processing");
            return RunOutcome::AlreadyRunning;
        }

        let guard = ProcessingGuard(&self.inner.processing);
        info!("Queue processing started");
        self.emit(QueueEvent::RunStarted);

        let outcome = self.run().await;
        drop(guard);

        match outcome {
            RunOutcome::Halted { reason, processed } => {
                warn!("Queue processing halted after {} job(s): {:?}", processed, reason);
                self.emit(QueueEvent::RunHalted {
                    reason: QueueError::MissingCredential.to_string(),
                });
            }
            RunOutcome::Drained { processed } => {
                info!("Queue drained after {} job(s)", processed);
                self.emit(QueueEvent::RunFinished);
            }
            RunOutcome::AlreadyRunning => {}
        }
        outcome
    }

    /// Run [`start`](Self::start) on a background task.
    pub fn spawn(&self) -> JoinHandle<RunOutcome> {
        let engine = self.clone();
        tokio::spawn(async move { engine.start().await })
    }

    /// Export a completed job to the current folder again.
    pub async fn export_job(&self, id: &JobId) -> QueueResult<ExportOutcome> {
        if self.is_processing() {
            return Err(QueueError::Busy);
        }
        match self.job(id).await {
            None => return Err(QueueError::NotFound(id.clone())),
            Some(job) if job.result().is_none() => return Err(QueueError::NotCompleted(id.clone())),
            Some(_) => {}
        }
        let credential = self.credential().await.ok_or(QueueError::MissingCredential)?;

        let (_, outcome) = self.export(id, &credential).await?;
        match &outcome {
            ExportOutcome::Saved { path } => {
                self.persist().await;
                self.emit_job(id).await;
                self.inner.notifier.notify_system(
                    "Download Complete",
                    &format!("Video saved to: {}", path.display()),
                );
            }
            ExportOutcome::Failed { reason } => {
                self.inner
                    .notifier
                    .notify_transient(&format!("Download failed: {}", reason));
            }
        }
        Ok(outcome)
    }

    async fn run(&self) -> RunOutcome {
        let mut processed = 0;
        loop {
            let Some(job) = self.inner.store.read().await.find_next().cloned() else {
                return RunOutcome::Drained { processed };
            };

            let Some(credential) = self.credential().await else {
                self.inner
                    .notifier
                    .notify_transient(&QueueError::MissingCredential.to_string());
                return RunOutcome::Halted {
                    reason: HaltReason::MissingCredential,
                    processed,
                };
            };

            self.process(job, &credential).await;
            processed += 1;
        }
    }

    async fn process(&self, job: Job, credential: &ApiKey) {
        let logger = JobLogger::new(&job.id, "generate");
        let span = logger.span();

        async {
            if let Err(e) = self.mutate(&job.id, |j| j.start()).await {
                logger.warning(&format!("Could not start: {}", e));
                return;
            }
            self.persist().await;
            self.emit_job(&job.id).await;
            logger.started(&job.prompt);

            match self.generate(&job, credential, &logger).await {
                Ok(artifact) => self.finish_success(&job.id, credential, artifact, &logger).await,
                Err(failure) => self.finish_failure(&job.id, failure, &logger).await,
            }

            self.persist().await;
            self.emit_job(&job.id).await;
        }
        .instrument(span)
        .await
    }

    /// Submit, poll until done and fetch the first video.
    async fn generate(
        &self,
        job: &Job,
        credential: &ApiKey,
        logger: &JobLogger,
    ) -> Result<MaterializedArtifact, Failure> {
        let client = &self.inner.client;
        let config = &self.inner.config;

        let mut operation = client
            .submit(credential, &GenerationRequest::from(job))
            .await
            .map_err(|e| {
                logger.warning(&format!("Submit failed: {}", e));
                Failure::from_client(
                    &e,
                    FailureKind::SubmitFailure,
                    format!("Failed to start video generation: {}", e),
                )
            })?;
        logger.submitted(&operation.name);

        let mut attempts = 0;
        while !operation.done && attempts < config.max_poll_attempts {
            tokio::time::sleep(config.poll_interval).await;
            attempts += 1;

            operation = client.poll(credential, &operation).await.map_err(|e| {
                logger.warning(&format!("Poll {} failed: {}", attempts, e));
                Failure::from_client(
                    &e,
                    FailureKind::PollFailure,
                    "Failed to get video generation status.",
                )
            })?;
            logger.polled(attempts, operation.done);
        }

        if !operation.done {
            logger.warning(&format!("No result after {:?}", config.poll_budget()));
            return Err(Failure::new(FailureKind::Timeout, "Video generation timed out."));
        }
        if let Some(error) = &operation.error {
            return Err(Failure::new(
                FailureKind::EmptyResult,
                format!("No videos were generated: {}", error),
            ));
        }

        let Some(artifact) = operation.artifacts.first() else {
            let mut message = "No videos were generated. The prompt may have been blocked.".to_string();
            if !operation.filtered_reasons.is_empty() {
                message.push_str(&format!(" ({})", operation.filtered_reasons.join("; ")));
            }
            return Err(Failure::new(FailureKind::EmptyResult, message));
        };

        self.inner
            .fetcher
            .materialize(artifact, credential, &job.id)
            .await
            .map_err(|e| {
                Failure::from_client(
                    &e,
                    FailureKind::FetchFailure,
                    format!("Failed to retrieve generated video: {}", e),
                )
            })
    }

    async fn finish_success(
        &self,
        id: &JobId,
        credential: &ApiKey,
        artifact: MaterializedArtifact,
        logger: &JobLogger,
    ) {
        logger.completed(&artifact.uri);
        let result = JobResult {
            uri: artifact.uri,
            preview_path: artifact.preview_path,
        };
        if let Err(e) = self.mutate(id, |j| j.complete(result)).await {
            logger.warning(&format!("Could not complete: {}", e));
            return;
        }

        let reason = match self.export(id, credential).await {
            Ok((filename, ExportOutcome::Saved { path })) => {
                logger.exported(&path);
                self.inner.notifier.notify_system(
                    "Video Generated & Downloaded!",
                    &format!("Saved to: {}", filename),
                );
                return;
            }
            Ok((_, ExportOutcome::Failed { reason })) => reason,
            Err(e) => e.to_string(),
        };

        logger.export_failed(&reason);
        self.inner.notifier.notify_system(
            "Video Generated!",
            "Video ready, but auto-download failed. Export it manually.",
        );
        self.emit(QueueEvent::ExportFailed {
            job_id: id.clone(),
            reason,
        });
    }

    async fn finish_failure(&self, id: &JobId, failure: Failure, logger: &JobLogger) {
        logger.failed(failure.kind, &failure.message);
        let message = failure.message.clone();
        if let Err(e) = self.mutate(id, |j| j.fail(failure.kind, failure.message)).await {
            logger.warning(&format!("Could not record failure: {}", e));
            return;
        }
        self.inner
            .notifier
            .notify_system("Generation Failed", &format!("Error: {}", message));
    }

    /// Export a completed job under its computed filename.
    async fn export(&self, id: &JobId, credential: &ApiKey) -> QueueResult<(String, ExportOutcome)> {
        let naming = self.naming().await;
        let (uri, filename) = {
            let store = self.inner.store.read().await;
            let job = store.get(id).ok_or_else(|| QueueError::NotFound(id.clone()))?;
            let uri = job
                .result()
                .map(|r| r.uri.clone())
                .ok_or_else(|| QueueError::NotCompleted(id.clone()))?;
            (uri, compute_filename(job, &store, &naming))
        };

        let folder = self.inner.prefs.output_folder().await.unwrap_or_else(|e| {
            let fallback = self.inner.prefs.default_output_folder().to_path_buf();
            warn!("Failed to read output folder, using {}: {}", fallback.display(), e);
            fallback
        });

        let outcome = self
            .inner
            .fetcher
            .export_to(&uri, credential, &folder, &filename)
            .await;
        if let ExportOutcome::Saved { path } = &outcome {
            let path = path.clone();
            self.mutate(id, |j| j.set_download_path(path)).await?;
        }
        Ok((filename, outcome))
    }

    async fn mutate<R>(
        &self,
        id: &JobId,
        mutation: impl FnOnce(&mut Job) -> Result<R, TransitionError>,
    ) -> QueueResult<R> {
        let mut store = self.inner.store.write().await;
        Ok(store.update(id, mutation)??)
    }

    async fn credential(&self) -> Option<ApiKey> {
        match self.inner.prefs.credential().await {
            Ok(key) => key,
            Err(e) => {
                warn!("Failed to read API key: {}", e);
                None
            }
        }
    }

    async fn naming(&self) -> NamingSettings {
        self.inner.prefs.naming().await.unwrap_or_else(|e| {
            warn!("Failed to read naming settings, using defaults: {}", e);
            NamingSettings::default()
        })
    }

    /// Save the queue snapshot. Failures are logged; memory stays authoritative.
    async fn persist(&self) {
        let bytes = match self.inner.store.read().await.snapshot() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize queue: {}", e);
                return;
            }
        };
        if let Err(e) = self.inner.prefs.store().save(Slot::Queue, &bytes).await {
            warn!("Failed to persist queue: {}", e);
        }
    }

    async fn emit_job(&self, id: &JobId) {
        if let Some(job) = self.job(id).await {
            self.emit(QueueEvent::JobUpdated(job));
        }
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}
