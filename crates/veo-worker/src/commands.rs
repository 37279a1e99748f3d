//! Command handlers.
//!
//! Each handler returns the text to print so the binary owns stdout.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use veo_genai::{ExportOutcome, HttpArtifactFetcher, VeoClient};
use veo_models::{ApiKey, GenerationConfig, JobId, JobSpec, JobStatus, ModelId, ReferenceImage};
use veo_queue::{HaltReason, Notifier, QueueEngine, QueueError, QueueEvent, RunOutcome};
use veo_storage::{FileStore, Preferences};

use crate::cli::{AddArgs, Commands, ConfigCommand};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::lock::DataDirLock;

const ALREADY_RUNNING: &str = "Queue is already being processed.";

/// Engine plus the preferences it reads.
pub struct App {
    pub engine: QueueEngine,
    pub prefs: Preferences,
    /// Directory shared with other invocations, locked while the queue is changed
    data_dir: Option<PathBuf>,
}

impl App {
    /// Wire the engine to the Gemini API and the on-disk store.
    pub fn new(config: &WorkerConfig, notifier: Arc<dyn Notifier>) -> WorkerResult<Self> {
        let store = Arc::new(FileStore::new(&config.data_dir));
        let prefs = Preferences::new(store, &config.output_dir).with_credential_override(config.api_key.clone());
        let client = VeoClient::new(config.genai.clone())?;
        let fetcher = HttpArtifactFetcher::new(&config.genai, &config.cache_dir)?;

        let engine = QueueEngine::new(
            config.engine.clone(),
            prefs.clone(),
            Arc::new(client),
            Arc::new(fetcher),
            notifier,
        );
        Ok(Self::from_parts(engine, prefs).with_data_dir(&config.data_dir))
    }

    /// App whose store is private to this process.
    pub fn from_parts(engine: QueueEngine, prefs: Preferences) -> Self {
        Self {
            engine,
            prefs,
            data_dir: None,
        }
    }

    /// Coordinate queue changes with other processes using `data_dir`.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Run one command. Preferences are always writable; the queue only
    /// when no other process holds the data directory.
    pub async fn execute(&self, command: Commands) -> WorkerResult<String> {
        let mut lock = match &self.data_dir {
            Some(dir) => Some(DataDirLock::open(dir)?),
            None => None,
        };
        let guard = match lock.as_mut() {
            Some(lock) => lock.try_acquire()?,
            None => None,
        };
        let owned = guard.is_some() || self.data_dir.is_none();

        let output = match command {
            Commands::Config(cmd) => self.config(cmd).await,
            Commands::List if !owned => {
                self.engine.load_read_only().await?;
                self.list().await
            }
            Commands::Run if !owned => Ok(ALREADY_RUNNING.to_string()),
            _ if !owned => Err(QueueError::Busy.into()),
            Commands::List => {
                self.engine.load().await?;
                self.list().await
            }
            Commands::Run => {
                self.engine.load().await?;
                self.run().await
            }
            Commands::Add(args) => {
                self.engine.load().await?;
                self.add(args).await
            }
            Commands::Clear => {
                self.engine.load().await?;
                self.engine.clear().await?;
                Ok("Queue cleared.".to_string())
            }
            Commands::Export(args) => {
                self.engine.load().await?;
                self.export(&JobId::from_string(args.job_id)).await
            }
        };
        drop(guard);
        output
    }

    async fn add(&self, args: AddArgs) -> WorkerResult<String> {
        let image = match &args.image {
            Some(path) => Some(read_image(path).await?),
            None => None,
        };
        let seed = if args.random_seed {
            Some(GenerationConfig::random_seed())
        } else {
            args.seed
        };

        let spec = JobSpec::new(args.prompt)
            .with_model(ModelId::new(args.model))
            .with_config(GenerationConfig::new(args.aspect_ratio).with_seed(seed))
            .with_reference_image(image)
            .with_count(args.count);

        let ids = self.engine.enqueue(spec).await?;
        let mut out = String::new();
        for id in &ids {
            let _ = writeln!(out, "{}", id);
        }
        Ok(out)
    }

    async fn run(&self) -> WorkerResult<String> {
        if let Err(e) = self.prefs.ensure_default_output_folder().await {
            warn!("Could not create default output folder: {}", e);
        }

        let mut events = self.engine.subscribe();
        let reporter = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(QueueEvent::JobUpdated(job)) => {
                        info!(job_id = %job.id, status = %job.status(), "{}", job.prompt)
                    }
                    Ok(QueueEvent::ExportFailed { job_id, reason }) => {
                        warn!(job_id = %job_id, "Export failed: {}", reason)
                    }
                    Ok(QueueEvent::RunFinished) | Ok(QueueEvent::RunHalted { .. }) => break,
                    Ok(QueueEvent::RunStarted) => {}
                    Err(RecvError::Lagged(n)) => warn!("Missed {} queue events", n),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let outcome = tokio::select! {
            outcome = self.engine.start() => outcome,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted; the job in progress will be marked as interrupted on next start");
                reporter.abort();
                return Ok("Interrupted.".to_string());
            }
        };
        if outcome == RunOutcome::AlreadyRunning {
            reporter.abort();
        } else {
            reporter.await.ok();
        }

        let stats = self.engine.stats().await;
        Ok(match outcome {
            RunOutcome::Drained { processed } => format!("Processed {} job(s). Queue: {}", processed, stats),
            RunOutcome::AlreadyRunning => ALREADY_RUNNING.to_string(),
            RunOutcome::Halted {
                reason: HaltReason::MissingCredential,
                ..
            } => "API Key not configured. Run `veo-worker config set-key <KEY>` first.".to_string(),
        })
    }

    async fn list(&self) -> WorkerResult<String> {
        let mut out = String::new();
        for job in self.engine.jobs().await {
            let filename = self.engine.filename_for(&job.id).await?;
            let _ = write!(
                out,
                "{}  {:<10}  {:<12}  {}",
                job.id,
                job.status().as_str(),
                job.model.label(),
                job.prompt
            );
            match job.status() {
                JobStatus::Completed => {
                    let _ = write!(out, "  -> {}", filename);
                    if let Some(path) = job.download_path() {
                        let _ = write!(out, " (saved to {})", path.display());
                    }
                }
                JobStatus::Failed => {
                    let _ = write!(out, "  error: {}", job.error().unwrap_or("unknown"));
                }
                _ => {}
            }
            out.push('\n');
        }
        let _ = writeln!(out, "{}", self.engine.stats().await);
        Ok(out)
    }

    async fn export(&self, id: &JobId) -> WorkerResult<String> {
        match self.engine.export_job(id).await? {
            ExportOutcome::Saved { path } => Ok(format!("Video saved to: {}", path.display())),
            ExportOutcome::Failed { reason } => Ok(format!("Download failed: {}", reason)),
        }
    }

    async fn config(&self, cmd: ConfigCommand) -> WorkerResult<String> {
        match cmd {
            ConfigCommand::Show => {
                let key = match self.prefs.credential().await? {
                    Some(key) => key.masked(),
                    None => "not set".to_string(),
                };
                let naming = self.prefs.naming().await?;
                let folder = self.prefs.output_folder().await?;
                Ok(format!(
                    "API key:       {}\nNaming:        prefix={:?} start={} position={} (e.g. {})\nOutput folder: {}\n",
                    key,
                    naming.prefix,
                    naming.start_number(),
                    naming.position,
                    naming.preview(),
                    folder.display()
                ))
            }
            ConfigCommand::SetKey { key } => {
                let key = ApiKey::parse(&key).map_err(|e| WorkerError::invalid_argument(e.to_string()))?;
                self.prefs.save_credential(&key).await?;
                Ok(format!("API key saved: {}", key.masked()))
            }
            ConfigCommand::Naming {
                prefix,
                start,
                position,
            } => {
                let mut naming = self.prefs.naming().await?;
                if let Some(prefix) = prefix {
                    naming.prefix = prefix;
                }
                if let Some(start) = start {
                    naming.set_start_number(start);
                }
                if let Some(position) = position {
                    naming.position = position;
                }
                self.prefs.save_naming(&naming).await?;
                Ok(format!("Naming saved. Next file: {}", naming.preview()))
            }
            ConfigCommand::Folder { path } => {
                self.prefs.set_output_folder(&path).await?;
                Ok(format!("Output folder set to {}", path.display()))
            }
        }
    }
}

async fn read_image(path: &Path) -> WorkerResult<ReferenceImage> {
    let bytes = tokio::fs::read(path).await?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    Ok(ReferenceImage::new(bytes, ReferenceImage::mime_type_for_extension(ext)))
}
