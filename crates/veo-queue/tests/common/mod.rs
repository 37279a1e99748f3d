//! Scripted collaborators for engine tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use veo_genai::{
    ArtifactFetcher, ArtifactRef, ExportOutcome, GenAiError, GenAiResult, GenerationClient,
    GenerationRequest, MaterializedArtifact, Operation,
};
use veo_models::{ApiKey, JobId, JobSpec};
use veo_queue::{EngineConfig, Notifier, QueueEngine};
use veo_storage::{MemoryStore, Preferences, SnapshotStore};

pub const KEY: &str = "AIzaSyTestKey987654";
pub const OUTPUT: &str = "/tmp/veo-queue-tests";

/// How the fake service treats a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Done on the first poll with one video
    Ready,
    /// Never finishes
    Pending,
    /// Finishes with every result removed by the content filter
    Filtered,
    /// Finishes with an operation error
    OperationError,
    /// Submission rejected as a bad key
    RejectKey,
    /// Submission fails with a server error
    SubmitError,
    /// Status checks fail
    PollError,
}

#[derive(Default)]
pub struct FakeClient {
    scripts: Mutex<HashMap<String, Script>>,
    submitted: Mutex<Vec<String>>,
    polls: Mutex<HashMap<String, u32>>,
}

impl FakeClient {
    pub fn script(&self, prompt: &str, script: Script) {
        self.scripts.lock().unwrap().insert(prompt.to_string(), script);
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    /// Status checks made for the prompt's operation.
    pub fn polls(&self, prompt: &str) -> u32 {
        self.polls.lock().unwrap().get(prompt).copied().unwrap_or(0)
    }

    fn script_for(&self, prompt: &str) -> Script {
        self.scripts.lock().unwrap().get(prompt).copied().unwrap_or(Script::Ready)
    }
}

#[async_trait]
impl GenerationClient for FakeClient {
    async fn submit(&self, credential: &ApiKey, request: &GenerationRequest) -> GenAiResult<Operation> {
        assert_eq!(credential.expose(), KEY);
        self.submitted.lock().unwrap().push(request.prompt.clone());

        match self.script_for(&request.prompt) {
            Script::RejectKey => Err(GenAiError::from_status(
                400,
                "API key not valid. Please pass a valid API key.".into(),
            )),
            Script::SubmitError => Err(GenAiError::from_status(500, "internal".into())),
            _ => Ok(Operation::pending(format!("operations/{}", request.prompt))),
        }
    }

    async fn poll(&self, _credential: &ApiKey, operation: &Operation) -> GenAiResult<Operation> {
        let prompt = operation.name.trim_start_matches("operations/");
        let name = operation.name.clone();
        *self.polls.lock().unwrap().entry(prompt.to_string()).or_default() += 1;

        match self.script_for(prompt) {
            Script::Pending => Ok(Operation::pending(name)),
            Script::PollError => Err(GenAiError::from_status(503, "unavailable".into())),
            Script::Filtered => Ok(Operation {
                filtered_reasons: vec!["blocked by safety filter".into()],
                ..Operation::finished(name, Vec::new())
            }),
            Script::OperationError => Ok(Operation {
                error: Some("quota exceeded".into()),
                ..Operation::finished(name, Vec::new())
            }),
            _ => Ok(Operation::finished(
                name,
                vec![ArtifactRef {
                    uri: format!("https://files.example/{}.mp4", prompt.replace(' ', "-")),
                }],
            )),
        }
    }
}

/// Records exports; can be told to fail them.
#[derive(Default)]
pub struct FakeFetcher {
    fail_exports: AtomicBool,
    exports: Mutex<Vec<PathBuf>>,
}

impl FakeFetcher {
    pub fn fail_exports(&self, fail: bool) {
        self.fail_exports.store(fail, Ordering::SeqCst);
    }

    pub fn exports(&self) -> Vec<PathBuf> {
        self.exports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn materialize(
        &self,
        artifact: &ArtifactRef,
        _credential: &ApiKey,
        job_id: &JobId,
    ) -> GenAiResult<MaterializedArtifact> {
        Ok(MaterializedArtifact {
            preview_path: Some(PathBuf::from(format!("/cache/{}.mp4", job_id))),
            uri: artifact.uri.clone(),
        })
    }

    async fn export_to(&self, _uri: &str, _credential: &ApiKey, folder: &Path, filename: &str) -> ExportOutcome {
        if self.fail_exports.load(Ordering::SeqCst) {
            return ExportOutcome::Failed {
                reason: "disk full".into(),
            };
        }
        let path = folder.join(filename);
        self.exports.lock().unwrap().push(path.clone());
        ExportOutcome::Saved { path }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    transient: Mutex<Vec<String>>,
    system: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn transient(&self) -> Vec<String> {
        self.transient.lock().unwrap().clone()
    }

    pub fn system_titles(&self) -> Vec<String> {
        self.system.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn system(&self) -> Vec<(String, String)> {
        self.system.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_transient(&self, message: &str) {
        self.transient.lock().unwrap().push(message.to_string());
    }

    fn notify_system(&self, title: &str, body: &str) {
        self.system.lock().unwrap().push((title.to_string(), body.to_string()));
    }
}

pub struct Harness {
    pub engine: QueueEngine,
    pub client: Arc<FakeClient>,
    pub fetcher: Arc<FakeFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<dyn SnapshotStore>,
}

impl Harness {
    /// Engine over an in-memory store with a configured key.
    pub fn in_memory() -> (Self, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::new());
        let harness = Self::with_store(memory.clone(), true);
        (harness, memory)
    }

    pub fn with_store(store: Arc<dyn SnapshotStore>, with_key: bool) -> Self {
        let key = with_key.then(|| ApiKey::parse(KEY).unwrap());
        let prefs = Preferences::new(store.clone(), OUTPUT).with_credential_override(key);
        let client = Arc::new(FakeClient::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let config = EngineConfig {
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: 30,
        };
        let engine = QueueEngine::new(config, prefs, client.clone(), fetcher.clone(), notifier.clone());

        Self {
            engine,
            client,
            fetcher,
            notifier,
            store,
        }
    }

    /// Enqueue one job per prompt, returning ids in order.
    pub async fn add(&self, prompts: &[&str]) -> Vec<JobId> {
        let mut ids = Vec::new();
        for prompt in prompts {
            ids.extend(self.engine.enqueue(JobSpec::new(*prompt)).await.unwrap());
        }
        ids
    }

    /// Wait until a spawned run has claimed the processing flag.
    pub async fn wait_until_processing(&self) {
        while !self.engine.is_processing() {
            tokio::task::yield_now().await;
        }
    }
}
