//! Job definitions for the generation queue.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{GenerationConfig, ModelId, ReferenceImage};

/// Maximum number of copies a single [`JobSpec`] may enqueue.
pub const MAX_BATCH_SIZE: u32 = 20;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
///
/// Transitions only move forward: `queued -> generating -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for the engine
    #[default]
    Queued,
    /// Submitted and being polled
    Generating,
    /// Generated successfully
    Completed,
    /// Failed; see the recorded error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a job ended in `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Submitting the generation request failed
    SubmitFailure,
    /// A status poll errored
    PollFailure,
    /// The poll budget ran out before the operation finished
    Timeout,
    /// The operation finished without any video (e.g. filtered)
    EmptyResult,
    /// The generated video could not be retrieved
    FetchFailure,
    /// The service rejected the API key
    InvalidCredential,
    /// The process stopped while the job was generating
    Interrupted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SubmitFailure => "submit_failure",
            FailureKind::PollFailure => "poll_failure",
            FailureKind::Timeout => "timeout",
            FailureKind::EmptyResult => "empty_result",
            FailureKind::FetchFailure => "fetch_failure",
            FailureKind::InvalidCredential => "invalid_credential",
            FailureKind::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a generated video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobResult {
    /// Service URI the video can be re-fetched from (no credential embedded)
    pub uri: String,
    /// Locally cached copy used for previews
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_path: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Job {job_id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One generation request and its evolving outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Text prompt
    pub prompt: String,

    /// Optional conditioning image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<ReferenceImage>,

    /// Model to invoke
    #[serde(default)]
    pub model: ModelId,

    /// Generation parameters
    #[serde(default)]
    pub config: GenerationConfig,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<JobResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    download_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<FailureKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a queued job.
    pub fn new(
        prompt: impl Into<String>,
        reference_image: Option<ReferenceImage>,
        model: ModelId,
        config: GenerationConfig,
    ) -> Self {
        Self {
            id: JobId::new(),
            prompt: prompt.into(),
            reference_image,
            model,
            config,
            created_at: Utc::now(),
            status: JobStatus::Queued,
            result: None,
            download_path: None,
            error: None,
            error_kind: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    pub fn download_path(&self) -> Option<&Path> {
        self.download_path.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_kind(&self) -> Option<FailureKind> {
        self.error_kind
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    fn transition(&self, to: JobStatus) -> TransitionError {
        TransitionError {
            job_id: self.id.clone(),
            from: self.status,
            to,
        }
    }

    /// `queued -> generating`
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.status != JobStatus::Queued {
            return Err(self.transition(JobStatus::Generating));
        }
        self.status = JobStatus::Generating;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `generating -> completed`
    pub fn complete(&mut self, result: JobResult) -> Result<(), TransitionError> {
        if self.status != JobStatus::Generating {
            return Err(self.transition(JobStatus::Completed));
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `generating -> failed`
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) -> Result<(), TransitionError> {
        if self.status != JobStatus::Generating {
            return Err(self.transition(JobStatus::Failed));
        }
        self.status = JobStatus::Failed;
        self.error = Some(message.into());
        self.error_kind = Some(kind);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Record where the video was exported. Only valid once completed.
    pub fn set_download_path(&mut self, path: PathBuf) -> Result<(), TransitionError> {
        if self.status != JobStatus::Completed {
            return Err(self.transition(JobStatus::Completed));
        }
        self.download_path = Some(path);
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobSpecError {
    #[error("Please enter a prompt.")]
    EmptyPrompt,
    #[error("Batch size must be between 1 and 20, got {0}")]
    BatchSize(u32),
}

/// Request to enqueue one or more identical jobs.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub prompt: String,
    pub reference_image: Option<ReferenceImage>,
    pub model: ModelId,
    pub config: GenerationConfig,
    /// Number of copies to enqueue
    pub count: u32,
}

impl JobSpec {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reference_image: None,
            model: ModelId::default(),
            config: GenerationConfig::default(),
            count: 1,
        }
    }

    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = model;
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reference_image(mut self, image: Option<ReferenceImage>) -> Self {
        self.reference_image = image;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Validate and expand into `count` queued jobs.
    pub fn into_jobs(self) -> Result<Vec<Job>, JobSpecError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(JobSpecError::EmptyPrompt);
        }
        if self.count == 0 || self.count > MAX_BATCH_SIZE {
            return Err(JobSpecError::BatchSize(self.count));
        }

        Ok((0..self.count)
            .map(|_| {
                Job::new(
                    prompt,
                    self.reference_image.clone(),
                    self.model.clone(),
                    self.config.clone(),
                )
            })
            .collect())
    }
}
