//! Queue error types.

use thiserror::Error;
use veo_models::{JobId, JobSpecError, TransitionError};

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already in queue: {0}")]
    Duplicate(JobId),

    #[error("Cannot modify the queue while processing.")]
    Busy,

    #[error("API Key not configured. Please set it in the configuration.")]
    MissingCredential,

    #[error("Job {0} has not completed")]
    NotCompleted(JobId),

    #[error("Invalid job: {0}")]
    InvalidJob(#[from] JobSpecError),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Storage error: {0}")]
    Storage(#[from] veo_storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueueError {
    pub fn is_busy(&self) -> bool {
        matches!(self, QueueError::Busy)
    }
}
