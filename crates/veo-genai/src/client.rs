//! Generation client seam.

use async_trait::async_trait;
use veo_models::{ApiKey, GenerationConfig, Job, ModelId, ReferenceImage};

use crate::error::GenAiResult;

/// Parameters for one generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<ReferenceImage>,
    pub model: ModelId,
    pub config: GenerationConfig,
}

impl From<&Job> for GenerationRequest {
    fn from(job: &Job) -> Self {
        Self {
            prompt: job.prompt.clone(),
            image: job.reference_image.clone(),
            model: job.model.clone(),
            config: job.config.clone(),
        }
    }
}

/// A generated video as reported by a finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Percent-decoded download URI
    pub uri: String,
}

/// State of a long-running generation operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    /// Operation resource name, used for polling
    pub name: String,
    pub done: bool,
    /// Generated videos, only meaningful once `done`
    pub artifacts: Vec<ArtifactRef>,
    /// Error reported by the operation itself
    pub error: Option<String>,
    /// Content-filter reasons, if the service dropped results
    pub filtered_reasons: Vec<String>,
}

impl Operation {
    /// A freshly submitted, unfinished operation.
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A finished operation carrying the given artifacts.
    pub fn finished(name: impl Into<String>, artifacts: Vec<ArtifactRef>) -> Self {
        Self {
            name: name.into(),
            done: true,
            artifacts,
            ..Default::default()
        }
    }
}

/// Submits generation requests and reports operation status.
///
/// The caller owns poll cadence and the overall timeout.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Start a generation and return the operation handle.
    async fn submit(&self, credential: &ApiKey, request: &GenerationRequest) -> GenAiResult<Operation>;

    /// Fetch the current state of an operation.
    async fn poll(&self, credential: &ApiKey, operation: &Operation) -> GenAiResult<Operation>;
}
