//! Structured job logging.
//!
//! Every line carries the job id and stage so a single job can be followed
//! through submit, poll, fetch and export.

use std::path::Path;

use tracing::{debug, error, info, info_span, warn, Span};
use veo_models::{FailureKind, JobId};

/// Longest prompt excerpt written to the log.
const PROMPT_EXCERPT: usize = 80;

/// Lifecycle logger bound to one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    stage: &'static str,
    span: Span,
}

impl JobLogger {
    /// `stage` names the engine step, e.g. "generate" or "export".
    pub fn new(job_id: &JobId, stage: &'static str) -> Self {
        Self {
            job_id: job_id.clone(),
            stage,
            span: info_span!("job", job_id = %job_id, stage),
        }
    }

    /// Span to instrument the job's futures with.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn started(&self, prompt: &str) {
        info!(job_id = %self.job_id, stage = self.stage, prompt = %excerpt(prompt), "Generation started");
    }

    pub fn submitted(&self, operation: &str) {
        info!(job_id = %self.job_id, stage = self.stage, operation, "Operation submitted");
    }

    pub fn polled(&self, attempt: u32, done: bool) {
        debug!(job_id = %self.job_id, stage = self.stage, attempt, done, "Operation polled");
    }

    pub fn completed(&self, uri: &str) {
        info!(job_id = %self.job_id, stage = self.stage, uri, "Video generated");
    }

    pub fn exported(&self, path: &Path) {
        info!(job_id = %self.job_id, stage = self.stage, path = %path.display(), "Video exported");
    }

    pub fn export_failed(&self, reason: &str) {
        warn!(job_id = %self.job_id, stage = self.stage, "Automatic export failed: {}", reason);
    }

    pub fn failed(&self, kind: FailureKind, message: &str) {
        error!(job_id = %self.job_id, stage = self.stage, kind = %kind, "Job failed: {}", message);
    }

    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, stage = self.stage, "{}", message);
    }
}

fn excerpt(prompt: &str) -> String {
    match prompt.char_indices().nth(PROMPT_EXCERPT) {
        Some((cut, _)) => format!("{}…", &prompt[..cut]),
        None => prompt.to_string(),
    }
}
