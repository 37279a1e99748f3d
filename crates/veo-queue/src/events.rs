//! Observer events and queue statistics.

use veo_models::{Job, JobId};

/// Events broadcast by the engine.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A processing run began
    RunStarted,
    /// A job was added or changed state
    JobUpdated(Job),
    /// Generation succeeded but the automatic export did not
    ExportFailed { job_id: JobId, reason: String },
    /// The run stopped before the queue drained
    RunHalted { reason: String },
    /// No queued jobs remain
    RunFinished,
}

/// Job counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub queued: usize,
    pub generating: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.queued + self.generating + self.completed + self.failed
    }
}

impl std::fmt::Display for QueueStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [
            (self.queued, "queued"),
            (self.generating, "generating"),
            (self.completed, "completed"),
            (self.failed, "failed"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{} {}", n, label))
        .collect();

        if parts.is_empty() {
            write!(f, "empty")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
