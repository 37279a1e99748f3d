//! Ordered job collection with durable snapshots.

use tracing::warn;
use veo_models::{FailureKind, Job, JobId, JobStatus};

use crate::error::{QueueError, QueueResult};
use crate::events::QueueStats;

/// Jobs in insertion order.
///
/// Insertion order is the only ordering: it picks the next job to run and
/// numbers completed jobs for naming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobStore {
    jobs: Vec<Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a queued job.
    pub fn enqueue(&mut self, job: Job) -> QueueResult<()> {
        if job.status() != JobStatus::Queued {
            return Err(QueueError::InvalidTransition(veo_models::TransitionError {
                job_id: job.id.clone(),
                from: job.status(),
                to: JobStatus::Queued,
            }));
        }
        if self.get(&job.id).is_some() {
            return Err(QueueError::Duplicate(job.id));
        }
        self.jobs.push(job);
        Ok(())
    }

    /// First queued job by insertion order.
    pub fn find_next(&self) -> Option<&Job> {
        self.jobs.iter().find(|j| j.status() == JobStatus::Queued)
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    /// Apply a mutation to the job with `id`.
    pub fn update<R>(&mut self, id: &JobId, mutation: impl FnOnce(&mut Job) -> R) -> QueueResult<R> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| &j.id == id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;
        Ok(mutation(job))
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Zero-based position of `id` among completed jobs.
    pub fn completed_position(&self, id: &JobId) -> Option<usize> {
        self.jobs
            .iter()
            .filter(|j| j.status() == JobStatus::Completed)
            .position(|j| &j.id == id)
    }

    /// Count jobs per status.
    pub fn stats(&self) -> QueueStats {
        self.jobs.iter().fold(QueueStats::default(), |mut stats, job| {
            match job.status() {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Generating => stats.generating += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
            stats
        })
    }

    /// Serialize the full ordered collection.
    pub fn snapshot(&self) -> QueueResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.jobs)?)
    }

    /// Replace the collection with a snapshot.
    pub fn restore(&mut self, data: &[u8]) -> QueueResult<()> {
        self.jobs = serde_json::from_slice(data)?;
        Ok(())
    }

    /// Fail every job left in `generating` by an earlier process.
    pub fn recover_interrupted(&mut self) -> Vec<JobId> {
        let mut recovered = Vec::new();
        for job in self.jobs.iter_mut().filter(|j| j.status() == JobStatus::Generating) {
            if let Err(e) = job.fail(
                FailureKind::Interrupted,
                "Generation was interrupted before it finished. Please add the job again.",
            ) {
                warn!("Could not recover job {}: {}", job.id, e);
                continue;
            }
            recovered.push(job.id.clone());
        }
        recovered
    }

    /// Remove every job.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
