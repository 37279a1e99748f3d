//! Output filename policy.

use veo_models::{Job, NamingSettings};

use crate::store::JobStore;

/// Filename for `job` given the current completed set.
///
/// The sequence number is `start_number + index`, where `index` is the job's
/// position among completed jobs in insertion order at the time of the call.
/// Jobs that have not completed get an id-based name.
pub fn compute_filename(job: &Job, store: &JobStore, settings: &NamingSettings) -> String {
    match store.completed_position(&job.id) {
        Some(index) => settings.format(u64::from(settings.start_number()) + index as u64),
        None => format!("{}.mp4", job.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veo_models::{GenerationConfig, JobId, JobResult, ModelId, NamingPosition};

    fn store_with(completed: &[bool]) -> (JobStore, Vec<JobId>) {
        let mut store = JobStore::new();
        let mut ids = Vec::new();
        for done in completed {
            let job = Job::new("p", None, ModelId::default(), GenerationConfig::default());
            ids.push(job.id.clone());
            store.enqueue(job).unwrap();
            if *done {
                store
                    .update(ids.last().unwrap(), |j| {
                        j.start().unwrap();
                        j.complete(JobResult {
                            uri: "u".into(),
                            preview_path: None,
                        })
                        .unwrap();
                    })
                    .unwrap();
            }
        }
        (store, ids)
    }

    #[test]
    fn test_third_completed_job() {
        let (store, ids) = store_with(&[true, false, true, true]);
        let job = store.get(&ids[3]).unwrap();

        let after = NamingSettings::new("clip_", 1, NamingPosition::After);
        assert_eq!(compute_filename(job, &store, &after), "clip_003.mp4");

        let before = NamingSettings::new("clip_", 1, NamingPosition::Before);
        assert_eq!(compute_filename(job, &store, &before), "003clip_.mp4");
    }

    #[test]
    fn test_start_number_offsets_sequence() {
        let (store, ids) = store_with(&[true, true]);
        let settings = NamingSettings::new("video_", 10, NamingPosition::After);
        assert_eq!(
            compute_filename(store.get(&ids[1]).unwrap(), &store, &settings),
            "video_011.mp4"
        );
    }

    #[test]
    fn test_incomplete_job_falls_back_to_id() {
        let (store, ids) = store_with(&[true, false]);
        let job = store.get(&ids[1]).unwrap();
        assert_eq!(
            compute_filename(job, &store, &NamingSettings::default()),
            format!("{}.mp4", ids[1])
        );
    }

    #[test]
    fn test_deterministic() {
        let (store, ids) = store_with(&[true, true, true]);
        let settings = NamingSettings::default();
        let job = store.get(&ids[2]).unwrap();
        assert_eq!(
            compute_filename(job, &store, &settings),
            compute_filename(job, &store, &settings)
        );
    }
}
