use std::sync::Arc;

use crate::broadcast::job_progress::{JobProgressBroadcaster, JobProgressEvent};
use crate::broadcast::job_store::JobStore;
use crate::error::JobError;

use super::post::PostRecord;

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: JobProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: JobProgressEvent) {}
}

/// Merges events into the job store and broadcasts the ones it accepts.
///
/// The store is the single writer of job records; a rejected event is logged
/// and never reaches subscribers.
#[derive(Clone)]
pub struct StoreProgress {
    store: Arc<JobStore>,
    broadcaster: JobProgressBroadcaster,
}

impl StoreProgress {
    pub fn new(store: Arc<JobStore>, broadcaster: JobProgressBroadcaster) -> Self {
        Self { store, broadcaster }
    }

    pub fn put_result(&self, job_id: &str, posts: Vec<PostRecord>) -> Result<(), JobError> {
        self.store.put_result(job_id, posts)
    }
}

impl ProgressReporter for StoreProgress {
    fn report(&self, event: JobProgressEvent) {
        match self.store.update(&event) {
            Ok(_) => self.broadcaster.send(event),
            Err(e) => log::warn!("Dropped {:?} event for job {}: {}", event.kind, event.job_id, e),
        }
    }
}

/// Collects events in memory.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingProgress {
    events: std::sync::Mutex<Vec<JobProgressEvent>>,
}

#[cfg(test)]
impl RecordingProgress {
    pub fn events(&self) -> Vec<JobProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().filter_map(|e| e.message).collect()
    }
}

#[cfg(test)]
impl ProgressReporter for RecordingProgress {
    fn report(&self, event: JobProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::job_progress::EventKind;
    use crate::worker::job::JobOptions;

    #[tokio::test]
    async fn test_accepted_events_are_broadcast() {
        let store = Arc::new(JobStore::default());
        let broadcaster = JobProgressBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();
        let progress = StoreProgress::new(store.clone(), broadcaster);
        let id = store.create(vec!["tech".to_string()], JobOptions::default());

        progress.report(JobProgressEvent::started(&id));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Started);
        assert_eq!(
            store.get(&id).unwrap().status,
            crate::broadcast::job_progress::JobStatus::Running
        );
    }

    #[test]
    fn test_rejected_events_are_not_broadcast() {
        let store = Arc::new(JobStore::default());
        let broadcaster = JobProgressBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();
        let progress = StoreProgress::new(store.clone(), broadcaster);
        let id = store.create(vec!["tech".to_string()], JobOptions::default());

        // Completed while pending is rejected by the store.
        progress.report(JobProgressEvent::completed(&id, 1));
        progress.report(JobProgressEvent::started("unknown-job"));

        assert!(rx.try_recv().is_err());
    }
}
