//! In-memory job store: job records plus finished results.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broadcast::job_progress::{EventKind, JobProgressEvent, JobStatus};
use crate::error::JobError;
use crate::pipeline::post::PostRecord;
use crate::worker::job::JobOptions;

/// Highest percentage a running job may report; 100 is reserved for completion.
const MAX_RUNNING_PROGRESS: u8 = 99;

// ─── JobRecord ──────────────────────────────────────────────────────────────

/// Tracked state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    /// 0-100, non-decreasing while running, 100 only when completed.
    pub progress: u8,
    /// Topic being processed; empty before start and after finish.
    pub current_topic: String,
    pub message: String,
    pub topics: Vec<String>,
    pub options: JobOptions,
    /// Article the job generates from, bypassing news search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_posts: Option<usize>,
    /// Non-fatal problems, in the order they happened.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl JobRecord {
    pub fn new(id: &str, topics: Vec<String>, options: JobOptions) -> Self {
        Self {
            id: id.to_string(),
            status: JobStatus::Pending,
            progress: 0,
            current_topic: String::new(),
            message: "Job queued".to_string(),
            topics,
            options,
            source_url: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            failed_at: None,
            error: None,
            total_posts: None,
            warnings: Vec::new(),
        }
    }

    /// Merges an event into the record, enforcing forward-only transitions.
    pub fn apply(&mut self, event: &JobProgressEvent) -> Result<(), JobError> {
        let allowed = match event.kind {
            EventKind::Started => self.status == JobStatus::Pending,
            EventKind::Progress | EventKind::Warning | EventKind::Completed => {
                self.status == JobStatus::Running
            }
            EventKind::Failed => !self.status.is_terminal(),
        };
        if !allowed {
            return Err(JobError::InvalidTransition {
                job_id: self.id.clone(),
                status: self.status,
                kind: event.kind,
            });
        }

        if let Some(message) = &event.message {
            self.message = message.clone();
        }

        match event.kind {
            EventKind::Started => {
                self.status = JobStatus::Running;
                self.started_at = Some(event.timestamp);
            }
            EventKind::Progress => {
                if let Some(progress) = event.progress {
                    self.progress = self.progress.max(progress.min(MAX_RUNNING_PROGRESS));
                }
                if let Some(topic) = &event.current_topic {
                    self.current_topic = topic.clone();
                }
            }
            EventKind::Warning => {
                if let Some(warning) = &event.warning {
                    self.warnings.push(warning.clone());
                }
            }
            EventKind::Completed => {
                self.status = JobStatus::Completed;
                self.progress = 100;
                self.current_topic.clear();
                self.total_posts = Some(event.total_posts.unwrap_or(0));
                self.completed_at = Some(event.timestamp);
            }
            EventKind::Failed => {
                self.status = JobStatus::Failed;
                self.current_topic.clear();
                self.error = Some(
                    event
                        .error
                        .clone()
                        .unwrap_or_else(|| "Job failed".to_string()),
                );
                self.failed_at = Some(event.timestamp);
            }
        }

        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.or(self.failed_at)
    }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

// ─── JobStore ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    jobs: HashMap<String, JobRecord>,
    results: HashMap<String, Vec<PostRecord>>,
}

/// Authoritative map from job id to record and results.
///
/// Every operation is one critical section under a single `RwLock`, so a
/// reader never observes a half-applied event or a result without its record.
/// Finished jobs beyond `max_finished` are pruned, oldest first, on `create`.
pub struct JobStore {
    state: RwLock<StoreState>,
    max_finished: usize,
}

impl JobStore {
    pub fn new(max_finished: usize) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            max_finished: max_finished.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Inserts a pending record under a fresh id.
    pub fn create(&self, topics: Vec<String>, options: JobOptions) -> String {
        self.create_with_source(topics, options, None)
    }

    /// Like [`JobStore::create`], recording the article URL of a URL job.
    pub fn create_with_source(
        &self,
        topics: Vec<String>,
        options: JobOptions,
        source_url: Option<String>,
    ) -> String {
        let mut state = self.write();
        let mut id = uuid::Uuid::new_v4().to_string();
        while state.jobs.contains_key(&id) {
            id = uuid::Uuid::new_v4().to_string();
        }

        let mut record = JobRecord::new(&id, topics, options);
        record.source_url = source_url;
        state.jobs.insert(id.clone(), record);
        Self::prune(&mut state, self.max_finished);
        log::debug!("Created job {}", id);
        id
    }

    pub fn get(&self, job_id: &str) -> Result<JobRecord, JobError> {
        self.read()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Applies an event and returns the updated snapshot.
    pub fn update(&self, event: &JobProgressEvent) -> Result<JobRecord, JobError> {
        let mut state = self.write();
        let job = state
            .jobs
            .get_mut(&event.job_id)
            .ok_or_else(|| JobError::NotFound(event.job_id.clone()))?;
        job.apply(event)?;
        Ok(job.clone())
    }

    /// Stores the finished posts. They become visible once the job completes.
    pub fn put_result(&self, job_id: &str, posts: Vec<PostRecord>) -> Result<(), JobError> {
        let mut state = self.write();
        if !state.jobs.contains_key(job_id) {
            return Err(JobError::NotFound(job_id.to_string()));
        }
        state.results.insert(job_id.to_string(), posts);
        Ok(())
    }

    /// Posts of a completed job. Unknown, unfinished and failed jobs have none.
    pub fn get_result(&self, job_id: &str) -> Result<Vec<PostRecord>, JobError> {
        let state = self.read();
        match state.jobs.get(job_id) {
            Some(job) if job.status == JobStatus::Completed => state
                .results
                .get(job_id)
                .cloned()
                .ok_or_else(|| JobError::NotFound(job_id.to_string())),
            _ => Err(JobError::NotFound(job_id.to_string())),
        }
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.read().jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn counts(&self) -> JobCounts {
        let state = self.read();
        let mut counts = JobCounts::default();
        for job in state.jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Drops the oldest finished jobs beyond the retention limit.
    /// Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut state = self.write();
        Self::prune(&mut state, self.max_finished)
    }

    fn prune(state: &mut StoreState, max_finished: usize) -> usize {
        let mut finished: Vec<(DateTime<Utc>, String)> = state
            .jobs
            .values()
            .filter_map(|job| job.finished_at().map(|at| (at, job.id.clone())))
            .collect();
        if finished.len() <= max_finished {
            return 0;
        }

        finished.sort();
        let excess = finished.len() - max_finished;
        for (_, id) in finished.into_iter().take(excess) {
            state.jobs.remove(&id);
            state.results.remove(&id);
        }
        log::debug!("Pruned {} finished job(s)", excess);
        excess
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(100)
    }
}
