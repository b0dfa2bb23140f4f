//! Job progress events and the broadcaster that streams them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What a progress event reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    Progress,
    Warning,
    Completed,
    Failed,
}

/// Progress event for a job.
///
/// Events are the only way a job record changes after creation; the store
/// merges each one atomically and rejects events that would move the job
/// backwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// Percentage for `Progress` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_posts: Option<usize>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobProgressEvent {
    fn base(job_id: &str, kind: EventKind) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind,
            timestamp: Utc::now(),
            progress: None,
            current_topic: None,
            message: None,
            warning: None,
            total_posts: None,
            error: None,
        }
    }

    pub fn started(job_id: &str) -> Self {
        let mut event = Self::base(job_id, EventKind::Started);
        event.progress = Some(0);
        event.message = Some("Job started".to_string());
        event
    }

    pub fn progress(job_id: &str, progress: u8, current_topic: &str, message: &str) -> Self {
        let mut event = Self::base(job_id, EventKind::Progress);
        event.progress = Some(progress);
        event.current_topic = Some(current_topic.to_string());
        event.message = Some(message.to_string());
        event
    }

    /// A step message that does not move the percentage.
    pub fn message(job_id: &str, message: &str) -> Self {
        let mut event = Self::base(job_id, EventKind::Progress);
        event.message = Some(message.to_string());
        event
    }

    pub fn warning(job_id: &str, warning: &str) -> Self {
        let mut event = Self::base(job_id, EventKind::Warning);
        event.warning = Some(warning.to_string());
        event
    }

    pub fn completed(job_id: &str, total_posts: usize) -> Self {
        let mut event = Self::base(job_id, EventKind::Completed);
        event.progress = Some(100);
        event.total_posts = Some(total_posts);
        event.message = Some(format!("Completed with {} post(s)", total_posts));
        event
    }

    pub fn failed(job_id: &str, error: &str) -> Self {
        let mut event = Self::base(job_id, EventKind::Failed);
        event.error = Some(error.to_string());
        event.message = Some("Job failed".to_string());
        event
    }

    /// Status the job is in once this event has been applied.
    pub fn resulting_status(&self) -> JobStatus {
        match self.kind {
            EventKind::Started | EventKind::Progress | EventKind::Warning => JobStatus::Running,
            EventKind::Completed => JobStatus::Completed,
            EventKind::Failed => JobStatus::Failed,
        }
    }
}

/// Broadcasts accepted job progress events to any number of subscribers.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
