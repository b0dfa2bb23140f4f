use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Where a post stands with Instagram once its job has finished.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PublishStatus {
    /// Generated only; auto-post was off or publishing failed.
    #[default]
    Draft,
    Published {
        media_id: String,
    },
    /// A media container exists and waits for its posting slot.
    Scheduled {
        container_id: String,
    },
    /// Auto-post was requested but no account could be used.
    ManualPostingRequired,
}

/// A ready-to-publish Instagram post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub topic: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub image_url: String,
    pub scheduled_time: DateTime<FixedOffset>,
    pub created_at: DateTime<Utc>,
    /// Article the post was generated from.
    pub source_url: String,
    #[serde(default)]
    pub publish_status: PublishStatus,
}

impl PostRecord {
    pub fn auto_posted(&self) -> bool {
        matches!(self.publish_status, PublishStatus::Published { .. })
    }

    /// Instagram media id, once published.
    pub fn media_id(&self) -> Option<&str> {
        match &self.publish_status {
            PublishStatus::Published { media_id } => Some(media_id),
            _ => None,
        }
    }

    /// Whether the posting slot has been reached at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_time.with_timezone(&Utc) <= now
    }

    pub fn with_status(self, publish_status: PublishStatus) -> Self {
        Self {
            publish_status,
            ..self
        }
    }

    /// Returns the record marked as published under `media_id`.
    pub fn published_as(self, media_id: String) -> Self {
        self.with_status(PublishStatus::Published { media_id })
    }
}
