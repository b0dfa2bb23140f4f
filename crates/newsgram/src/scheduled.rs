//! Posts waiting for their Instagram slot, kept as a JSON list in
//! `<export dir>/scheduled_posts.json`.
//!
//! Entries are either media containers created ahead of time (`scheduled`)
//! or reminders to post by hand when no account could be used
//! (`manual_posting_required`). The file is only ever appended to.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::pipeline::post::PostRecord;

pub const SCHEDULED_POSTS_FILE: &str = "scheduled_posts.json";

const MANUAL_POSTING_INSTRUCTIONS: &str =
    "Post manually to Instagram or configure an Instagram account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledStatus {
    Scheduled,
    ManualPostingRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub topic: String,
    /// Media container to publish once the slot is reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_id: Option<String>,
    pub scheduled_time: DateTime<FixedOffset>,
    pub image_url: String,
    pub caption: String,
    pub status: ScheduledStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledPost {
    pub fn scheduled(post: &PostRecord, creation_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            topic: post.topic.clone(),
            creation_id: Some(creation_id.to_string()),
            scheduled_time: post.scheduled_time,
            image_url: post.image_url.clone(),
            caption: post.caption.clone(),
            status: ScheduledStatus::Scheduled,
            instructions: None,
            created_at: now,
        }
    }

    pub fn manual_reminder(post: &PostRecord, now: DateTime<Utc>) -> Self {
        Self {
            topic: post.topic.clone(),
            creation_id: None,
            scheduled_time: post.scheduled_time,
            image_url: post.image_url.clone(),
            caption: post.caption.clone(),
            status: ScheduledStatus::ManualPostingRequired,
            instructions: Some(MANUAL_POSTING_INSTRUCTIONS.to_string()),
            created_at: now,
        }
    }
}

/// File-backed list of [`ScheduledPost`]s.
///
/// Appends are serialized within the process; jobs on different workers
/// share one store.
#[derive(Debug)]
pub struct ScheduledPostStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ScheduledPostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_directory(directory: &Path) -> Self {
        Self::new(directory.join(SCHEDULED_POSTS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Scheduled post lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Every recorded entry; a missing file is an empty list.
    pub fn load(&self) -> Result<Vec<ScheduledPost>, ExportError> {
        let _guard = self.guard();
        self.read()
    }

    /// Adds `entries` after the existing ones.
    pub fn append(&self, entries: &[ScheduledPost]) -> Result<(), ExportError> {
        if entries.is_empty() {
            return Ok(());
        }

        let _guard = self.guard();
        let mut all = self.read()?;
        all.extend_from_slice(entries);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ExportError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&all)?;
        fs::write(&self.path, json).map_err(|source| ExportError::WriteFile {
            path: self.path.clone(),
            source,
        })?;

        log::info!(
            "Recorded {} scheduled post(s) in {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn read(&self) -> Result<Vec<ScheduledPost>, ExportError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ExportError::ReadFile {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| ExportError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}
