//! Writes finished posts as a JSON artifact.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::error::ExportError;
use crate::pipeline::post::PostRecord;

/// One entry of the exported artifact.
#[derive(Debug, Serialize)]
struct ExportedPost<'a> {
    topic: &'a str,
    image_url: &'a str,
    caption: &'a str,
    hashtags: &'a [String],
    scheduled_time: DateTime<FixedOffset>,
    created_at: DateTime<Utc>,
    auto_posted: bool,
}

impl<'a> From<&'a PostRecord> for ExportedPost<'a> {
    fn from(post: &'a PostRecord) -> Self {
        Self {
            topic: &post.topic,
            image_url: &post.image_url,
            caption: &post.caption,
            hashtags: &post.hashtags,
            scheduled_time: post.scheduled_time,
            created_at: post.created_at,
            auto_posted: post.auto_posted(),
        }
    }
}

/// `<dir>/posts_<YYYYmmdd_HHMMSS>.json`
pub fn default_export_path(directory: &Path, now: DateTime<Utc>) -> PathBuf {
    directory.join(format!("posts_{}.json", now.format("%Y%m%d_%H%M%S")))
}

/// Serializes the posts as a pretty-printed JSON array at `path`,
/// creating parent directories as needed.
pub fn export_posts(posts: &[PostRecord], path: &Path) -> Result<PathBuf, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let entries: Vec<ExportedPost<'_>> = posts.iter().map(ExportedPost::from).collect();
    let json = serde_json::to_string_pretty(&entries)?;
    fs::write(path, json).map_err(|source| ExportError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("Exported {} post(s) to {}", posts.len(), path.display());
    Ok(path.to_path_buf())
}

/// Exports into `directory` under a timestamped file name.
pub fn export_to_directory(posts: &[PostRecord], directory: &Path) -> Result<PathBuf, ExportError> {
    export_posts(posts, &default_export_path(directory, Utc::now()))
}
