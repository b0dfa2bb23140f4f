use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Upper bound for `max_posts` per topic.
pub const MAX_POSTS_LIMIT: u32 = 10;

/// Recency window passed to the news search provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeRange {
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
    NoLimit,
}

impl TimeRange {
    /// The provider's wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneDay => "oneDay",
            TimeRange::OneWeek => "oneWeek",
            TimeRange::OneMonth => "oneMonth",
            TimeRange::OneYear => "oneYear",
            TimeRange::NoLimit => "noLimit",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oneDay" => Ok(TimeRange::OneDay),
            "oneWeek" => Ok(TimeRange::OneWeek),
            "oneMonth" => Ok(TimeRange::OneMonth),
            "oneYear" => Ok(TimeRange::OneYear),
            "noLimit" => Ok(TimeRange::NoLimit),
            other => Err(format!(
                "unknown time range '{}' (expected oneDay, oneWeek, oneMonth, oneYear or noLimit)",
                other
            )),
        }
    }
}

/// Per-job options, snapshotted when the job is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub time_range: TimeRange,
    pub max_posts: u32,
    pub auto_post: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            max_posts: 3,
            auto_post: false,
        }
    }
}

/// Cooperative cancellation flag shared between the service and a runner.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A job as handed to the worker pool. The record itself lives in the store.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub topics: Vec<String>,
    pub options: JobOptions,
    /// Set for URL jobs: the single topic is generated from this article
    /// instead of from news search.
    pub source_url: Option<String>,
    pub cancel: CancelFlag,
}

impl Job {
    pub fn new(id: impl Into<String>, topics: Vec<String>, options: JobOptions) -> Self {
        Self {
            id: id.into(),
            topics,
            options,
            source_url: None,
            cancel: CancelFlag::new(),
        }
    }

    pub fn for_url(
        id: impl Into<String>,
        topic: impl Into<String>,
        url: impl Into<String>,
        options: JobOptions,
    ) -> Self {
        Self {
            source_url: Some(url.into()),
            ..Self::new(id, vec![topic.into()], options)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_wire_values() {
        assert_eq!(
            serde_json::to_string(&TimeRange::OneWeek).unwrap(),
            "\"oneWeek\""
        );
        let parsed: TimeRange = serde_json::from_str("\"noLimit\"").unwrap();
        assert_eq!(parsed, TimeRange::NoLimit);
        assert_eq!(TimeRange::OneMonth.to_string(), "oneMonth");
    }

    #[test]
    fn test_time_range_from_str() {
        assert_eq!("oneYear".parse::<TimeRange>().unwrap(), TimeRange::OneYear);
        assert!("yesterday".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_options_default() {
        let options = JobOptions::default();
        assert_eq!(options.time_range, TimeRange::OneDay);
        assert_eq!(options.max_posts, 3);
        assert!(!options.auto_post);
    }

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let job = Job::new("job-1", vec!["tech".to_string()], JobOptions::default());
        let handle = job.clone();
        assert!(!job.cancel.is_cancelled());

        handle.cancel.cancel();

        assert!(job.cancel.is_cancelled());
    }

    #[test]
    fn test_url_job_has_one_topic() {
        let job = Job::for_url("job-1", "ekonomi", "https://news.test/a", JobOptions::default());
        assert_eq!(job.topics, vec!["ekonomi".to_string()]);
        assert_eq!(job.source_url.as_deref(), Some("https://news.test/a"));
        assert!(Job::new("job-2", vec![], JobOptions::default()).source_url.is_none());
    }
}
