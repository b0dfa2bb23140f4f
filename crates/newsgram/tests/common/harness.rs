//! Test harness for isolated job execution.
//!
//! The `TestHarness` struct owns a running `JobService`, a fixed clock and a
//! temporary export directory, and offers blocking helpers to wait for jobs.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use newsgram::config::Config;
use newsgram::pipeline::FixedClock;
use newsgram::providers::testing::ScriptedSet;
use newsgram::providers::ProviderFactory;
use newsgram::{
    export, HttpProviderFactory, JobError, JobOptions, JobRecord, JobService, ScheduledPost,
    ScheduledPostStore,
};

/// Instant every harness clock is frozen at.
pub const NOW: &str = "2026-05-01T10:00:00Z";

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory exports are written to.
    pub export_dir: PathBuf,
    pub service: JobService,
}

impl TestHarness {
    /// Service driven by scripted providers.
    pub fn scripted(set: &ScriptedSet, config: Config) -> Self {
        Self::with_factory(Arc::new(set.factory()), config)
    }

    /// Service driven by the HTTP providers configured in `config`.
    pub fn http(config: Config) -> Self {
        let factory = HttpProviderFactory::new(config.providers.clone(), config.retry.clone());
        Self::with_factory(Arc::new(factory), config)
    }

    /// The export directory, and with it `scheduled_posts.json`, lives in a
    /// fresh temp dir.
    pub fn with_factory(factory: Arc<dyn ProviderFactory>, mut config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let export_dir = temp_dir.path().join("generated_posts");
        config.export.directory = export_dir.to_string_lossy().into_owned();
        let service = JobService::start_with_clock(&config, factory, Arc::new(FixedClock(now())))
            .expect("Failed to start job service");

        Self {
            temp_dir,
            export_dir,
            service,
        }
    }

    pub fn submit(&self, topics: &[&str], options: JobOptions) -> Result<String, JobError> {
        self.service
            .submit_job(topics.iter().map(|t| t.to_string()).collect(), options)
    }

    /// Blocks until the job is completed or failed.
    pub fn wait(&self, job_id: &str) -> JobRecord {
        self.wait_until(job_id, |record| record.is_finished())
    }

    pub fn wait_until(&self, job_id: &str, done: impl Fn(&JobRecord) -> bool) -> JobRecord {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            let record = self
                .service
                .get_status(job_id)
                .expect("job should exist while waiting");
            if done(&record) {
                return record;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for job {} (status {})",
                job_id,
                record.status
            );
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Submits, waits and returns the final record.
    pub fn run(&self, topics: &[&str], options: JobOptions) -> JobRecord {
        let id = self.submit(topics, options).expect("submission should succeed");
        self.wait(&id)
    }

    /// Submits a URL job, waits and returns the final record.
    pub fn run_url(&self, url: &str, topic: &str, options: JobOptions) -> JobRecord {
        let id = self
            .service
            .submit_url_job(url, topic, options)
            .expect("submission should succeed");
        self.wait(&id)
    }

    /// Entries of the scheduled-post file; empty when nothing was written.
    pub fn scheduled_posts(&self) -> Vec<ScheduledPost> {
        ScheduledPostStore::in_directory(&self.export_dir)
            .load()
            .expect("scheduled posts should be readable")
    }

    pub fn export(&self, job_id: &str) -> PathBuf {
        let posts = self.service.get_result(job_id).expect("job should have posts");
        export::export_to_directory(&posts, &self.export_dir).expect("export should succeed")
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.service.shutdown();
    }
}

pub fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(NOW)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}
