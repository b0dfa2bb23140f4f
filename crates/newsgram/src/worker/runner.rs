//! Drives one job from `pending` to a terminal state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, info_span, warn, Instrument};

use crate::broadcast::job_progress::JobProgressEvent;
use crate::error::JobError;
use crate::pipeline::progress::{ProgressReporter, StoreProgress};
use crate::pipeline::schedule::{Clock, PostingScheduler, SystemClock};
use crate::pipeline::{
    Pipeline, PipelineConfig, PipelineContext, PipelineError, PostRecord, PublishStatus,
};
use crate::providers::{ProviderFactory, SocialPublisher};
use crate::scheduled::{ScheduledPost, ScheduledPostStore};
use crate::worker::job::{CancelFlag, Job};

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { total_posts: usize },
    Failed { error: String },
}

pub struct JobRunner {
    factory: Arc<dyn ProviderFactory>,
    progress: StoreProgress,
    config: Arc<PipelineConfig>,
    clock: Arc<dyn Clock>,
    scheduled: ScheduledPostStore,
}

impl JobRunner {
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        progress: StoreProgress,
        config: Arc<PipelineConfig>,
    ) -> Self {
        let scheduled = ScheduledPostStore::in_directory(&config.export_directory);
        Self {
            factory,
            progress,
            config,
            clock: Arc::new(SystemClock),
            scheduled,
        }
    }

    /// Replaces the clock used for posting times.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self, job: Job) -> JobOutcome {
        let span = info_span!("job", job_id = %job.id, topics = job.topics.len());
        self.run_job(&job).instrument(span).await
    }

    /// Marks a job failed from outside the runner, e.g. after a panic.
    pub fn mark_failed(&self, job_id: &str, error: &str) -> JobOutcome {
        self.progress.report(JobProgressEvent::failed(job_id, error));
        JobOutcome::Failed {
            error: error.to_string(),
        }
    }

    async fn run_job(&self, job: &Job) -> JobOutcome {
        let id = job.id.as_str();
        let total_topics = job.topics.len();

        if job.cancel.is_cancelled() {
            return self.mark_failed(id, "Job cancelled before start");
        }
        self.progress.report(JobProgressEvent::started(id));
        info!("Job started");

        let providers = match self.factory.build() {
            Ok(providers) => providers,
            Err(e) => {
                let error = JobError::Internal(format!("Failed to initialize providers: {}", e));
                warn!(error = %error, "Job setup failed");
                return self.mark_failed(id, &error.to_string());
            }
        };

        let publisher = if job.options.auto_post {
            self.prepare_publisher(id, providers.publisher.clone()).await
        } else {
            None
        };

        let scheduler = Arc::new(PostingScheduler::new(
            &self.config.scheduling,
            self.clock.clone(),
        ));
        let pipeline = Pipeline::new(self.config.clone(), providers, scheduler);

        let mut posts: Vec<PostRecord> = Vec::new();
        let mut publish_attempts = 0usize;

        for (index, topic) in job.topics.iter().enumerate() {
            if job.cancel.is_cancelled() {
                return self.mark_failed(id, "Job cancelled");
            }

            let percent = (index * 100 / total_topics) as u8;
            self.progress.report(JobProgressEvent::progress(
                id,
                percent,
                topic,
                &format!("Processing topic {}/{}: {}", index + 1, total_topics, topic),
            ));

            let ctx = PipelineContext::new(id, topic, job.options, job.cancel.clone());
            let (result, ctx) = match &job.source_url {
                Some(url) => pipeline.run_url(ctx, url, &self.progress).await,
                None => pipeline.run(ctx, &self.progress).await,
            };
            for warning in &ctx.warnings {
                self.warn(id, &warning.to_string());
            }

            match result {
                Ok(()) => {}
                Err(PipelineError::Cancelled) => return self.mark_failed(id, "Job cancelled"),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Topic failed");
                    self.warn(id, &format!("Topic '{}' failed: {}", topic, e));
                    continue;
                }
            }

            let topic_posts = if job.options.auto_post {
                let delivered = self
                    .deliver_posts(
                        id,
                        publisher.as_deref(),
                        ctx.posts,
                        &job.cancel,
                        &mut publish_attempts,
                    )
                    .await;
                match delivered {
                    Ok(delivered) => delivered,
                    Err(PipelineError::Cancelled) => return self.mark_failed(id, "Job cancelled"),
                    Err(e) => return self.mark_failed(id, &e.to_string()),
                }
            } else {
                ctx.posts
            };
            posts.extend(topic_posts);
        }

        if posts.is_empty() {
            return self.mark_failed(
                id,
                &format!(
                    "No posts were generated for any of the {} topic(s)",
                    total_topics
                ),
            );
        }

        let total_posts = posts.len();
        if let Err(e) = self.progress.put_result(id, posts) {
            return self.mark_failed(id, &JobError::Internal(e.to_string()).to_string());
        }
        self.progress
            .report(JobProgressEvent::completed(id, total_posts));
        info!(total_posts, "Job completed");

        JobOutcome::Completed { total_posts }
    }

    /// Verifies the publishing account. Any problem disables auto-post for
    /// this job and is recorded as a warning; its posts become reminders.
    async fn prepare_publisher(
        &self,
        job_id: &str,
        publisher: Option<Arc<dyn SocialPublisher>>,
    ) -> Option<Arc<dyn SocialPublisher>> {
        let Some(publisher) = publisher else {
            self.warn(
                job_id,
                "Auto-post disabled: no Instagram account is configured",
            );
            return None;
        };

        match publisher
            .verify()
            .instrument(info_span!("verify_publisher"))
            .await
        {
            Ok(account) => {
                info!(account = %account, "Auto-post enabled");
                Some(publisher)
            }
            Err(e) => {
                self.warn(
                    job_id,
                    &format!("Auto-post disabled: Instagram verification failed: {}", e),
                );
                None
            }
        }
    }

    /// Hands each post to Instagram according to its slot.
    ///
    /// Due posts are published now. Later ones get a media container and a
    /// `scheduled` entry in the scheduled-post file. Without a usable
    /// publisher every post becomes a manual-posting reminder.
    async fn deliver_posts(
        &self,
        job_id: &str,
        publisher: Option<&dyn SocialPublisher>,
        posts: Vec<PostRecord>,
        cancel: &CancelFlag,
        attempts: &mut usize,
    ) -> Result<Vec<PostRecord>, PipelineError> {
        let mut delivered = Vec::with_capacity(posts.len());
        let mut entries = Vec::new();

        for post in posts {
            if cancel.is_cancelled() {
                self.record_scheduled(job_id, &entries);
                return Err(PipelineError::Cancelled);
            }
            let now = self.clock.now();

            let Some(publisher) = publisher else {
                entries.push(ScheduledPost::manual_reminder(&post, now));
                delivered.push(post.with_status(PublishStatus::ManualPostingRequired));
                continue;
            };

            if *attempts > 0 && !self.config.publish_delay.is_zero() {
                tokio::time::sleep(self.config.publish_delay).await;
            }
            *attempts += 1;

            if post.is_due(now) {
                delivered.push(self.publish_now(job_id, publisher, post).await);
            } else {
                let (post, entry) = self.schedule_later(job_id, publisher, post, now).await;
                entries.extend(entry);
                delivered.push(post);
            }
        }

        self.record_scheduled(job_id, &entries);
        Ok(delivered)
    }

    /// Appends `entries` to the scheduled-post file; a failure becomes a
    /// job warning.
    fn record_scheduled(&self, job_id: &str, entries: &[ScheduledPost]) {
        if let Err(e) = self.scheduled.append(entries) {
            warn!(error = %e, "Scheduled posts not recorded");
            self.warn(job_id, &format!("Failed to record scheduled posts: {}", e));
        }
    }

    async fn publish_now(
        &self,
        job_id: &str,
        publisher: &dyn SocialPublisher,
        post: PostRecord,
    ) -> PostRecord {
        self.progress.report(JobProgressEvent::message(
            job_id,
            &format!("Publishing post for {}", post.topic),
        ));
        let result = async {
            let container = publisher
                .create_container(&post.image_url, &post.caption)
                .await?;
            publisher.publish(&container).await
        }
        .instrument(info_span!("publish", topic = %post.topic))
        .await;

        match result {
            Ok(media_id) => {
                info!(media_id = %media_id, "Post published");
                post.published_as(media_id)
            }
            Err(e) => {
                self.warn(
                    job_id,
                    &format!("Failed to publish post for '{}': {}", post.topic, e),
                );
                post
            }
        }
    }

    async fn schedule_later(
        &self,
        job_id: &str,
        publisher: &dyn SocialPublisher,
        post: PostRecord,
        now: DateTime<Utc>,
    ) -> (PostRecord, Option<ScheduledPost>) {
        self.progress.report(JobProgressEvent::message(
            job_id,
            &format!(
                "Scheduling post for {} at {}",
                post.topic,
                post.scheduled_time.format("%Y-%m-%d %H:%M %:z")
            ),
        ));
        let result = publisher
            .create_container(&post.image_url, &post.caption)
            .instrument(info_span!("schedule", topic = %post.topic))
            .await;

        match result {
            Ok(container_id) => {
                info!(container_id = %container_id, at = %post.scheduled_time, "Post scheduled");
                let entry = ScheduledPost::scheduled(&post, &container_id, now);
                (
                    post.with_status(PublishStatus::Scheduled { container_id }),
                    Some(entry),
                )
            }
            Err(e) => {
                self.warn(
                    job_id,
                    &format!("Failed to schedule post for '{}': {}", post.topic, e),
                );
                (post, None)
            }
        }
    }

    fn warn(&self, job_id: &str, message: &str) {
        self.progress.report(JobProgressEvent::warning(job_id, message));
    }
}
