//! Job submission and polling surface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Url;
use tokio::sync::broadcast;

use crate::broadcast::job_progress::{JobProgressBroadcaster, JobProgressEvent};
use crate::broadcast::job_store::{JobCounts, JobRecord, JobStore};
use crate::config::Config;
use crate::error::{JobError, WorkerError};
use crate::pipeline::progress::{ProgressReporter, StoreProgress};
use crate::pipeline::schedule::{Clock, SystemClock};
use crate::pipeline::{PipelineConfig, PostRecord};
use crate::providers::{HttpProviderFactory, ProviderFactory};
use crate::worker::job::{CancelFlag, Job, JobOptions, MAX_POSTS_LIMIT};
use crate::worker::pool::WorkerPool;
use crate::worker::runner::JobRunner;

/// Accepts jobs, runs them on the worker pool and answers status queries.
///
/// Reads never mutate state. Records change only through the events the
/// runner of each job emits.
pub struct JobService {
    store: Arc<JobStore>,
    broadcaster: JobProgressBroadcaster,
    progress: StoreProgress,
    factory: Arc<dyn ProviderFactory>,
    pool: Mutex<Option<WorkerPool>>,
    cancel_flags: Mutex<HashMap<String, CancelFlag>>,
}

impl JobService {
    /// Starts a service backed by the HTTP providers from `config`.
    pub fn from_config(config: &Config) -> Result<Self, WorkerError> {
        let factory = HttpProviderFactory::new(config.providers.clone(), config.retry.clone());
        Self::start(config, Arc::new(factory))
    }

    pub fn start(config: &Config, factory: Arc<dyn ProviderFactory>) -> Result<Self, WorkerError> {
        Self::start_with_clock(config, factory, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        config: &Config,
        factory: Arc<dyn ProviderFactory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WorkerError> {
        let store = Arc::new(JobStore::new(config.retention.max_finished_jobs));
        let broadcaster = JobProgressBroadcaster::default();
        let progress = StoreProgress::new(store.clone(), broadcaster.clone());

        let runner = JobRunner::new(
            factory.clone(),
            progress.clone(),
            Arc::new(PipelineConfig::from_config(config)),
        )
        .with_clock(clock);
        let pool = WorkerPool::new(config.worker_count, config.queue_capacity, Arc::new(runner))?;

        Ok(Self {
            store,
            broadcaster,
            progress,
            factory,
            pool: Mutex::new(Some(pool)),
            cancel_flags: Mutex::new(HashMap::new()),
        })
    }

    fn pool(&self) -> MutexGuard<'_, Option<WorkerPool>> {
        match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Worker pool lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn cancel_flags(&self) -> MutexGuard<'_, HashMap<String, CancelFlag>> {
        match self.cancel_flags.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Cancel flag lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Validates the request, creates a pending job and queues it.
    ///
    /// Invalid input is rejected before any record exists. When the queue
    /// refuses the job, the record is marked failed and the error returned.
    pub fn submit_job(&self, topics: Vec<String>, options: JobOptions) -> Result<String, JobError> {
        let topics: Vec<String> = topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            return Err(JobError::Validation(
                "At least one topic is required".to_string(),
            ));
        }
        self.validate(&options)?;

        let id = self.store.create(topics.clone(), options);
        self.enqueue(Job::new(id, topics, options))
    }

    /// Queues a job that builds one post from the article at `url`,
    /// skipping news search. `topic` labels the post and frames the prompts.
    pub fn submit_url_job(
        &self,
        url: &str,
        topic: &str,
        options: JobOptions,
    ) -> Result<String, JobError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(JobError::Validation("A topic is required".to_string()));
        }
        let url = parse_article_url(url)?;
        self.validate(&options)?;

        let id = self
            .store
            .create_with_source(vec![topic.to_string()], options, Some(url.clone()));
        self.enqueue(Job::for_url(id, topic, url, options))
    }

    fn validate(&self, options: &JobOptions) -> Result<(), JobError> {
        if options.max_posts == 0 || options.max_posts > MAX_POSTS_LIMIT {
            return Err(JobError::Validation(format!(
                "max_posts must be between 1 and {}",
                MAX_POSTS_LIMIT
            )));
        }
        self.factory
            .ensure_ready()
            .map_err(|e| JobError::Validation(e.to_string()))
    }

    fn enqueue(&self, job: Job) -> Result<String, JobError> {
        let id = job.id.clone();
        {
            let mut flags = self.cancel_flags();
            flags.retain(|job_id, _| {
                self.store
                    .get(job_id)
                    .map(|r| !r.is_finished())
                    .unwrap_or(false)
            });
            flags.insert(id.clone(), job.cancel.clone());
        }

        let submitted = match self.pool().as_ref() {
            Some(pool) => pool.submit(job),
            None => Err(WorkerError::ChannelClosed),
        };
        if let Err(e) = submitted {
            log::warn!("Job {} could not be queued: {}", id, e);
            self.progress
                .report(JobProgressEvent::failed(&id, &e.to_string()));
            return Err(JobError::Queue(e));
        }

        log::info!("Queued job {}", id);
        Ok(id)
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobRecord, JobError> {
        self.store.get(job_id)
    }

    pub fn get_result(&self, job_id: &str) -> Result<Vec<PostRecord>, JobError> {
        self.store.get_result(job_id)
    }

    /// Flags a pending or running job for cancellation. Returns `false` when
    /// the job has already finished.
    pub fn cancel_job(&self, job_id: &str) -> Result<bool, JobError> {
        let record = self.store.get(job_id)?;
        if record.is_finished() {
            return Ok(false);
        }

        match self.cancel_flags().get(job_id) {
            Some(flag) => {
                flag.cancel();
                log::info!("Cancellation requested for job {}", job_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// All jobs, newest first.
    pub fn list_jobs(&self) -> Vec<JobRecord> {
        self.store.list()
    }

    pub fn counts(&self) -> JobCounts {
        self.store.counts()
    }

    /// Receives every accepted progress event from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.broadcaster.subscribe()
    }

    /// Resolves once the job reaches a terminal state.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Result<JobRecord, JobError> {
        let mut rx = self.subscribe();
        loop {
            let record = self.store.get(job_id)?;
            if record.is_finished() {
                return Ok(record);
            }
            match rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return self.store.get(job_id),
            }
        }
    }

    /// Stops accepting jobs, lets running jobs finish and fails the ones
    /// still queued. Later calls are no-ops.
    pub fn shutdown(&self) {
        let pool = self.pool().take();
        if let Some(pool) = pool {
            pool.shutdown();
            pool.wait();
        }
    }
}

/// Accepts absolute `http`/`https` URLs with a host.
fn parse_article_url(url: &str) -> Result<String, JobError> {
    let invalid =
        |reason: &str| JobError::Validation(format!("Invalid article URL '{}': {}", url, reason));
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https are supported"));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(parsed.to_string())
}
