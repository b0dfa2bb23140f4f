use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use tokio::runtime::Runtime;

use crate::error::WorkerError;
use crate::worker::job::Job;
use crate::worker::runner::{JobOutcome, JobRunner};

/// Fixed set of worker threads fed by a bounded job queue.
pub struct WorkerPool {
    job_sender: Sender<Job>,
    job_receiver: Receiver<Job>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    runner: Arc<JobRunner>,
    capacity: usize,
}

impl WorkerPool {
    /// Starts `worker_count` threads, each driving jobs on its own
    /// current-thread runtime.
    pub fn new(
        worker_count: usize,
        queue_capacity: usize,
        runner: Arc<JobRunner>,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be greater than 0".to_string(),
            ));
        }
        let capacity = queue_capacity.max(1);
        let (job_sender, job_receiver) = bounded::<Job>(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| WorkerError::Runtime(e.to_string()))?;
            let job_rx = job_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_runner = Arc::clone(&runner);

            let handle = thread::Builder::new()
                .name(format!("newsgram-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, job_rx, shutdown_flag, worker_runner, runtime);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers (queue capacity {})", worker_count, capacity);

        Ok(Self {
            job_sender,
            job_receiver,
            workers,
            shutdown,
            runner,
            capacity,
        })
    }

    /// Queues a job without blocking.
    pub fn submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => WorkerError::QueueFull {
                capacity: self.capacity,
            },
            TrySendError::Disconnected(_) => WorkerError::ChannelClosed,
        })
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.job_sender.len()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Joins the workers. Jobs still queued afterwards never started and are
    /// marked failed.
    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        for job in self.job_receiver.try_iter() {
            warn!("Job {} was still queued at shutdown", job.id);
            self.runner
                .mark_failed(&job.id, "Worker pool shut down before the job started");
        }

        info!("All workers have stopped");
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<Job>,
    shutdown: Arc<AtomicBool>,
    runner: Arc<JobRunner>,
    runtime: Runtime,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                let job_id = job.id.clone();
                debug!("Worker {} processing job {}", worker_id, job_id);

                let outcome = runtime.block_on(AssertUnwindSafe(runner.run(job)).catch_unwind());
                match outcome {
                    Ok(JobOutcome::Completed { total_posts }) => {
                        info!("Job {} completed with {} post(s)", job_id, total_posts);
                    }
                    Ok(JobOutcome::Failed { error }) => {
                        info!("Job {} failed: {}", job_id, error);
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!("Worker {} panicked on job {}: {}", worker_id, job_id, message);
                        runner.mark_failed(&job_id, &format!("Job runner panicked: {}", message));
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::job_progress::{JobProgressBroadcaster, JobStatus};
    use crate::broadcast::job_store::{JobRecord, JobStore};
    use crate::pipeline::{PipelineConfig, StoreProgress};
    use crate::providers::testing::{articles, ScriptedFactory, ScriptedSearch, ScriptedSet};
    use crate::providers::{Article, NewsSearch, ProviderError};
    use crate::worker::job::{JobOptions, TimeRange};
    use async_trait::async_trait;
    use std::time::Instant;

    struct PanickingSearch;

    #[async_trait]
    impl NewsSearch for PanickingSearch {
        async fn search(
            &self,
            _query: &str,
            _time_range: TimeRange,
            _max_results: u32,
        ) -> Result<Vec<Article>, ProviderError> {
            panic!("search exploded");
        }
    }

    fn runner(store: &Arc<JobStore>, set: &ScriptedSet) -> Arc<JobRunner> {
        Arc::new(JobRunner::new(
            Arc::new(set.factory()),
            StoreProgress::new(store.clone(), JobProgressBroadcaster::default()),
            Arc::new(PipelineConfig::default()),
        ))
    }

    fn create_job(store: &JobStore, topic: &str) -> Job {
        let topics = vec![topic.to_string()];
        let options = JobOptions {
            max_posts: 1,
            ..JobOptions::default()
        };
        let id = store.create(topics.clone(), options);
        Job::new(id, topics, options)
    }

    fn wait_for(store: &JobStore, id: &str, done: impl Fn(&JobRecord) -> bool) -> JobRecord {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let record = store.get(id).unwrap();
            if done(&record) || Instant::now() > deadline {
                return record;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_worker_pool_creation() {
        let store = Arc::new(JobStore::default());
        let set = ScriptedSet::new(ScriptedSearch::new());
        let pool = WorkerPool::new(2, 4, runner(&store, &set)).unwrap();

        assert!(!pool.is_shutdown());
        pool.shutdown();
        assert!(pool.is_shutdown());
        assert!(matches!(
            pool.submit(create_job(&store, "tech")),
            Err(WorkerError::ChannelClosed)
        ));
        pool.wait();
    }

    #[test]
    fn test_zero_workers_rejected() {
        let store = Arc::new(JobStore::default());
        let set = ScriptedSet::new(ScriptedSearch::new());
        assert!(matches!(
            WorkerPool::new(0, 4, runner(&store, &set)),
            Err(WorkerError::SpawnFailed(_))
        ));
    }

    #[test]
    fn test_submit_and_process_job() {
        let store = Arc::new(JobStore::default());
        let set = ScriptedSet::new(ScriptedSearch::new().with_articles("tech", articles("tech", 1)));
        let pool = WorkerPool::new(2, 4, runner(&store, &set)).unwrap();

        let job = create_job(&store, "tech");
        let id = job.id.clone();
        pool.submit(job).unwrap();

        let record = wait_for(&store, &id, |r| r.is_finished());
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.total_posts, Some(1));

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_full_queue_rejects_submission() {
        let store = Arc::new(JobStore::default());
        let set = ScriptedSet::new(
            ScriptedSearch::new()
                .with_articles("tech", articles("tech", 1))
                .with_delay(Duration::from_millis(300)),
        );
        let pool = WorkerPool::new(1, 1, runner(&store, &set)).unwrap();

        let first = create_job(&store, "tech");
        let first_id = first.id.clone();
        pool.submit(first).unwrap();
        wait_for(&store, &first_id, |r| r.status == JobStatus::Running);

        pool.submit(create_job(&store, "tech")).unwrap();
        assert_eq!(pool.queued(), 1);
        assert!(matches!(
            pool.submit(create_job(&store, "tech")),
            Err(WorkerError::QueueFull { capacity: 1 })
        ));

        pool.wait();
    }

    #[test]
    fn test_panicking_job_is_marked_failed() {
        let store = Arc::new(JobStore::default());
        let set = ScriptedSet::new(ScriptedSearch::new());
        let mut providers = set.providers();
        providers.search = Arc::new(PanickingSearch);
        let runner = Arc::new(JobRunner::new(
            Arc::new(ScriptedFactory::new(providers)),
            StoreProgress::new(store.clone(), JobProgressBroadcaster::default()),
            Arc::new(PipelineConfig::default()),
        ));
        let pool = WorkerPool::new(1, 2, runner).unwrap();

        let job = create_job(&store, "tech");
        let id = job.id.clone();
        pool.submit(job).unwrap();

        let record = wait_for(&store, &id, |r| r.is_finished());
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record
            .error
            .unwrap()
            .contains("Job runner panicked: search exploded"));

        // The worker survives and keeps serving jobs.
        let next = create_job(&store, "other");
        let next_id = next.id.clone();
        pool.submit(next).unwrap();
        assert!(wait_for(&store, &next_id, |r| r.is_finished()).is_finished());

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_queued_jobs_fail_on_shutdown() {
        let store = Arc::new(JobStore::default());
        let set = ScriptedSet::new(
            ScriptedSearch::new()
                .with_articles("tech", articles("tech", 1))
                .with_delay(Duration::from_millis(200)),
        );
        let pool = WorkerPool::new(1, 4, runner(&store, &set)).unwrap();

        let running = create_job(&store, "tech");
        let running_id = running.id.clone();
        pool.submit(running).unwrap();
        wait_for(&store, &running_id, |r| r.status == JobStatus::Running);

        let queued = create_job(&store, "tech");
        let queued_id = queued.id.clone();
        pool.submit(queued).unwrap();

        pool.shutdown();
        pool.wait();

        assert_eq!(store.get(&running_id).unwrap().status, JobStatus::Completed);
        let record = store.get(&queued_id).unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(
            record.error.as_deref(),
            Some("Worker pool shut down before the job started")
        );
    }
}
