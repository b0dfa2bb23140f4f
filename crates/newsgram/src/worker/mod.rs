pub mod job;
pub mod pool;
pub mod runner;

pub use job::{CancelFlag, Job, JobOptions, TimeRange, MAX_POSTS_LIMIT};
pub use pool::WorkerPool;
pub use runner::{JobOutcome, JobRunner};
