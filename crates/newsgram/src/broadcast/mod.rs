pub mod job_progress;
pub mod job_store;

pub use job_progress::{EventKind, JobProgressBroadcaster, JobProgressEvent, JobStatus};
pub use job_store::{JobCounts, JobRecord, JobStore};
