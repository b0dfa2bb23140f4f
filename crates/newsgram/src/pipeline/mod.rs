pub mod config;
pub mod context;
pub mod error;
pub mod hashtags;
pub mod post;
pub mod progress;
pub mod prompts;
pub mod runner;
pub mod schedule;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{PipelineError, PipelineWarning, Stage};
pub use post::{PostRecord, PublishStatus};
pub use progress::{NoopProgress, ProgressReporter, StoreProgress};
pub use runner::Pipeline;
pub use schedule::{Clock, FixedClock, PostingScheduler, SystemClock};
