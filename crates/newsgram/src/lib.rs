pub mod broadcast;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod providers;
pub mod sanitize;
pub mod scheduled;
pub mod secrets;
pub mod service;
pub mod telemetry;
pub mod worker;

pub use broadcast::{JobCounts, JobProgressBroadcaster, JobProgressEvent, JobRecord, JobStatus, JobStore};
pub use config::{load_config, Config};
pub use error::{ConfigError, ExportError, JobError, NewsgramError, Result, WorkerError};
pub use export::{export_posts, export_to_directory};
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext, PostRecord, PublishStatus};
pub use providers::{HttpProviderFactory, ProviderError, ProviderFactory, Providers};
pub use scheduled::{ScheduledPost, ScheduledPostStore, ScheduledStatus};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use service::JobService;
pub use worker::{JobOptions, TimeRange, WorkerPool};
