use std::path::PathBuf;
use thiserror::Error;

use crate::broadcast::job_progress::{EventKind, JobStatus};

#[derive(Error, Debug)]
pub enum NewsgramError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::providers::ProviderError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors surfaced by the job service and the job store.
#[derive(Error, Debug)]
pub enum JobError {
    /// Rejected input; no job record was created.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No job with this id exists (never created, or pruned by retention).
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The event would move the job backwards or out of a terminal state.
    #[error("Invalid transition for job {job_id}: {kind:?} event while {status:?}")]
    InvalidTransition {
        job_id: String,
        status: JobStatus,
        kind: EventKind,
    },

    /// Setup failed before any topic ran.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Job could not be queued: {0}")]
    Queue(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Failed to build async runtime: {0}")]
    Runtime(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize posts: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NewsgramError>;
