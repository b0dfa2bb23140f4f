use crate::providers::Article;
use crate::worker::job::{CancelFlag, JobOptions};

use super::error::PipelineWarning;
use super::post::PostRecord;

/// State of one topic as it moves through the pipeline.
pub struct PipelineContext {
    // Input
    pub job_id: String,
    pub topic: String,
    pub options: JobOptions,
    pub cancel: CancelFlag,

    // Discovery result, already capped at `max_posts`
    pub candidates: Vec<Article>,

    // Assembled posts, in candidate order
    pub posts: Vec<PostRecord>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job_id: &str, topic: &str, options: JobOptions, cancel: CancelFlag) -> Self {
        Self {
            job_id: job_id.to_string(),
            topic: topic.to_string(),
            options,
            cancel,
            candidates: Vec::new(),
            posts: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
