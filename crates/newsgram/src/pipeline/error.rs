use std::fmt;

use thiserror::Error;

use crate::providers::ProviderError;

/// Failures that end a topic.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("News discovery failed: {0}")]
    Discovery(#[source] ProviderError),

    #[error("Cancelled")]
    Cancelled,
}

/// Pipeline stage a candidate was dropped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Summarize,
    Caption,
    Image,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => write!(f, "extraction"),
            Stage::Summarize => write!(f, "summarization"),
            Stage::Caption => write!(f, "caption generation"),
            Stage::Image => write!(f, "image generation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    CandidateSkipped {
        url: String,
        stage: Stage,
        error: String,
    },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::CandidateSkipped { url, stage, error } => {
                write!(f, "Skipped {} at {}: {}", url, stage, error)
            }
        }
    }
}
