use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::{GenerationConfig, SchedulingConfig};
use crate::config::Config;

/// Settings the pipeline and job runner need, taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub query_template: String,
    pub max_results: u32,
    pub generation: GenerationConfig,
    pub scheduling: SchedulingConfig,
    pub publish_delay: Duration,
    /// Where `scheduled_posts.json` lives.
    pub export_directory: PathBuf,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            query_template: config.search.query_template.clone(),
            max_results: config.search.max_results,
            generation: config.generation.clone(),
            scheduling: config.scheduling.clone(),
            publish_delay: Duration::from_millis(config.publishing.delay_between_posts_ms),
            export_directory: PathBuf::from(&config.export.directory),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
