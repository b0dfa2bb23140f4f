//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use newsgram::config::schema::{
    Config, InstagramConfig, RetentionConfig, RetryConfig, RetryPolicy, ZaiConfig,
};
use newsgram::{JobOptions, TimeRange};

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Small, fast defaults: one worker, no publish delay, single-attempt retries.
    pub fn new() -> Self {
        let mut config = Config {
            worker_count: 1,
            queue_capacity: 8,
            ..Config::default()
        };
        config.publishing.delay_between_posts_ms = 0;
        config.retry = RetryConfig {
            search: single_attempt(),
            extract: single_attempt(),
            text: single_attempt(),
            image: single_attempt(),
            publish: single_attempt(),
        };
        config.providers.zai.api_key = Some("test-key".to_string());
        Self { config }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn max_finished_jobs(mut self, max: usize) -> Self {
        self.config.retention = RetentionConfig {
            max_finished_jobs: max,
        };
        self
    }

    pub fn optimal_hours(mut self, hours: &[u32]) -> Self {
        self.config.scheduling.optimal_hours = hours.to_vec();
        self
    }

    /// Days between "now" and the first posting slot; 0 puts slots on the
    /// current day, where earlier hours are already due.
    pub fn day_offset(mut self, days: u32) -> Self {
        self.config.scheduling.day_offset = days;
        self
    }

    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.config.scheduling.utc_offset_minutes = minutes;
        self
    }

    /// Points the Z.ai client at `base_url`.
    pub fn zai(mut self, base_url: &str) -> Self {
        self.config.providers.zai = ZaiConfig {
            base_url: base_url.to_string(),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
            ..ZaiConfig::default()
        };
        self
    }

    pub fn zai_key_env(mut self, name: &str) -> Self {
        self.config.providers.zai.api_key = None;
        self.config.providers.zai.api_key_env_var = Some(name.to_string());
        self
    }

    /// Configures an Instagram account served at `graph_url`.
    pub fn instagram(mut self, graph_url: &str, account_id: &str) -> Self {
        self.config.providers.instagram = Some(InstagramConfig {
            graph_url: graph_url.to_string(),
            account_id: Some(account_id.to_string()),
            access_token: Some("ig-token".to_string()),
            timeout_secs: 5,
            ..InstagramConfig::default()
        });
        self
    }

    pub fn export_directory(mut self, directory: &str) -> Self {
        self.config.export.directory = directory.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn single_attempt() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        base_delay_ms: 1,
    }
}

/// Builder for `JobOptions`.
pub struct OptionsBuilder {
    options: JobOptions,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: JobOptions::default(),
        }
    }

    pub fn max_posts(mut self, max_posts: u32) -> Self {
        self.options.max_posts = max_posts;
        self
    }

    pub fn auto_post(mut self) -> Self {
        self.options.auto_post = true;
        self
    }

    pub fn time_range(mut self, time_range: TimeRange) -> Self {
        self.options.time_range = time_range;
        self
    }

    pub fn build(self) -> JobOptions {
        self.options
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn topics(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
