use serde::{Deserialize, Serialize};

use crate::worker::job::TimeRange;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            providers: ProvidersConfig::default(),
            search: SearchConfig::default(),
            generation: GenerationConfig::default(),
            scheduling: SchedulingConfig::default(),
            retry: RetryConfig::default(),
            publishing: PublishingConfig::default(),
            retention: RetentionConfig::default(),
            export: ExportConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

// ─── Providers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub zai: ZaiConfig,
    /// Absent means auto-post is unavailable.
    #[serde(default)]
    pub instagram: Option<InstagramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZaiConfig {
    #[serde(default = "default_zai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_zai_env_var")]
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_zai_timeout")]
    pub timeout_secs: u64,
}

fn default_zai_base_url() -> String {
    "https://api.z.ai/api/paas/v4".to_string()
}

fn default_zai_env_var() -> Option<String> {
    Some("ZAI_API_KEY".to_string())
}

fn default_chat_model() -> String {
    "glm-4.6".to_string()
}

fn default_image_model() -> String {
    "cogview-4".to_string()
}

fn default_zai_timeout() -> u64 {
    60
}

impl Default for ZaiConfig {
    fn default() -> Self {
        Self {
            base_url: default_zai_base_url(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_zai_env_var(),
            chat_model: default_chat_model(),
            image_model: default_image_model(),
            timeout_secs: default_zai_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default = "default_account_env_var")]
    pub account_id_env_var: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_token_file: Option<String>,
    #[serde(default = "default_token_env_var")]
    pub access_token_env_var: Option<String>,
    #[serde(default = "default_instagram_timeout")]
    pub timeout_secs: u64,
}

fn default_graph_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_account_env_var() -> Option<String> {
    Some("INSTAGRAM_BUSINESS_ACCOUNT_ID".to_string())
}

fn default_token_env_var() -> Option<String> {
    Some("INSTAGRAM_ACCESS_TOKEN".to_string())
}

fn default_instagram_timeout() -> u64 {
    30
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            graph_url: default_graph_url(),
            account_id: None,
            account_id_env_var: default_account_env_var(),
            access_token: None,
            access_token_file: None,
            access_token_env_var: default_token_env_var(),
            timeout_secs: default_instagram_timeout(),
        }
    }
}

// ─── Pipeline tuning ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// `{topic}` is replaced with the topic being processed.
    #[serde(default = "default_query_template")]
    pub query_template: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_query_template() -> String {
    "berita terbaru {topic} Indonesia".to_string()
}

fn default_max_results() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query_template: default_query_template(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
    #[serde(default = "default_caption_temperature")]
    pub caption_temperature: f32,
    #[serde(default = "default_caption_max_tokens")]
    pub caption_max_tokens: u32,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default = "default_image_quality")]
    pub image_quality: String,
}

fn default_summary_temperature() -> f32 {
    0.5
}

fn default_summary_max_tokens() -> u32 {
    150
}

fn default_caption_temperature() -> f32 {
    0.7
}

fn default_caption_max_tokens() -> u32 {
    300
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_image_quality() -> String {
    "hd".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            summary_temperature: default_summary_temperature(),
            summary_max_tokens: default_summary_max_tokens(),
            caption_temperature: default_caption_temperature(),
            caption_max_tokens: default_caption_max_tokens(),
            image_size: default_image_size(),
            image_quality: default_image_quality(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_optimal_hours")]
    pub optimal_hours: Vec<u32>,
    #[serde(default = "default_day_offset")]
    pub day_offset: u32,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_optimal_hours() -> Vec<u32> {
    vec![8, 12, 18, 20]
}

fn default_day_offset() -> u32 {
    1
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            optimal_hours: default_optimal_hours(),
            day_offset: default_day_offset(),
            utc_offset_minutes: 0,
        }
    }
}

// ─── Retry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub search: RetryPolicy,
    #[serde(default)]
    pub extract: RetryPolicy,
    #[serde(default)]
    pub text: RetryPolicy,
    #[serde(default)]
    pub image: RetryPolicy,
    #[serde(default)]
    pub publish: RetryPolicy,
}

// ─── Runtime behaviour ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    #[serde(default = "default_publish_delay")]
    pub delay_between_posts_ms: u64,
}

fn default_publish_delay() -> u64 {
    2000
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            delay_between_posts_ms: default_publish_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_finished_jobs")]
    pub max_finished_jobs: usize,
}

fn default_max_finished_jobs() -> usize {
    100
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_finished_jobs: default_max_finished_jobs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_directory")]
    pub directory: String,
}

fn default_export_directory() -> String {
    "generated_posts".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub time_range: TimeRange,
    #[serde(default = "default_max_posts")]
    pub max_posts: u32,
}

fn default_max_posts() -> u32 {
    3
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            max_posts: default_max_posts(),
        }
    }
}
