pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, validate_config};
pub use schema::{
    Config, DefaultsConfig, ExportConfig, GenerationConfig, InstagramConfig, ProvidersConfig,
    PublishingConfig, RetentionConfig, RetryConfig, RetryPolicy, SchedulingConfig, SearchConfig,
    ZaiConfig,
};
