use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::{Config, RetryPolicy};
use crate::error::ConfigError;
use crate::worker::job::MAX_POSTS_LIMIT;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(invalid("worker_count must be at least 1"));
    }
    if config.queue_capacity == 0 {
        return Err(invalid("queue_capacity must be at least 1"));
    }

    if !config.search.query_template.contains("{topic}") {
        return Err(invalid("search.query_template must contain '{topic}'"));
    }
    if config.search.max_results == 0 {
        return Err(invalid("search.max_results must be at least 1"));
    }

    let hours = &config.scheduling.optimal_hours;
    if hours.is_empty() {
        return Err(invalid("scheduling.optimal_hours must not be empty"));
    }
    let mut seen = HashSet::new();
    for hour in hours {
        if *hour > 23 {
            return Err(ConfigError::Validation {
                message: format!("scheduling.optimal_hours contains invalid hour {}", hour),
            });
        }
        if !seen.insert(hour) {
            return Err(ConfigError::Validation {
                message: format!("scheduling.optimal_hours contains duplicate hour {}", hour),
            });
        }
    }
    if config.scheduling.utc_offset_minutes.abs() >= 24 * 60 {
        return Err(invalid("scheduling.utc_offset_minutes is out of range"));
    }

    let max_posts = config.defaults.max_posts;
    if max_posts == 0 || max_posts > MAX_POSTS_LIMIT {
        return Err(ConfigError::Validation {
            message: format!(
                "defaults.max_posts must be between 1 and {}, got {}",
                MAX_POSTS_LIMIT, max_posts
            ),
        });
    }

    let retry = &config.retry;
    for (name, policy) in [
        ("search", &retry.search),
        ("extract", &retry.extract),
        ("text", &retry.text),
        ("image", &retry.image),
        ("publish", &retry.publish),
    ] {
        validate_retry_policy(name, policy)?;
    }

    if config.retention.max_finished_jobs == 0 {
        return Err(invalid("retention.max_finished_jobs must be at least 1"));
    }

    Ok(())
}

fn validate_retry_policy(name: &str, policy: &RetryPolicy) -> Result<(), ConfigError> {
    if policy.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: format!("retry.{}.max_attempts must be at least 1", name),
        });
    }
    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::job::TimeRange;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(r#"{"version": "1.0"}"#).unwrap();

        assert_eq!(config.version, "1.0");
        assert!(config.worker_count > 0);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.scheduling.optimal_hours, vec![8, 12, 18, 20]);
        assert_eq!(config.defaults.time_range, TimeRange::OneDay);
        assert_eq!(config.defaults.max_posts, 3);
        assert!(config.providers.instagram.is_none());
        assert_eq!(config.providers.zai.chat_model, "glm-4.6");
    }

    #[test]
    fn test_load_full_config() {
        let json = r#"{
            "version": "1.0",
            "worker_count": 2,
            "queue_capacity": 8,
            "providers": {
                "zai": { "api_key_env_var": "MY_ZAI_KEY", "timeout_secs": 10 },
                "instagram": { "account_id": "1784", "access_token_file": "/run/secrets/ig" }
            },
            "search": { "query_template": "latest {topic} news", "max_results": 5 },
            "scheduling": { "optimal_hours": [9, 17], "day_offset": 2, "utc_offset_minutes": 420 },
            "retry": { "image": { "max_attempts": 5, "base_delay_ms": 250 } },
            "publishing": { "delay_between_posts_ms": 0 },
            "defaults": { "time_range": "oneWeek", "max_posts": 2 }
        }"#;

        let config = load_config_from_str(json).unwrap();

        assert_eq!(config.worker_count, 2);
        assert_eq!(config.search.query_template, "latest {topic} news");
        assert_eq!(config.scheduling.day_offset, 2);
        assert_eq!(config.retry.image.max_attempts, 5);
        assert_eq!(config.retry.search, RetryPolicy::default());
        assert_eq!(config.defaults.time_range, TimeRange::OneWeek);
        let instagram = config.providers.instagram.unwrap();
        assert_eq!(instagram.account_id.as_deref(), Some("1784"));
        assert_eq!(instagram.graph_url, "https://graph.facebook.com/v18.0");
    }

    #[test]
    fn test_schema_rejects_unknown_field() {
        let result = load_config_from_str(r#"{"version": "1.0", "workers": 3}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_schema_rejects_bad_time_range() {
        let result =
            load_config_from_str(r#"{"version": "1.0", "defaults": {"time_range": "forever"}}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_schema_rejects_wrong_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_template_without_topic_placeholder() {
        let result =
            load_config_from_str(r#"{"version": "1.0", "search": {"query_template": "news"}}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_duplicate_hours_rejected() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "scheduling": {"optimal_hours": [8, 8]}}"#,
        );
        match result {
            Err(ConfigError::Validation { message }) => assert!(message.contains("duplicate")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/newsgram.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_validate_config_zero_workers() {
        let config = Config {
            worker_count: 0,
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
