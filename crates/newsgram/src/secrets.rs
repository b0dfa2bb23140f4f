//! Credential resolution for provider API keys and access tokens.
//!
//! Each credential can come from one of three places, checked in order:
//!
//! 1. **Direct value** in the config file (quick local runs)
//! 2. **File** holding the value (Docker secrets, `~/.config/...`)
//! 3. **Environment variable** (CI, containers, `.env` files)

use secrecy::SecretString;
use std::fs;

use crate::config::schema::{InstagramConfig, ZaiConfig};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No source configured for {label} (need a direct value, a file path, or an env var)")]
    NoSourceProvided { label: &'static str },

    #[error("Failed to read {label} from file '{path}': {source}")]
    FileReadError {
        label: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' for {label} is not set")]
    EnvVarNotSet { label: &'static str, name: String },

    #[error("Environment variable '{name}' for {label} contains invalid UTF-8")]
    EnvVarNotUnicode { label: &'static str, name: String },

    #[error("{label} resolved to an empty value")]
    Empty { label: &'static str },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Where to look for one credential.
#[derive(Debug, Clone, Copy)]
pub struct SecretSource<'a> {
    /// Human-readable name used in errors, never the value.
    pub label: &'static str,
    pub direct: Option<&'a str>,
    pub file_path: Option<&'a str>,
    pub env_var: Option<&'a str>,
}

impl<'a> SecretSource<'a> {
    pub fn zai_api_key(config: &'a ZaiConfig) -> Self {
        Self {
            label: "Z.ai API key",
            direct: config.api_key.as_deref(),
            file_path: config.api_key_file.as_deref(),
            env_var: config.api_key_env_var.as_deref(),
        }
    }

    pub fn instagram_access_token(config: &'a InstagramConfig) -> Self {
        Self {
            label: "Instagram access token",
            direct: config.access_token.as_deref(),
            file_path: config.access_token_file.as_deref(),
            env_var: config.access_token_env_var.as_deref(),
        }
    }

    pub fn instagram_account_id(config: &'a InstagramConfig) -> Self {
        Self {
            label: "Instagram account id",
            direct: config.account_id.as_deref(),
            file_path: None,
            env_var: config.account_id_env_var.as_deref(),
        }
    }

    /// True if at least one non-empty source is configured.
    pub fn is_configured(&self) -> bool {
        [self.direct, self.file_path, self.env_var]
            .iter()
            .any(|s| s.is_some_and(|s| !s.is_empty()))
    }
}

/// Resolves a credential from the first configured source.
///
/// An empty direct value or empty path/env-var name counts as "not configured"
/// and falls through to the next source. A configured source that fails
/// (unreadable file, unset variable) is an error rather than a fall-through.
pub fn resolve_secret(source: &SecretSource<'_>) -> Result<SecretString> {
    let label = source.label;

    if let Some(value) = non_empty(source.direct) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = non_empty(source.file_path) {
        let expanded = expand_home(path);
        let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
            label,
            path: expanded.clone(),
            source: e,
        })?;
        return checked(label, content.trim());
    }

    if let Some(name) = non_empty(source.env_var) {
        return match std::env::var(name) {
            // Env files often leave trailing newlines
            Ok(value) => checked(label, value.trim()),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                label,
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                label,
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided { label })
}

/// Like [`resolve_secret`], but a source with nothing configured yields `None`.
pub fn resolve_secret_optional(source: &SecretSource<'_>) -> Result<Option<SecretString>> {
    match resolve_secret(source) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn checked(label: &'static str, value: &str) -> Result<SecretString> {
    if value.is_empty() {
        return Err(SecretError::Empty { label });
    }
    Ok(SecretString::from(value.to_string()))
}

/// Expands a leading `~` or `~/` using HOME (or USERPROFILE on Windows).
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
