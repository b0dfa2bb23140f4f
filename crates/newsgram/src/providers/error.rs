use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure (DNS, connect, timeout, TLS).
    #[error("{provider} request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response. `body` is already truncated for logging.
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned a malformed response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned an empty {what}")]
    Empty {
        provider: &'static str,
        what: &'static str,
    },

    #[error("{provider} is not configured: {message}")]
    NotConfigured {
        provider: &'static str,
        message: String,
    },

    #[error("Failed to build {provider} client: {message}")]
    Client {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Request { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Malformed { provider, .. }
            | ProviderError::Empty { provider, .. }
            | ProviderError::NotConfigured { provider, .. }
            | ProviderError::Client { provider, .. } => provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ProviderError {
        ProviderError::Status {
            provider: "zai",
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
        assert!(!status(404).is_transient());
    }

    #[test]
    fn test_non_http_errors_are_permanent() {
        let err = ProviderError::Malformed {
            provider: "instagram",
            message: "missing id".to_string(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.provider(), "instagram");
    }
}
