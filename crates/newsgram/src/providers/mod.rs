//! External collaborators consumed by the content pipeline.
//!
//! Every provider is a trait so the pipeline and job runner can be driven by
//! the HTTP clients in production and by scripted fakes in tests.

pub mod error;
pub mod instagram;
pub mod retry;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod zai;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::schema::{InstagramConfig, ProvidersConfig, RetryConfig};
use crate::secrets::{self, SecretError, SecretSource};
use crate::worker::job::TimeRange;

pub use error::ProviderError;
pub use instagram::InstagramClient;
pub use zai::ZaiClient;

/// A news search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        time_range: TimeRange,
        max_results: u32,
    ) -> Result<Vec<Article>, ProviderError>;
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Returns the readable text of the page; empty text is an error.
    async fn extract(&self, url: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns a URL for the generated image.
    async fn generate_image(
        &self,
        prompt: &str,
        size: &str,
        quality: &str,
    ) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait SocialPublisher: Send + Sync {
    /// Checks credentials against the account; returns a display label.
    async fn verify(&self) -> Result<String, ProviderError>;

    async fn create_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, ProviderError>;

    /// Publishes a container and returns the media id.
    async fn publish(&self, container_id: &str) -> Result<String, ProviderError>;
}

/// The provider set one job runs against.
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn NewsSearch>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    /// `None` when no publishing account is configured.
    pub publisher: Option<Arc<dyn SocialPublisher>>,
}

/// Builds provider sets for jobs.
///
/// Workers each drive jobs on their own runtime, so HTTP clients are built
/// per job rather than shared across runtimes.
pub trait ProviderFactory: Send + Sync {
    /// Checks that required credentials resolve, without network access.
    fn ensure_ready(&self) -> Result<(), ProviderError>;

    fn build(&self) -> Result<Providers, ProviderError>;
}

/// Production factory: Z.ai for search, extraction, text and images;
/// Instagram Graph API for publishing when configured.
pub struct HttpProviderFactory {
    providers: ProvidersConfig,
    retry: RetryConfig,
}

impl HttpProviderFactory {
    pub fn new(providers: ProvidersConfig, retry: RetryConfig) -> Self {
        Self { providers, retry }
    }

    /// `None` when the Instagram section carries no access token source.
    fn build_publisher(
        &self,
        config: &InstagramConfig,
    ) -> Result<Option<Arc<dyn SocialPublisher>>, ProviderError> {
        let token =
            match secrets::resolve_secret_optional(&SecretSource::instagram_access_token(config))
                .map_err(not_configured("instagram"))?
            {
                Some(token) => token,
                None => return Ok(None),
            };
        let account_id = secrets::resolve_secret(&SecretSource::instagram_account_id(config))
            .map_err(not_configured("instagram"))?;

        let client = InstagramClient::new(
            config,
            account_id.expose_secret().to_string(),
            token,
            self.retry.publish,
        )?;
        Ok(Some(Arc::new(client)))
    }
}

fn not_configured(provider: &'static str) -> impl Fn(SecretError) -> ProviderError {
    move |e| ProviderError::NotConfigured {
        provider,
        message: e.to_string(),
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn ensure_ready(&self) -> Result<(), ProviderError> {
        secrets::resolve_secret(&SecretSource::zai_api_key(&self.providers.zai))
            .map(|_| ())
            .map_err(not_configured("zai"))
    }

    fn build(&self) -> Result<Providers, ProviderError> {
        let api_key = secrets::resolve_secret(&SecretSource::zai_api_key(&self.providers.zai))
            .map_err(not_configured("zai"))?;
        let zai = Arc::new(ZaiClient::new(
            &self.providers.zai,
            api_key,
            self.retry.clone(),
        )?);

        // Publishing is optional; the runner decides what a missing publisher means.
        let publisher = match &self.providers.instagram {
            Some(config) => match self.build_publisher(config) {
                Ok(publisher) => publisher,
                Err(e) => {
                    warn!(error = %e, "Instagram publisher unavailable");
                    None
                }
            },
            None => None,
        };

        Ok(Providers {
            search: zai.clone(),
            extractor: zai.clone(),
            text: zai.clone(),
            image: zai,
            publisher,
        })
    }
}
