//! Z.ai platform client: web search, web reader, chat completions and image
//! generation behind one bearer-authenticated HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::schema::{RetryConfig, ZaiConfig};
use crate::sanitize::{self, MAX_BODY_CHARS};
use crate::worker::job::TimeRange;

use super::retry::with_retry;
use super::{
    Article, ContentExtractor, ImageGenerator, NewsSearch, ProviderError, TextGenerator,
};

const PROVIDER: &str = "zai";

pub struct ZaiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    chat_model: String,
    image_model: String,
    retry: RetryConfig,
}

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    time_filter: &'static str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    publish_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReaderRequest<'a> {
    url: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ReaderResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

// ─── Client ─────────────────────────────────────────────────────────────────

impl ZaiClient {
    pub fn new(
        config: &ZaiConfig,
        api_key: SecretString,
        retry: RetryConfig,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Client {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: config.chat_model.clone(),
            image_model: config.image_model.clone(),
            retry,
        })
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %sanitize::redact_url(&url), "Calling Z.ai");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body: sanitize::truncate_for_log(&body, MAX_BODY_CHARS),
            });
        }

        response.json::<R>().await.map_err(|e| ProviderError::Malformed {
            provider: PROVIDER,
            message: e.to_string(),
        })
    }
}

fn non_blank(value: Option<String>, what: &'static str) -> Result<String, ProviderError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ProviderError::Empty {
            provider: PROVIDER,
            what,
        }),
    }
}

#[async_trait]
impl NewsSearch for ZaiClient {
    async fn search(
        &self,
        query: &str,
        time_range: TimeRange,
        max_results: u32,
    ) -> Result<Vec<Article>, ProviderError> {
        let request = SearchRequest {
            query,
            time_filter: time_range.as_str(),
            max_results,
        };

        let response: SearchResponse = with_retry("web_search", self.retry.search, || {
            self.post_json("/tools/web-search", &request)
        })
        .await?;

        Ok(response
            .results
            .into_iter()
            .filter(|hit| !hit.url.is_empty())
            .take(max_results as usize)
            .map(|hit| Article {
                title: hit.title,
                url: hit.url,
                summary: hit.summary.filter(|s| !s.is_empty()),
                published_at: hit.publish_date,
            })
            .collect())
    }
}

#[async_trait]
impl ContentExtractor for ZaiClient {
    async fn extract(&self, url: &str) -> Result<String, ProviderError> {
        let request = ReaderRequest {
            url,
            format: "markdown",
        };

        let response: ReaderResponse = with_retry("web_reader", self.retry.extract, || {
            self.post_json("/tools/web-reader", &request)
        })
        .await?;

        non_blank(response.content, "article body")
    }
}

#[async_trait]
impl TextGenerator for ZaiClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
            stream: false,
        };

        let response: ChatResponse = with_retry("chat_completion", self.retry.text, || {
            self.post_json("/chat/completions", &request)
        })
        .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        non_blank(content, "completion")
    }
}

#[async_trait]
impl ImageGenerator for ZaiClient {
    async fn generate_image(
        &self,
        prompt: &str,
        size: &str,
        quality: &str,
    ) -> Result<String, ProviderError> {
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            size,
            quality,
            n: 1,
        };

        let response: ImageResponse = with_retry("image_generation", self.retry.image, || {
            self.post_json("/images/generations", &request)
        })
        .await?;

        let url = response.data.into_iter().next().and_then(|d| d.url);
        non_blank(url, "image url")
    }
}
