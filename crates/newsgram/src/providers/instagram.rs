//! Instagram Graph API publisher (business accounts).
//!
//! Publishing is two calls: create a media container for the image and
//! caption, then publish that container. The access token travels as a query
//! parameter, so URLs are redacted before they are logged.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::schema::{InstagramConfig, RetryPolicy};
use crate::sanitize::{self, MAX_BODY_CHARS};

use super::retry::with_retry;
use super::{ProviderError, SocialPublisher};

const PROVIDER: &str = "instagram";

pub struct InstagramClient {
    client: reqwest::Client,
    graph_url: String,
    account_id: String,
    access_token: SecretString,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl InstagramClient {
    pub fn new(
        config: &InstagramConfig,
        account_id: String,
        access_token: SecretString,
        retry: RetryPolicy,
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
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            account_id,
            access_token,
            retry,
        })
    }

    async fn send<R: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<R, ProviderError> {
        let request = request
            .query(&[("access_token", self.access_token.expose_secret())])
            .build()
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                source: e.without_url(),
            })?;
        debug!(url = %sanitize::redact_url(request.url().as_str()), "Calling Graph API");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER,
                source: e.without_url(),
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
            message: e.without_url().to_string(),
        })
    }

    fn account_url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.graph_url, self.account_id, suffix)
    }
}

fn require_id(response: IdResponse, what: &'static str) -> Result<String, ProviderError> {
    response
        .id
        .filter(|id| !id.is_empty())
        .ok_or(ProviderError::Empty {
            provider: PROVIDER,
            what,
        })
}

#[async_trait]
impl SocialPublisher for InstagramClient {
    async fn verify(&self) -> Result<String, ProviderError> {
        let account: AccountResponse = with_retry("verify_account", self.retry, || {
            self.send(
                self.client
                    .get(self.account_url(""))
                    .query(&[("fields", "id,username")]),
            )
        })
        .await?;

        let label = account
            .username
            .map(|u| format!("@{}", u))
            .or(account.id)
            .ok_or(ProviderError::Empty {
                provider: PROVIDER,
                what: "account",
            })?;
        info!(account = %label, "Instagram connection verified");
        Ok(label)
    }

    async fn create_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, ProviderError> {
        let response: IdResponse = with_retry("create_container", self.retry, || {
            self.send(self.client.post(self.account_url("/media")).query(&[
                ("image_url", image_url),
                ("caption", caption),
                ("media_type", "IMAGE"),
            ]))
        })
        .await?;

        require_id(response, "container id")
    }

    async fn publish(&self, container_id: &str) -> Result<String, ProviderError> {
        let response: IdResponse = with_retry("publish_media", self.retry, || {
            self.send(
                self.client
                    .post(self.account_url("/media_publish"))
                    .query(&[("creation_id", container_id)]),
            )
        })
        .await?;

        require_id(response, "media id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> InstagramClient {
        let config = InstagramConfig {
            graph_url: server.url(),
            timeout_secs: 5,
            ..InstagramConfig::default()
        };
        InstagramClient::new(
            &config,
            "17841400000".to_string(),
            SecretString::from("ig-token"),
            RetryPolicy {
                max_attempts: 2,
                base_delay_ms: 1,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_container_sends_image_and_caption() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/17841400000/media")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("access_token".into(), "ig-token".into()),
                Matcher::UrlEncoded("image_url".into(), "https://cdn/x.png".into()),
                Matcher::UrlEncoded("caption".into(), "Hello #tech".into()),
                Matcher::UrlEncoded("media_type".into(), "IMAGE".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id": "container-1"}"#)
            .create_async()
            .await;

        let id = client_for(&server)
            .create_container("https://cdn/x.png", "Hello #tech")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(id, "container-1");
    }

    #[tokio::test]
    async fn test_publish_uses_creation_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/17841400000/media_publish")
            .match_query(Matcher::UrlEncoded(
                "creation_id".into(),
                "container-1".into(),
            ))
            .with_status(200)
            .with_body(r#"{"id": "media-9"}"#)
            .create_async()
            .await;

        let media_id = client_for(&server).publish("container-1").await.unwrap();
        assert_eq!(media_id, "media-9");
    }

    #[tokio::test]
    async fn test_publish_missing_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/17841400000/media_publish")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let result = client_for(&server).publish("container-1").await;
        assert!(matches!(result, Err(ProviderError::Empty { .. })));
    }

    #[tokio::test]
    async fn test_verify_returns_username() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/17841400000")
            .match_query(Matcher::UrlEncoded("fields".into(), "id,username".into()))
            .with_status(200)
            .with_body(r#"{"id": "17841400000", "username": "beritaku"}"#)
            .create_async()
            .await;

        let label = client_for(&server).verify().await.unwrap();
        assert_eq!(label, "@beritaku");
    }

    #[tokio::test]
    async fn test_verify_rejected_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/17841400000")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": {"message": "Invalid OAuth access token"}}"#)
            .create_async()
            .await;

        let result = client_for(&server).verify().await;
        assert!(matches!(result, Err(ProviderError::Status { status: 400, .. })));
    }
}
