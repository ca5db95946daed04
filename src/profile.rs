use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::errors::MonitorError;

/// Observable state of a messaging-platform account at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub display_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
}

/// Something that can read an account's current public profile.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, credential: &str) -> Result<ProfileSnapshot, MonitorError>;
}

/// LINE Messaging API client for `GET /v2/bot/info`.
pub struct LineProfileClient {
    client: reqwest::Client,
    base_url: String,
}

impl LineProfileClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Upstream(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProfileSource for LineProfileClient {
    async fn fetch_profile(&self, credential: &str) -> Result<ProfileSnapshot, MonitorError> {
        let url = format!("{}/v2/bot/info", self.base_url);

        debug!("Fetching bot profile: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", credential))
            .send()
            .await
            .map_err(|e| MonitorError::Upstream(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Upstream(format!(
                "profile API error ({}): {}",
                status, error_body
            )));
        }

        response
            .json::<ProfileSnapshot>()
            .await
            .map_err(|e| MonitorError::Upstream(format!("malformed profile payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> LineProfileClient {
        LineProfileClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_profile_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/bot/info"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "userId": "U123",
                "basicId": "@123abc",
                "displayName": "Bot1",
                "pictureUrl": "https://profile.example.com/1.png",
                "chatMode": "bot"
            })))
            .mount(&server)
            .await;

        let snapshot = client(&server).fetch_profile("secret").await.unwrap();
        assert_eq!(snapshot.display_name, "Bot1");
        assert_eq!(
            snapshot.picture_url.as_deref(),
            Some("https://profile.example.com/1.png")
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_without_picture() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/bot/info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "displayName": "NoPic" })),
            )
            .mount(&server)
            .await;

        let snapshot = client(&server).fetch_profile("t").await.unwrap();
        assert_eq!(snapshot.display_name, "NoPic");
        assert!(snapshot.picture_url.is_none());
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/bot/info"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_profile("bad").await.unwrap_err();
        match err {
            MonitorError::Upstream(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid token"));
            }
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/bot/info"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_profile("t").await.unwrap_err();
        assert!(matches!(err, MonitorError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "displayName": "Slow" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = LineProfileClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
        let err = client.fetch_profile("t").await.unwrap_err();
        assert!(matches!(err, MonitorError::Upstream(_)));
    }
}
