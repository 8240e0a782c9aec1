//! Telegram channel publisher

use async_trait::async_trait;
use news_relay_domain::{
    Dispatch, PublishError, Publisher,
    usecases::{RenderConfig, Renderer},
};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_TELEGRAM_URL: &str = "https://api.telegram.org";

/// Wait used when a 429 response carries no `retry_after`
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Telegram Bot API configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub channel_id: String,
    pub base_url: String,
    /// Attempts per message when rate limited
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

impl TelegramConfig {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            base_url: DEFAULT_TELEGRAM_URL.to_string(),
            max_attempts: 3,
            timeout_secs: 30,
        }
    }
}

/// Publisher posting HTML messages to a Telegram channel
pub struct TelegramPublisher {
    client: Option<Client>,
    bot_token: SecretString,
    config: TelegramConfig,
    renderer: Renderer,
}

impl TelegramPublisher {
    pub fn new(bot_token: SecretString, config: TelegramConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PublishError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Some(client),
            bot_token,
            config,
            renderer: Renderer::default(),
        })
    }

    /// A publisher that refuses every post
    pub fn disabled() -> Self {
        Self {
            client: None,
            bot_token: SecretString::from(String::new()),
            config: TelegramConfig::new("disabled"),
            renderer: Renderer::default(),
        }
    }

    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.renderer = Renderer::new(config);
        self
    }

    async fn send_message(&self, client: &Client, text: &str) -> Result<SendOutcome, PublishError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.base_url.trim_end_matches('/'),
            self.bot_token.expose_secret()
        );

        // Reqwest errors can embed the request URL, which holds the token
        let response = client
            .post(&url)
            .json(&json!({
                "chat_id": self.config.channel_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            }))
            .send()
            .await
            .map_err(|e| PublishError::Api(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(SendOutcome::Sent);
        }

        let body: ApiError = response.json().await.unwrap_or_default();
        let description = body.description.unwrap_or_else(|| status.to_string());

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let wait = body
                    .parameters
                    .and_then(|p| p.retry_after)
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                Ok(SendOutcome::RetryAfter(Duration::from_secs(wait)))
            }
            StatusCode::UNAUTHORIZED => Err(PublishError::Auth(description)),
            _ => Err(PublishError::Api(format!("{}: {}", status, description))),
        }
    }
}

enum SendOutcome {
    Sent,
    RetryAfter(Duration),
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn post(&self, dispatch: &Dispatch) -> Result<(), PublishError> {
        let Some(client) = &self.client else {
            return Err(PublishError::Disabled);
        };

        let text = self.renderer.render_html(dispatch);
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.send_message(client, &text).await? {
                SendOutcome::Sent => return Ok(()),
                SendOutcome::RetryAfter(wait) if attempt < attempts => {
                    tracing::warn!(
                        channel = %self.config.channel_id,
                        attempt = attempt,
                        max_attempts = attempts,
                        retry_after_secs = wait.as_secs(),
                        "Telegram rate limited, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                SendOutcome::RetryAfter(_) => {}
            }
        }

        Err(PublishError::RateLimited { attempts })
    }

    fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn channel(&self) -> &str {
        &self.config.channel_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(base_url: String) -> TelegramPublisher {
        let config = TelegramConfig {
            base_url,
            timeout_secs: 5,
            ..TelegramConfig::new("@hu_news_ru")
        };
        TelegramPublisher::new(SecretString::from("123:abc"), config).unwrap()
    }

    fn dispatch() -> Dispatch {
        Dispatch {
            summary: "Бюджет принят".to_string(),
            url: "https://telex.hu/1".to_string(),
            source: "Telex".to_string(),
            tags: vec!["#политика".to_string()],
        }
    }

    fn rate_limited(retry_after: u64) -> ResponseTemplate {
        ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 0",
            "parameters": { "retry_after": retry_after }
        }))
    }

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": { "message_id": 1 }
        }))
    }

    #[tokio::test]
    async fn test_post_sends_html_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "@hu_news_ru",
                "text": "Бюджет принят\n#политика\n\n<a href=\"https://telex.hu/1\">Telex</a>",
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        publisher(server.uri()).post(&dispatch()).await.unwrap();
    }

    #[tokio::test]
    async fn test_retries_after_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rate_limited(0))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        publisher(server.uri()).post(&dispatch()).await.unwrap();
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rate_limited(0))
            .expect(3)
            .mount(&server)
            .await;

        let err = publisher(server.uri()).post(&dispatch()).await.unwrap_err();
        assert!(matches!(err, PublishError::RateLimited { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = publisher(server.uri()).post(&dispatch()).await.unwrap_err();
        assert!(matches!(err, PublishError::Api(msg) if msg.contains("chat not found")));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let err = publisher(server.uri()).post(&dispatch()).await.unwrap_err();
        assert!(matches!(err, PublishError::Auth(_)));
    }

    #[tokio::test]
    async fn test_disabled_publisher() {
        let publisher = TelegramPublisher::disabled();
        assert!(!publisher.is_enabled());
        assert!(matches!(
            publisher.post(&dispatch()).await,
            Err(PublishError::Disabled)
        ));
    }
}
