//! Ollama local LLM adapter

use async_trait::async_trait;
use news_relay_domain::{Generator, LlmError, Translator};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LlmConfig, build_translation_prompt};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Ollama backend serving both free-form generation and translation
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    config: LlmConfig,
    retry_delay: Duration,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        Self::with_base_url(DEFAULT_OLLAMA_URL.to_string(), config)
    }

    pub fn with_base_url(base_url: String, config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Base delay between attempts; doubles on each retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Wait after the given failed attempt, doubling from the base delay up to a cap
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }

    async fn send(&self, prompt: &str) -> Result<reqwest::Response, reqwest::Error> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };

        self.client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
    }

    /// Post a prompt, retrying only when the server could not be reached
    async fn call_api(&self, prompt: &str) -> Result<String, LlmError> {
        let attempts = self.config.retries.max(1);
        let mut attempt = 1;
        let response = loop {
            match self.send(prompt).await {
                Ok(response) => break response,
                Err(e) if attempt < attempts && (e.is_connect() || e.is_timeout()) => {
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Ollama unreachable, retrying"
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) if e.is_timeout() => return Err(LlmError::Timeout),
                Err(e) => return Err(LlmError::Api(e.to_string())),
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("API returned {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;
        let api_response: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidFormat(format!("Invalid JSON from Ollama: {}", e)))?;

        let text = api_response.response.trim();
        if text.is_empty() {
            return Err(LlmError::InvalidFormat("empty response".to_string()));
        }

        Ok(text.to_string())
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl Generator for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.call_api(prompt).await
    }
}

#[async_trait]
impl Translator for OllamaBackend {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, LlmError> {
        let prompt = build_translation_prompt(text, source_lang, target_lang);
        self.call_api(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(base_url: String) -> OllamaBackend {
        OllamaBackend::with_base_url(
            base_url,
            LlmConfig {
                timeout_secs: 5,
                ..Default::default()
            },
        )
        .unwrap()
        .with_retry_delay(Duration::ZERO)
    }

    #[test]
    fn test_backoff_doubles_and_is_capped() {
        let backend = backend(DEFAULT_OLLAMA_URL.to_string())
            .with_retry_delay(Duration::from_millis(500));

        assert_eq!(backend.backoff(1), Duration::from_millis(500));
        assert_eq!(backend.backoff(3), Duration::from_secs(2));
        assert_eq!(backend.backoff(40), MAX_RETRY_DELAY);
        assert_eq!(backend.backoff(u32::MAX), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_translate_returns_trimmed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "translategemma:latest",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "  Привет мир\n"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend(server.uri())
            .translate("Szia világ", "HU", "RU")
            .await
            .unwrap();

        assert_eq!(result, "Привет мир");
    }

    #[tokio::test]
    async fn test_prompt_contains_text_and_languages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "ok"
            })))
            .mount(&server)
            .await;

        backend(server.uri())
            .translate("Szia világ", "HU", "EN")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.contains("Hungarian text to English"));
        assert!(prompt.contains("Szia világ"));
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({ "prompt": "Classify this" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "политика"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend(server.uri()).generate("Classify this").await.unwrap();
        assert_eq!(result, "политика");
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "   "
            })))
            .mount(&server)
            .await;

        let err = backend(server.uri())
            .translate("Szia", "HU", "RU")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidFormat(msg) if msg == "empty response"));
    }

    #[tokio::test]
    async fn test_non_json_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = backend(server.uri())
            .translate("Szia", "HU", "RU")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not found"))
            .expect(1)
            .mount(&server)
            .await;

        let err = backend(server.uri())
            .translate("Szia", "HU", "RU")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_after_retries() {
        // Nothing listens on port 9 locally
        let err = backend("http://127.0.0.1:9".to_string())
            .translate("Szia", "HU", "RU")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api(_) | LlmError::Timeout));
    }
}
