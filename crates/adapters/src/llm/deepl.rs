//! DeepL translation adapter

use async_trait::async_trait;
use news_relay_domain::{LlmError, Translator};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DEEPL_URL: &str = "https://api-free.deepl.com";

/// Translator backed by the DeepL REST API
pub struct DeepLTranslator {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl DeepLTranslator {
    pub fn new(api_key: SecretString, timeout_secs: u64) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, DEFAULT_DEEPL_URL.to_string(), timeout_secs)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

#[async_trait]
impl Translator for DeepLTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, LlmError> {
        let request = TranslateRequest {
            text: [text],
            source_lang,
            target_lang,
        };

        let response = self
            .client
            .post(format!("{}/v2/translate", self.base_url))
            .header(
                "Authorization",
                format!("DeepL-Auth-Key {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Api(e.to_string())
                }
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Err(LlmError::Config("DeepL rejected the API key".to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(LlmError::RateLimited),
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api(format!("API returned {}: {}", status, body)));
            }
        }

        let api_response: TranslateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidFormat(e.to_string()))?;

        api_response
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| LlmError::InvalidFormat("No translations in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator(base_url: String) -> DeepLTranslator {
        DeepLTranslator::with_base_url(SecretString::from("test-key"), base_url, 5).unwrap()
    }

    #[tokio::test]
    async fn test_translate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "DeepL-Auth-Key test-key"))
            .and(body_json(serde_json::json!({
                "text": ["Szia világ"],
                "source_lang": "HU",
                "target_lang": "RU"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{ "detected_source_language": "HU", "text": "Привет мир" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = translator(server.uri())
            .translate("Szia világ", "HU", "RU")
            .await
            .unwrap();
        assert_eq!(result, "Привет мир");
    }

    #[tokio::test]
    async fn test_forbidden_is_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = translator(server.uri())
            .translate("Szia", "HU", "RU")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_translations_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "translations": [] })),
            )
            .mount(&server)
            .await;

        let err = translator(server.uri())
            .translate("Szia", "HU", "RU")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidFormat(_)));
    }
}
