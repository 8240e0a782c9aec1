//! Stub backends for testing and offline mode

use async_trait::async_trait;
use news_relay_domain::{Generator, LlmError, Translator};
use std::collections::HashMap;

/// Translator that returns its input unchanged unless a scripted reply exists
#[derive(Debug, Default)]
pub struct StubTranslator {
    replies: HashMap<(String, String), String>,
}

impl StubTranslator {
    /// Identity translator
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `translation` when `text` is translated into `target_lang`
    pub fn with_reply(
        mut self,
        text: impl Into<String>,
        target_lang: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        self.replies.insert(
            (text.into(), target_lang.into().to_uppercase()),
            translation.into(),
        );
        self
    }
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> Result<String, LlmError> {
        let key = (text.to_string(), target_lang.to_uppercase());
        Ok(self
            .replies
            .get(&key)
            .cloned()
            .unwrap_or_else(|| text.to_string()))
    }
}

/// Generator with a fixed reply
#[derive(Debug, Clone, Default)]
pub struct StubGenerator {
    reply: Option<String>,
}

impl StubGenerator {
    /// Always reply with `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    /// Always fail, as a backend that is switched off would
    pub fn unavailable() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        self.reply
            .clone()
            .ok_or_else(|| LlmError::Config("No generator configured".to_string()))
    }
}
