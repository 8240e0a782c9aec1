//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Article, Dispatch, HistoryStats, SeenRecord, SimilarityWindow};

/// Error type for feed source operations
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("All {0} feeds failed")]
    AllFailed(usize),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Port for fetching articles from the configured feeds
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch every configured feed. Individual feed failures are logged by
    /// the implementation and only reduce the result.
    async fn fetch_all(&self) -> Result<Vec<Article>, FeedError>;
}

/// Error type for language-model backed operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for translating text between languages
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` to `target_lang` (ISO codes such as "HU")
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, LlmError>;

    /// Release backend resources
    async fn close(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Port for free-form text generation
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Publisher is disabled")]
    Disabled,
}

/// Port for delivering messages to a channel
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver a message. Implementations retry destination rate limits
    /// themselves and only fail once retries are exhausted.
    async fn post(&self, dispatch: &Dispatch) -> Result<(), PublishError>;

    /// Check if this publisher is enabled
    fn is_enabled(&self) -> bool;

    /// Destination label for logs
    fn channel(&self) -> &str;
}

/// Error type for history store operations
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the persistent URL history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Whether a record exists for `url`
    async fn is_seen(&self, url: &str) -> Result<bool, HistoryError>;

    /// Insert or refresh the record for `url` with the current time
    async fn mark_seen(&self, url: &str, title: &str) -> Result<(), HistoryError>;

    /// Most recent stored title within the window scoring at or above the threshold
    async fn find_similar(
        &self,
        title: &str,
        window: &SimilarityWindow,
    ) -> Result<Option<String>, HistoryError>;

    /// Delete records posted more than `keep_days` ago, returning how many
    /// were removed. Records without a timestamp are kept.
    async fn prune(&self, keep_days: u32) -> Result<u64, HistoryError>;

    /// Fetch the record for `url`
    async fn record(&self, url: &str) -> Result<Option<SeenRecord>, HistoryError>;

    /// Aggregate counts
    async fn stats(&self) -> Result<HistoryStats, HistoryError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
