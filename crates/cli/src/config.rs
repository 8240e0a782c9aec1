//! Configuration loading and management

use anyhow::{Context, Result};
use news_relay_adapters::feeds::default_sources;
use news_relay_domain::usecases::{DEFAULT_VOCABULARY, PipelineConfig, RenderConfig, TagConfig};
use news_relay_domain::{FeedSpec, SimilarityWindow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub feeds: FeedsConfig,

    #[serde(default)]
    pub translator: TranslatorConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub tagger: TaggerConfig,

    #[serde(default)]
    pub telegram: TelegramSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_source_lang")]
    pub source_lang: String,

    #[serde(default = "default_target_lang")]
    pub target_lang: String,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_similarity_window_hours")]
    pub similarity_window_hours: u32,

    #[serde(default = "default_similarity_scan_limit")]
    pub similarity_scan_limit: u32,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_publish_delay")]
    pub publish_delay_secs: u64,

    #[serde(default = "default_prune_failure_ceiling")]
    pub prune_failure_ceiling: u32,

    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_sources")]
    pub sources: Vec<FeedSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// ollama, deepl or stub
    #[serde(default = "default_translator_provider")]
    pub provider: String,

    #[serde(default)]
    pub deepl: DeepLConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepLConfig {
    #[serde(default = "default_deepl_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_deepl_base_url")]
    pub base_url: String,

    #[serde(default = "default_deepl_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend for tag generation: ollama, stub or none
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: u32,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_tags")]
    pub max_tags: usize,

    #[serde(default = "default_vocabulary")]
    pub vocabulary: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSection {
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Channel to post to; read from `channel_id_env` when empty
    #[serde(default)]
    pub channel_id: String,

    #[serde(default = "default_channel_id_env")]
    pub channel_id_env: String,

    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u64,

    /// Link text for articles whose feed has no name
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,

    #[serde(default)]
    pub secondary: SecondaryChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryChannelConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub channel_id: String,

    #[serde(default = "default_secondary_lang")]
    pub target_lang: String,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./data/seen.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    1800
}

fn default_source_lang() -> String {
    "HU".to_string()
}

fn default_target_lang() -> String {
    "RU".to_string()
}

fn default_similarity_threshold() -> f64 {
    SimilarityWindow::default().threshold
}

fn default_similarity_window_hours() -> u32 {
    SimilarityWindow::default().hours
}

fn default_similarity_scan_limit() -> u32 {
    SimilarityWindow::default().scan_limit
}

fn default_retention_days() -> u32 {
    30
}

fn default_publish_delay() -> u64 {
    3
}

fn default_prune_failure_ceiling() -> u32 {
    10
}

fn default_feed_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("news-relay/{}", env!("CARGO_PKG_VERSION"))
}

fn default_translator_provider() -> String {
    "ollama".to_string()
}

fn default_deepl_api_key_env() -> String {
    "DEEPL_API_KEY".to_string()
}

fn default_deepl_base_url() -> String {
    "https://api-free.deepl.com".to_string()
}

fn default_deepl_timeout() -> u64 {
    30
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "translategemma:latest".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_llm_retries() -> u32 {
    3
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_tags() -> usize {
    3
}

fn default_vocabulary() -> Vec<String> {
    DEFAULT_VOCABULARY.iter().map(|w| w.to_string()).collect()
}

fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_channel_id_env() -> String {
    "TELEGRAM_CHANNEL_ID".to_string()
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_telegram_timeout() -> u64 {
    30
}

fn default_fallback_label() -> String {
    RenderConfig::default().fallback_source_label
}

fn default_secondary_lang() -> String {
    "EN".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            log_level: default_log_level(),
            dry_run: false,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            similarity_threshold: default_similarity_threshold(),
            similarity_window_hours: default_similarity_window_hours(),
            similarity_scan_limit: default_similarity_scan_limit(),
            retention_days: default_retention_days(),
            publish_delay_secs: default_publish_delay(),
            prune_failure_ceiling: default_prune_failure_ceiling(),
            ignore_patterns: vec![],
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_feed_timeout(),
            user_agent: default_user_agent(),
            sources: default_sources(),
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: default_translator_provider(),
            deepl: DeepLConfig::default(),
        }
    }
}

impl Default for DeepLConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_deepl_api_key_env(),
            base_url: default_deepl_base_url(),
            timeout_secs: default_deepl_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_model(),
            timeout_secs: default_llm_timeout(),
            retries: default_llm_retries(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tags: default_max_tags(),
            vocabulary: default_vocabulary(),
        }
    }
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
            channel_id: String::new(),
            channel_id_env: default_channel_id_env(),
            base_url: default_telegram_base_url(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_telegram_timeout(),
            fallback_label: default_fallback_label(),
            secondary: SecondaryChannelConfig::default(),
        }
    }
}

impl Default for SecondaryChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_id: String::new(),
            target_lang: default_secondary_lang(),
        }
    }
}

impl TelegramSection {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            fallback_source_label: self.fallback_label.clone(),
        }
    }

    /// Configured channel, falling back to the channel env var
    pub fn resolve_channel_id(&self) -> Option<String> {
        let configured = self.channel_id.trim();
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        std::env::var(&self.channel_id_env)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("NEWS_RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Pipeline settings for a run
    pub fn pipeline_config(&self, dry_run: bool) -> PipelineConfig {
        let max_tags = if self.tagger.enabled && self.llm.provider.trim() != "none" {
            self.tagger.max_tags
        } else {
            0
        };

        PipelineConfig {
            source_lang: self.pipeline.source_lang.clone(),
            target_lang: self.pipeline.target_lang.clone(),
            similarity: SimilarityWindow {
                threshold: self.pipeline.similarity_threshold,
                hours: self.pipeline.similarity_window_hours,
                scan_limit: self.pipeline.similarity_scan_limit,
            },
            retention_days: self.pipeline.retention_days,
            publish_delay: Duration::from_secs(self.pipeline.publish_delay_secs),
            prune_failure_ceiling: self.pipeline.prune_failure_ceiling,
            ignore_patterns: self.pipeline.ignore_patterns.clone(),
            dry_run,
            tag_config: TagConfig {
                vocabulary: self.tagger.vocabulary.clone(),
                max_tags,
                ..Default::default()
            },
            render_config: self.telegram.render_config(),
        }
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# news-relay configuration

[general]
state_db_path = "./data/seen.db"
log_level = "info"
dry_run = false
poll_interval_secs = 1800

[pipeline]
source_lang = "HU"
target_lang = "RU"
# Token-sort similarity (0-100) at which two headlines count as the same story
similarity_threshold = 80.0
similarity_window_hours = 24
similarity_scan_limit = 5000
retention_days = 30
publish_delay_secs = 3
# Consecutive history-prune failures before a run is aborted
prune_failure_ceiling = 10
# ignore_patterns = ["^PR:", "(?i)szponzorált"]

[feeds]
timeout_secs = 30
user_agent = "news-relay"

[[feeds.sources]]
name = "Telex"
url = "https://telex.hu/rss"

[[feeds.sources]]
name = "HVG"
url = "https://hvg.hu/rss"

[[feeds.sources]]
name = "24.hu"
url = "https://24.hu/feed/"

[[feeds.sources]]
name = "444"
url = "https://444.hu/feed"

[[feeds.sources]]
name = "Direkt36"
url = "https://www.direkt36.hu/feed/"

[[feeds.sources]]
name = "Átlátszó"
url = "https://atlatszo.hu/feed/"

[[feeds.sources]]
name = "Portfolio"
url = "https://www.portfolio.hu/rss/all.xml"

[[feeds.sources]]
name = "G7"
url = "https://telex.hu/rss/g7"

[translator]
provider = "ollama"  # ollama, deepl, stub

[translator.deepl]
api_key_env = "DEEPL_API_KEY"
base_url = "https://api-free.deepl.com"
timeout_secs = 30

[llm]
provider = "ollama"  # ollama, stub, none
model = "translategemma:latest"
timeout_secs = 60
retries = 3

[llm.ollama]
base_url = "http://localhost:11434"

[tagger]
enabled = true
max_tags = 3
# vocabulary = ["политика", "экономика", "спорт"]

[telegram]
bot_token_env = "TELEGRAM_BOT_TOKEN"
# channel_id = "@your_channel"
channel_id_env = "TELEGRAM_CHANNEL_ID"
base_url = "https://api.telegram.org"
max_attempts = 3
timeout_secs = 30
fallback_label = "Источник"

[telegram.secondary]
enabled = false
# channel_id = "@your_channel_en"
target_lang = "EN"
"#
        .to_string()
    }
}
