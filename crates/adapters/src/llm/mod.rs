//! Language-model and translation adapters

pub mod deepl;
pub mod ollama;
pub mod stub;

pub use deepl::DeepLTranslator;
pub use ollama::OllamaBackend;
pub use stub::{StubGenerator, StubTranslator};

use serde::{Deserialize, Serialize};

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts made when the backend is unreachable
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "translategemma:latest".to_string(),
            timeout_secs: 60,
            retries: 3,
        }
    }
}

/// English name of a language code, falling back to the code itself
fn language_name(code: &str) -> &str {
    match code.to_ascii_uppercase().as_str() {
        "HU" => "Hungarian",
        "RU" => "Russian",
        "EN" | "EN-GB" | "EN-US" => "English",
        "DE" => "German",
        "UK" => "Ukrainian",
        _ => code,
    }
}

/// Build the translation prompt for instruction-following models
pub fn build_translation_prompt(text: &str, source_lang: &str, target_lang: &str) -> String {
    format!(
        "Translate the following {} text to {}. \
         Return only the translation, no explanations:\n\n{}",
        language_name(source_lang),
        language_name(target_lang),
        text
    )
}
