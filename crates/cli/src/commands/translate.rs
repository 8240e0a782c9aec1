//! Translate command - one-shot translation and tagging of a headline

use anyhow::{Context, Result, bail};
use news_relay_adapters::llm::{
    DeepLTranslator, LlmConfig as AdapterLlmConfig, OllamaBackend, StubGenerator, StubTranslator,
};
use news_relay_domain::usecases::{Tagger, summarize};
use news_relay_domain::{Article, Generator, Translator};
use secrecy::SecretString;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::TranslateArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct TranslateOutput {
    source_lang: String,
    target_lang: String,
    original: String,
    translation: String,
    summary: String,
    tags: Vec<String>,
}

pub async fn execute(args: TranslateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let text = args.text.trim();
    if text.is_empty() {
        bail!("No text provided for translation");
    }

    let source_lang = args
        .from
        .unwrap_or_else(|| config.pipeline.source_lang.clone());
    let target_lang = args
        .to
        .unwrap_or_else(|| config.pipeline.target_lang.clone());

    let translator = build_translator(&config)?;
    let generator = build_generator(&config)?;

    tracing::info!(
        provider = %config.translator.provider,
        source_lang = %source_lang,
        target_lang = %target_lang,
        "Translating headline"
    );

    let translation = translator
        .translate(text, &source_lang, &target_lang)
        .await
        .context("Translation failed")?;

    let tagger = Tagger::new(config.pipeline_config(false).tag_config);
    let tags = tagger
        .tags(&Article::new(text, "cli-input", "cli"), generator.as_ref())
        .await;

    if let Err(e) = translator.close().await {
        tracing::warn!(error = %e, "Failed to close translator");
    }

    let output = TranslateOutput {
        summary: summarize(&translation),
        source_lang,
        target_lang,
        original: text.to_string(),
        translation,
        tags,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} → {}", output.source_lang, output.target_lang);
        println!();
        println!("{}", output.summary);
        if !output.tags.is_empty() {
            println!("{}", output.tags.join(" "));
        }
    }

    Ok(())
}

/// Build the translation backend named by `translator.provider`
pub(crate) fn build_translator(config: &AppConfig) -> Result<Arc<dyn Translator>> {
    let provider = config.translator.provider.trim();
    match provider {
        "ollama" => Ok(Arc::new(build_ollama(config)?)),
        "deepl" => {
            let deepl = &config.translator.deepl;
            let api_key = load_api_key(&deepl.api_key_env, "deepl")?;
            let translator =
                DeepLTranslator::with_base_url(api_key, deepl.base_url.clone(), deepl.timeout_secs)
                    .context("Failed to build DeepL translator")?;
            Ok(Arc::new(translator))
        }
        "stub" => Ok(Arc::new(StubTranslator::new())),
        other => bail!("Unknown translator provider: {}", other),
    }
}

/// Build the tag-generation backend named by `llm.provider`
pub(crate) fn build_generator(config: &AppConfig) -> Result<Arc<dyn Generator>> {
    let provider = config.llm.provider.trim();
    match provider {
        "ollama" => Ok(Arc::new(build_ollama(config)?)),
        // An empty reply parses to no tags
        "stub" => Ok(Arc::new(StubGenerator::replying(""))),
        "none" => Ok(Arc::new(StubGenerator::unavailable())),
        other => bail!("Unknown LLM provider: {}", other),
    }
}

fn build_ollama(config: &AppConfig) -> Result<OllamaBackend> {
    let llm_config = AdapterLlmConfig {
        model: config.llm.model.clone(),
        timeout_secs: config.llm.timeout_secs,
        retries: config.llm.retries,
    };
    OllamaBackend::with_base_url(config.llm.ollama.base_url.clone(), llm_config)
        .context("Failed to build Ollama backend")
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for provider {}", provider);
    }

    let key = std::env::var(env_var).with_context(|| {
        format!(
            "Missing API key env var {} for provider {}",
            env_var, provider
        )
    })?;

    if key.trim().is_empty() {
        bail!(
            "API key env var {} is empty for provider {}",
            env_var,
            provider
        );
    }

    Ok(SecretString::new(key.into()))
}
