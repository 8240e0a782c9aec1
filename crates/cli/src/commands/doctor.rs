//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    history: CheckResult,
    feeds: CheckResult,
    translator: CheckResult,
    llm: CheckResult,
    telegram: CheckResult,
    secondary: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self::with_status("ok", message)
    }

    fn warn(message: impl Into<String>) -> Self {
        Self::with_status("warn", message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::with_status("error", message)
    }

    fn with_status(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        history: CheckResult::error("Not checked"),
        feeds: CheckResult::error("Not checked"),
        translator: CheckResult::error("Not checked"),
        llm: CheckResult::error("Not checked"),
        telegram: CheckResult::error("Not checked"),
        secondary: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    match AppConfig::load(config_path.as_deref()) {
        Ok(config) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            report.history = check_history(&config.general.state_db_path);
            report.feeds = check_feeds(&config);
            report.translator = check_translator(&config);
            report.llm = check_llm(&config);
            report.telegram = check_telegram(&config);
            report.secondary = check_secondary(&config);
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
        }
    }

    let checks = [
        &report.config,
        &report.history,
        &report.feeds,
        &report.translator,
        &report.llm,
        &report.telegram,
        &report.secondary,
    ];

    report.overall = if checks.iter().any(|c| c.is_error()) {
        "error".to_string()
    } else if checks.iter().all(|c| c.is_ok()) {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_history(db_path: &Path) -> CheckResult {
    if db_path.exists() {
        return CheckResult::ok(format!("Database: {}", db_path.display()));
    }

    // The store creates the file and its parent directories on first open
    let parent = db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if parent.exists() {
        CheckResult::ok(format!("Database will be created: {}", db_path.display()))
    } else {
        CheckResult::warn(format!(
            "Database directory does not exist yet: {}",
            parent.display()
        ))
    }
}

fn check_feeds(config: &AppConfig) -> CheckResult {
    let sources = &config.feeds.sources;
    if sources.is_empty() {
        return CheckResult::warn("No feeds configured");
    }

    let invalid: Vec<&str> = sources
        .iter()
        .filter(|s| !(s.url.starts_with("http://") || s.url.starts_with("https://")))
        .map(|s| s.name.as_str())
        .collect();
    if !invalid.is_empty() {
        return CheckResult::error(format!("Feeds with non-HTTP URLs: {}", invalid.join(", ")));
    }

    CheckResult::ok(format!("{} feeds configured", sources.len())).with_details(
        serde_json::json!({
            "count": sources.len(),
            "names": sources.iter().map(|s| &s.name).collect::<Vec<_>>()
        }),
    )
}

fn check_translator(config: &AppConfig) -> CheckResult {
    let pair = format!(
        "{} → {}",
        config.pipeline.source_lang, config.pipeline.target_lang
    );

    match config.translator.provider.trim() {
        "ollama" => CheckResult::ok(format!(
            "Provider: ollama, Model: {}, {}",
            config.llm.model, pair
        )),
        "deepl" => {
            let env_var = &config.translator.deepl.api_key_env;
            if env_var.trim().is_empty() {
                return CheckResult::error("No API key env var configured for deepl");
            }
            if env_is_set(env_var) {
                CheckResult::ok(format!("Provider: deepl, API key: {} (set), {}", env_var, pair))
            } else {
                CheckResult::warn(format!(
                    "Provider: deepl, API key: {} (not set), {}",
                    env_var, pair
                ))
            }
        }
        "stub" => CheckResult::warn("Provider: stub (headlines pass through untranslated)"),
        other => CheckResult::error(format!("Unknown translator provider: {}", other)),
    }
}

fn check_llm(config: &AppConfig) -> CheckResult {
    let llm = &config.llm;
    match llm.provider.trim() {
        "ollama" if !config.tagger.enabled => CheckResult::ok("Tagging disabled"),
        "ollama" => CheckResult::ok(format!(
            "Provider: ollama, Model: {}, base_url: {}",
            llm.model, llm.ollama.base_url
        )),
        "stub" => CheckResult::ok("Provider: stub (offline)"),
        "none" => CheckResult::ok("Tagging disabled"),
        other => CheckResult::error(format!("Unknown LLM provider: {}", other)),
    }
}

fn check_telegram(config: &AppConfig) -> CheckResult {
    let telegram = &config.telegram;
    let suffix = if config.general.dry_run {
        " (dry run enabled)"
    } else {
        ""
    };

    let Some(channel) = telegram.resolve_channel_id() else {
        return CheckResult::warn(format!(
            "No channel configured: set telegram.channel_id or {}{}",
            telegram.channel_id_env, suffix
        ));
    };

    if telegram.bot_token_env.trim().is_empty() {
        return CheckResult::error("No bot token env var configured");
    }

    if env_is_set(&telegram.bot_token_env) {
        CheckResult::ok(format!(
            "Channel: {}, Bot token: {} (set){}",
            channel, telegram.bot_token_env, suffix
        ))
    } else {
        CheckResult::warn(format!(
            "Channel: {}, Bot token: {} (not set){}",
            channel, telegram.bot_token_env, suffix
        ))
    }
}

fn check_secondary(config: &AppConfig) -> CheckResult {
    let secondary = &config.telegram.secondary;
    if !secondary.enabled {
        return CheckResult::ok("Secondary channel disabled");
    }

    if secondary.channel_id.trim().is_empty() {
        return CheckResult::error("Secondary channel enabled but channel_id is empty");
    }

    CheckResult::ok(format!(
        "Channel: {}, Language: {}",
        secondary.channel_id.trim(),
        secondary.target_lang
    ))
}

fn env_is_set(env_var: &str) -> bool {
    std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty())
}

fn print_report(report: &DoctorReport) {
    println!("news-relay Doctor Report");
    println!("========================");
    println!();

    print_check("Config", &report.config);
    print_check("History", &report.history);
    print_check("Feeds", &report.feeds);
    print_check("Translator", &report.translator);
    print_check("Tagging LLM", &report.llm);
    print_check("Telegram", &report.telegram);
    print_check("Secondary", &report.secondary);

    println!();
    println!(
        "{} Overall: {}",
        status_symbol(&report.overall),
        report.overall.to_uppercase()
    );

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: news-relay run --dry-run --once");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    println!("{} {}: {}", status_symbol(&result.status), name, result.message);
}

fn status_symbol(status: &str) -> &'static str {
    match status {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    }
}
