//! History command - inspect and maintain the seen-URL store

use anyhow::{Context, Result};
use news_relay_adapters::history::SqliteHistoryStore;
use news_relay_domain::{HistoryStore, SeenRecord};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::{HistoryArgs, HistoryCommands};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct CheckOutput<'a> {
    url: &'a str,
    seen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<SeenRecord>,
}

pub async fn execute(args: HistoryArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let store = SqliteHistoryStore::new(&config.general.state_db_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open history database: {}",
                config.general.state_db_path.display()
            )
        })?;

    let result = match args.command {
        HistoryCommands::Stats { json } => stats(&store, &config, json).await,
        HistoryCommands::Check { url, json } => check(&store, &url, json).await,
        HistoryCommands::Prune { keep_days } => {
            prune(&store, keep_days.unwrap_or(config.pipeline.retention_days)).await
        }
    };

    store.close().await;
    result
}

async fn stats(store: &SqliteHistoryStore, config: &AppConfig, json: bool) -> Result<()> {
    let stats = store.stats().await.context("Failed to read history stats")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("History: {}", config.general.state_db_path.display());
    println!("  Total URLs:       {}", stats.total);
    println!("  With timestamp:   {}", stats.timestamped);
    println!("  Legacy (no time): {}", stats.untimestamped);
    Ok(())
}

async fn check(store: &SqliteHistoryStore, url: &str, json: bool) -> Result<()> {
    let record = store.record(url).await.context("Failed to look up URL")?;

    if json {
        let output = CheckOutput {
            url,
            seen: record.is_some(),
            record,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match record {
        None => println!("Not seen: {}", url),
        Some(record) => {
            println!("Seen: {}", url);
            if !record.title.is_empty() {
                println!("  Title:     {}", record.title);
            }
            match record.posted_at {
                Some(at) => println!("  Posted at: {}", at),
                None => println!("  Posted at: unknown"),
            }
        }
    }
    Ok(())
}

async fn prune(store: &SqliteHistoryStore, keep_days: u32) -> Result<()> {
    let removed = store
        .prune(keep_days)
        .await
        .context("Failed to prune history")?;

    tracing::info!(removed = removed, keep_days = keep_days, "Pruned history");
    println!("Removed {} records older than {} days", removed, keep_days);
    Ok(())
}
