//! Run command - poll feeds and relay new articles

use anyhow::{Context, Result};
use news_relay_adapters::{
    feeds::RssFeedSource,
    history::SqliteHistoryStore,
    outbox::{OutboxPublisher, OutboxWriter},
    telegram::{TelegramConfig, TelegramPublisher},
};
use news_relay_domain::{
    ArticleOutcome, Generator, Publisher, RunReport, Translator,
    usecases::{Pipeline, PipelineError},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

use crate::args::RunArgs;
use crate::commands::translate::{build_generator, build_translator, load_api_key};
use crate::config::AppConfig;

type RelayPipeline =
    Pipeline<RssFeedSource, dyn Translator, dyn Generator, dyn Publisher, SqliteHistoryStore>;

/// Primary publisher plus the optional secondary one
struct Publishers {
    primary: Arc<dyn Publisher>,
    secondary: Option<Arc<dyn Publisher>>,
}

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let mut dry_run = args.dry_run || config.general.dry_run;
    if args.outbox.is_some() && dry_run {
        tracing::info!("--outbox overrides dry-run");
        dry_run = false;
    }

    tracing::info!(
        dry_run = dry_run,
        once = args.once,
        outbox = ?args.outbox,
        feeds = config.feeds.sources.len(),
        "Starting news-relay run"
    );

    let feed_source = Arc::new(
        RssFeedSource::new(
            config.feeds.sources.clone(),
            config.feeds.timeout_secs,
            &config.feeds.user_agent,
        )
        .context("Failed to initialize feed source")?,
    );

    let history = Arc::new(
        SqliteHistoryStore::new(&config.general.state_db_path)
            .await
            .context("Failed to initialize SQLite history store")?,
    );

    let translator = build_translator(&config)?;
    let generator = build_generator(&config)?;

    let publishers = match args.outbox.as_deref() {
        Some(path) => build_outbox_publishers(&config, path).await?,
        None => build_telegram_publishers(&config, dry_run)?,
    };

    let mut pipeline: RelayPipeline = Pipeline::new(
        feed_source,
        translator.clone(),
        generator,
        publishers.primary,
        history.clone(),
        config.pipeline_config(dry_run),
    );
    if let Some(secondary) = publishers.secondary {
        pipeline = pipeline.with_secondary(secondary, config.telegram.secondary.target_lang.clone());
    }

    let result = if args.once {
        tracing::info!("Running single poll cycle");
        pipeline.run_once().await.map(|report| log_outcomes(&report))
    } else {
        poll_forever(&pipeline, Duration::from_secs(config.general.poll_interval_secs)).await
    };

    if let Err(e) = translator.close().await {
        tracing::warn!(error = %e, "Failed to close translator");
    }
    history.close().await;

    result.context("Run aborted")?;
    tracing::info!("news-relay run completed");
    Ok(())
}

async fn poll_forever(pipeline: &RelayPipeline, poll_interval: Duration) -> Result<(), PipelineError> {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match pipeline.run_once().await {
                    Ok(report) => log_outcomes(&report),
                    // A stuck history store will not recover on its own
                    Err(e @ PipelineError::Maintenance { .. }) => return Err(e),
                    Err(e) => tracing::error!(error = %e, "Poll cycle failed"),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                return Ok(());
            }
        }
    }
}

fn log_outcomes(report: &RunReport) {
    for (url, outcome) in &report.outcomes {
        match outcome {
            ArticleOutcome::Published {
                title,
                tags,
                secondary,
            } => {
                tracing::info!(url = %url, title = %title, tags = ?tags, secondary = secondary, "Published");
            }
            ArticleOutcome::Previewed { title, tags } => {
                tracing::info!(url = %url, title = %title, tags = ?tags, "[DRY RUN] Would publish");
            }
            ArticleOutcome::Skipped { reason } => {
                tracing::debug!(url = %url, reason = ?reason, "Skipped");
            }
            ArticleOutcome::Failed { error } => {
                tracing::error!(url = %url, error = %error, "Failed");
            }
        }
    }
}

async fn build_outbox_publishers(config: &AppConfig, path: &Path) -> Result<Publishers> {
    let writer = OutboxWriter::new(path.to_path_buf())
        .await
        .context("Failed to initialize outbox writer")?;

    tracing::info!(outbox = %path.display(), "Writing dispatches to outbox");

    let secondary = config.telegram.secondary.enabled.then(|| {
        Arc::new(
            OutboxPublisher::new(writer.clone(), "secondary")
                .with_render_config(config.telegram.render_config()),
        ) as Arc<dyn Publisher>
    });

    Ok(Publishers {
        primary: Arc::new(
            OutboxPublisher::new(writer, "primary")
                .with_render_config(config.telegram.render_config()),
        ),
        secondary,
    })
}

fn build_telegram_publishers(config: &AppConfig, dry_run: bool) -> Result<Publishers> {
    if dry_run {
        return Ok(Publishers {
            primary: Arc::new(TelegramPublisher::disabled()),
            secondary: None,
        });
    }

    let telegram = &config.telegram;
    let channel_id = telegram.resolve_channel_id().with_context(|| {
        format!(
            "No Telegram channel configured: set telegram.channel_id or {}",
            telegram.channel_id_env
        )
    })?;

    let primary = TelegramPublisher::new(
        load_api_key(&telegram.bot_token_env, "telegram")?,
        telegram_config(config, channel_id),
    )
    .context("Failed to initialize Telegram publisher")?
    .with_render_config(telegram.render_config());

    let secondary = if telegram.secondary.enabled {
        let channel_id = telegram.secondary.channel_id.trim();
        if channel_id.is_empty() {
            anyhow::bail!("Secondary channel enabled but telegram.secondary.channel_id is empty");
        }
        let publisher = TelegramPublisher::new(
            load_api_key(&telegram.bot_token_env, "telegram")?,
            telegram_config(config, channel_id.to_string()),
        )
        .context("Failed to initialize secondary Telegram publisher")?
        .with_render_config(telegram.render_config());
        Some(Arc::new(publisher) as Arc<dyn Publisher>)
    } else {
        None
    };

    Ok(Publishers {
        primary: Arc::new(primary),
        secondary,
    })
}

fn telegram_config(config: &AppConfig, channel_id: String) -> TelegramConfig {
    TelegramConfig {
        channel_id,
        base_url: config.telegram.base_url.clone(),
        max_attempts: config.telegram.max_attempts,
        timeout_secs: config.telegram.timeout_secs,
    }
}
