//! Outbox publisher: appends dispatches to a JSONL file for review instead of posting.

use async_trait::async_trait;
use news_relay_domain::usecases::{RenderConfig, Renderer};
use news_relay_domain::{Dispatch, PublishError, Publisher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// Publisher that records each dispatch as one JSON line
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    writer: OutboxWriter,
    channel: String,
    renderer: Renderer,
}

impl OutboxPublisher {
    pub fn new(writer: OutboxWriter, channel: impl Into<String>) -> Self {
        Self {
            writer,
            channel: channel.into(),
            renderer: Renderer::default(),
        }
    }

    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.renderer = Renderer::new(config);
        self
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    channel: &'a str,
    #[serde(with = "time::serde::rfc3339")]
    written_at: OffsetDateTime,
    #[serde(flatten)]
    dispatch: &'a Dispatch,
    html: String,
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn post(&self, dispatch: &Dispatch) -> Result<(), PublishError> {
        let entry = OutboxEntry {
            channel: &self.channel,
            written_at: OffsetDateTime::now_utc(),
            dispatch,
            html: self.renderer.render_html(dispatch),
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| PublishError::Api(format!("Outbox write failed: {}", error)))
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}
