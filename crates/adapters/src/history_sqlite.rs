//! SQLite history store implementation

use async_trait::async_trait;
use news_relay_domain::{
    Clock, HistoryError, HistoryStats, HistoryStore, SeenRecord, SimilarityWindow, SystemClock,
    token_sort_ratio,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;
use time::{
    Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::FormatItem,
    macros::format_description,
};
use tokio::sync::Mutex;

/// Timestamp layout of SQLite's `CURRENT_TIMESTAMP`, which legacy rows use
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// SQLite-backed history store
pub struct SqliteHistoryStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    // Writers queue here instead of racing for SQLite's file lock
    write_lock: Mutex<()>,
}

impl SqliteHistoryStore {
    /// Open (or create) the history database at `db_path`
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HistoryError::Database(format!("Failed to create directory: {}", e))
            })?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory SQLite store (for testing and dry runs)
    pub async fn in_memory() -> Result<Self, HistoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, HistoryError> {
        let store = Self {
            pool,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        };
        store.init().await?;
        Ok(store)
    }

    /// Replace the clock used for timestamps and cutoffs
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create or upgrade the schema; safe to call repeatedly
    pub async fn init(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_urls (
                url TEXT PRIMARY KEY,
                title TEXT DEFAULT '',
                posted_at TEXT DEFAULT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        // Databases created before titles and timestamps were tracked only have `url`
        let columns: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info('seen_urls')")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| HistoryError::Database(e.to_string()))?;
        let has_column = |name: &str| columns.iter().any(|(c,)| c == name);

        if !has_column("title") {
            tracing::info!("Adding title column to history");
            sqlx::query("ALTER TABLE seen_urls ADD COLUMN title TEXT DEFAULT ''")
                .execute(&self.pool)
                .await
                .map_err(|e| HistoryError::Database(e.to_string()))?;
        }

        if !has_column("posted_at") {
            tracing::info!("Adding posted_at column to history");
            sqlx::query("ALTER TABLE seen_urls ADD COLUMN posted_at TEXT DEFAULT NULL")
                .execute(&self.pool)
                .await
                .map_err(|e| HistoryError::Database(e.to_string()))?;
        }

        sqlx::query("UPDATE seen_urls SET posted_at = NULL WHERE posted_at = ''")
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posted_at ON seen_urls(posted_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(())
    }

    fn timestamp(&self, at: OffsetDateTime) -> Result<String, HistoryError> {
        at.to_offset(UtcOffset::UTC)
            .format(TIMESTAMP_FORMAT)
            .map_err(|e| HistoryError::Serialization(e.to_string()))
    }
}

fn parse_timestamp(value: &str) -> Result<OffsetDateTime, HistoryError> {
    PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| HistoryError::Serialization(format!("Bad posted_at '{}': {}", value, e)))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn is_seen(&self, url: &str) -> Result<bool, HistoryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM seen_urls WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(count.0 > 0)
    }

    async fn mark_seen(&self, url: &str, title: &str) -> Result<(), HistoryError> {
        let posted_at = self.timestamp(self.clock.now())?;
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            r#"
            INSERT INTO seen_urls (url, title, posted_at)
            VALUES (?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                posted_at = excluded.posted_at
            "#,
        )
        .bind(url)
        .bind(title)
        .bind(&posted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_similar(
        &self,
        title: &str,
        window: &SimilarityWindow,
    ) -> Result<Option<String>, HistoryError> {
        let cutoff =
            self.timestamp(self.clock.now() - Duration::hours(i64::from(window.hours)))?;

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT title FROM seen_urls
            WHERE title IS NOT NULL AND title != ''
              AND posted_at IS NOT NULL AND posted_at >= ?
            ORDER BY posted_at DESC
            LIMIT ?
            "#,
        )
        .bind(&cutoff)
        .bind(i64::from(window.scan_limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        // Scoring is CPU-bound over up to `scan_limit` rows
        let title = title.to_string();
        let threshold = window.threshold;
        tokio::task::spawn_blocking(move || {
            rows.into_iter()
                .map(|(existing,)| existing)
                .find(|existing| token_sort_ratio(&title, existing) >= threshold)
        })
        .await
        .map_err(|e| HistoryError::Database(format!("Similarity scan failed: {}", e)))
    }

    async fn prune(&self, keep_days: u32) -> Result<u64, HistoryError> {
        let cutoff = self.timestamp(self.clock.now() - Duration::days(i64::from(keep_days)))?;
        let _guard = self.write_lock.lock().await;

        let result =
            sqlx::query("DELETE FROM seen_urls WHERE posted_at IS NOT NULL AND posted_at < ?")
                .bind(&cutoff)
                .execute(&self.pool)
                .await
                .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn record(&self, url: &str) -> Result<Option<SeenRecord>, HistoryError> {
        let row: Option<(String, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT url, title, posted_at FROM seen_urls WHERE url = ?")
                .bind(url)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| HistoryError::Database(e.to_string()))?;

        match row {
            Some((url, title, posted_at)) => {
                let posted_at = posted_at.as_deref().map(parse_timestamp).transpose()?;
                Ok(Some(SeenRecord {
                    url,
                    title: title.unwrap_or_default(),
                    posted_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        let (total, timestamped): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(posted_at) FROM seen_urls")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| HistoryError::Database(e.to_string()))?;

        let total = total as u64;
        let timestamped = timestamped as u64;
        Ok(HistoryStats {
            total,
            timestamped,
            untimestamped: total - timestamped,
        })
    }
}
