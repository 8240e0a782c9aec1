//! In-memory history store for testing and offline mode

use async_trait::async_trait;
use news_relay_domain::{
    Clock, HistoryError, HistoryStats, HistoryStore, SeenRecord, SimilarityWindow, SystemClock,
    token_sort_ratio,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use time::Duration;

/// In-memory history store implementation
pub struct InMemoryHistoryStore {
    records: RwLock<HashMap<String, SeenRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn is_seen(&self, url: &str) -> Result<bool, HistoryError> {
        let records = self
            .records
            .read()
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(records.contains_key(url))
    }

    async fn mark_seen(&self, url: &str, title: &str) -> Result<(), HistoryError> {
        let now = self.clock.now();
        let mut records = self
            .records
            .write()
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        records.insert(
            url.to_string(),
            SeenRecord {
                url: url.to_string(),
                title: title.to_string(),
                posted_at: Some(now),
            },
        );
        Ok(())
    }

    async fn find_similar(
        &self,
        title: &str,
        window: &SimilarityWindow,
    ) -> Result<Option<String>, HistoryError> {
        let cutoff = self.clock.now() - Duration::hours(i64::from(window.hours));
        let records = self
            .records
            .read()
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let mut recent: Vec<&SeenRecord> = records
            .values()
            .filter(|r| !r.title.is_empty())
            .filter(|r| r.posted_at.is_some_and(|at| at >= cutoff))
            .collect();
        recent.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));

        Ok(recent
            .into_iter()
            .take(window.scan_limit as usize)
            .find(|r| token_sort_ratio(title, &r.title) >= window.threshold)
            .map(|r| r.title.clone()))
    }

    async fn prune(&self, keep_days: u32) -> Result<u64, HistoryError> {
        let cutoff = self.clock.now() - Duration::days(i64::from(keep_days));
        let mut records = self
            .records
            .write()
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let before = records.len();
        records.retain(|_, r| r.posted_at.is_none_or(|at| at >= cutoff));
        Ok((before - records.len()) as u64)
    }

    async fn record(&self, url: &str) -> Result<Option<SeenRecord>, HistoryError> {
        let records = self
            .records
            .read()
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(records.get(url).cloned())
    }

    async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        let records = self
            .records
            .read()
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        let total = records.len() as u64;
        let timestamped = records.values().filter(|r| r.posted_at.is_some()).count() as u64;
        Ok(HistoryStats {
            total,
            timestamped,
            untimestamped: total - timestamped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_and_lookup() {
        let store = InMemoryHistoryStore::new();

        store.mark_seen("https://hvg.hu/1", "Новость").await.unwrap();

        assert!(store.is_seen("https://hvg.hu/1").await.unwrap());
        assert!(!store.is_seen("https://hvg.hu/2").await.unwrap());
        let record = store.record("https://hvg.hu/1").await.unwrap().unwrap();
        assert_eq!(record.title, "Новость");
        assert!(record.posted_at.is_some());
    }

    #[tokio::test]
    async fn test_find_similar() {
        let store = InMemoryHistoryStore::new();
        store
            .mark_seen("https://hvg.hu/1", "Венгрия повысила налоги на доходы граждан")
            .await
            .unwrap();

        let window = SimilarityWindow::default();
        assert!(
            store
                .find_similar("Венгрия повысила налоги на доходы", &window)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .find_similar("Погода в Будапеште на выходных", &window)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_prune_on_fresh_store_removes_nothing() {
        let store = InMemoryHistoryStore::new();
        store.mark_seen("https://hvg.hu/1", "Новость").await.unwrap();

        assert_eq!(store.prune(30).await.unwrap(), 0);
        assert_eq!(store.stats().await.unwrap().total, 1);
    }
}
