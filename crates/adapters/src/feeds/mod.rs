//! Feed source adapters

mod rss;

pub use rss::RssFeedSource;

use async_trait::async_trait;
use news_relay_domain::{Article, FeedError, FeedSource, FeedSpec};

/// Hungarian outlets polled when no sources are configured
pub fn default_sources() -> Vec<FeedSpec> {
    [
        ("Telex", "https://telex.hu/rss"),
        ("HVG", "https://hvg.hu/rss"),
        ("24.hu", "https://24.hu/feed/"),
        ("444", "https://444.hu/feed"),
        ("Direkt36", "https://www.direkt36.hu/feed/"),
        ("Átlátszó", "https://atlatszo.hu/feed/"),
        ("Portfolio", "https://www.portfolio.hu/rss/all.xml"),
        ("G7", "https://telex.hu/rss/g7"),
    ]
    .into_iter()
    .map(|(name, url)| FeedSpec {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

/// Feed source returning a fixed list of articles
#[derive(Debug, Clone, Default)]
pub struct StubFeedSource {
    articles: Vec<Article>,
}

impl StubFeedSource {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }
}

#[async_trait]
impl FeedSource for StubFeedSource {
    async fn fetch_all(&self) -> Result<Vec<Article>, FeedError> {
        Ok(self.articles.clone())
    }
}
