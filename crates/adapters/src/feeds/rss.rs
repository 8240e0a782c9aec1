//! RSS/Atom feed source over HTTP

use async_trait::async_trait;
use feed_rs::parser;
use futures::future::join_all;
use news_relay_domain::{Article, FeedError, FeedSource, FeedSpec};
use reqwest::Client;
use std::time::Duration;

/// Fetches and parses every configured feed concurrently
pub struct RssFeedSource {
    client: Client,
    sources: Vec<FeedSpec>,
}

impl RssFeedSource {
    pub fn new(
        sources: Vec<FeedSpec>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| FeedError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, sources })
    }

    async fn fetch_one(&self, source: &FeedSpec) -> Result<Vec<Article>, FeedError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                source.url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        parse_articles(&body, &source.name)
    }
}

/// Parse a feed document into articles attributed to `source_name`
pub fn parse_articles(body: &[u8], source_name: &str) -> Result<Vec<Article>, FeedError> {
    let feed = parser::parse(body).map_err(|e| FeedError::Parse(e.to_string()))?;

    let articles = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry
                .title
                .as_ref()
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default();
            let url = select_link(&entry);
            if title.is_empty() || url.is_empty() {
                return None;
            }

            let raw_categories = entry
                .categories
                .into_iter()
                .map(|c| c.label.unwrap_or(c.term))
                .filter(|c| !c.trim().is_empty())
                .collect();

            Some(Article {
                title,
                url,
                source: source_name.to_string(),
                raw_categories,
            })
        })
        .collect();

    Ok(articles)
}

fn select_link(entry: &feed_rs::model::Entry) -> String {
    let alternate = entry.links.iter().find(|link| {
        let rel = link.rel.as_deref().unwrap_or("");
        !link.href.trim().is_empty() && (rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
    });

    alternate
        .or_else(|| entry.links.iter().find(|l| !l.href.trim().is_empty()))
        .map(|link| link.href.trim().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_all(&self) -> Result<Vec<Article>, FeedError> {
        let results = join_all(self.sources.iter().map(|source| self.fetch_one(source))).await;

        let mut articles = Vec::new();
        let mut failures = 0;
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(found) => {
                    tracing::debug!(source = %source.name, count = found.len(), "Fetched feed");
                    articles.extend(found);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(source = %source.name, url = %source.url, error = %e, "Feed fetch failed");
                }
            }
        }

        if failures > 0 && failures == self.sources.len() {
            return Err(FeedError::AllFailed(failures));
        }

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TELEX_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Telex</title>
    <link>https://telex.hu</link>
    <description>Hírek</description>
    <item>
      <title>Elfogadták a költségvetést</title>
      <link>https://telex.hu/belfold/2026/03/01/koltsegvetes</link>
      <category>Belföld</category>
      <category>Gazdaság</category>
    </item>
    <item>
      <title>Cikk link nélkül</title>
    </item>
    <item>
      <link>https://telex.hu/cim-nelkul</link>
    </item>
  </channel>
</rss>"#;

    const HVG_ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>HVG</title>
  <id>urn:hvg</id>
  <updated>2026-03-01T10:00:00Z</updated>
  <entry>
    <title>Esik a forint</title>
    <id>urn:hvg:1</id>
    <updated>2026-03-01T10:00:00Z</updated>
    <link rel="alternate" href="https://hvg.hu/gazdasag/forint"/>
  </entry>
</feed>"#;

    fn feed_spec(name: &str, url: String) -> FeedSpec {
        FeedSpec {
            name: name.to_string(),
            url,
        }
    }

    fn source(sources: Vec<FeedSpec>) -> RssFeedSource {
        RssFeedSource::new(sources, 5, "news-relay-test").unwrap()
    }

    #[test]
    fn test_parse_skips_entries_without_link_or_title() {
        let articles = parse_articles(TELEX_RSS.as_bytes(), "Telex").unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Elfogadták a költségvetést");
        assert_eq!(
            articles[0].url,
            "https://telex.hu/belfold/2026/03/01/koltsegvetes"
        );
        assert_eq!(articles[0].source, "Telex");
        assert_eq!(articles[0].raw_categories, vec!["Belföld", "Gazdaság"]);
    }

    #[test]
    fn test_parse_atom() {
        let articles = parse_articles(HVG_ATOM.as_bytes(), "HVG").unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url, "https://hvg.hu/gazdasag/forint");
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let result = parse_articles(b"<html>not a feed</html>", "Bad");
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_all_merges_feeds_and_tolerates_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/telex"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TELEX_RSS))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hvg"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HVG_ATOM))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/444"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let feeds = source(vec![
            feed_spec("Telex", format!("{}/telex", server.uri())),
            feed_spec("444", format!("{}/444", server.uri())),
            feed_spec("HVG", format!("{}/hvg", server.uri())),
        ]);

        let articles = feeds.fetch_all().await.unwrap();

        let sources: Vec<&str> = articles.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, vec!["Telex", "HVG"]);
    }

    #[tokio::test]
    async fn test_fetch_all_fails_when_every_feed_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let feeds = source(vec![
            feed_spec("Telex", format!("{}/telex", server.uri())),
            feed_spec("HVG", format!("{}/hvg", server.uri())),
        ]);

        let result = feeds.fetch_all().await;
        assert!(matches!(result, Err(FeedError::AllFailed(2))));
    }

    #[tokio::test]
    async fn test_no_sources_yields_nothing() {
        let articles = source(vec![]).fetch_all().await.unwrap();
        assert!(articles.is_empty());
    }
}
