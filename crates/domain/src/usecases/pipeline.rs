//! Pipeline use case - one pass of fetch, filter, translate, dedup and publish

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use futures::future::join_all;
use regex::Regex;
use tokio::time::{Duration, sleep};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    model::{Article, ArticleOutcome, Dispatch, RunReport, SimilarityWindow, SkipReason},
    ports::{FeedSource, Generator, HistoryStore, Publisher, Translator},
    similarity::token_sort_ratio,
    usecases::{
        render::{RenderConfig, Renderer},
        summarize::summarize,
        tagging::{TagConfig, Tagger},
    },
};

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Language of the feed headlines
    pub source_lang: String,
    /// Display language of the primary channel
    pub target_lang: String,
    /// Near-duplicate lookup parameters; the threshold also applies within a batch
    pub similarity: SimilarityWindow,
    /// History records older than this are pruned at the start of each run
    pub retention_days: u32,
    /// Pause between consecutive publishes
    pub publish_delay: Duration,
    /// Consecutive prune failures that abort a run
    pub prune_failure_ceiling: u32,
    /// Regex patterns for headlines to ignore
    pub ignore_patterns: Vec<String>,
    /// Log what would be published without touching history or channels
    pub dry_run: bool,
    /// Tagging config
    pub tag_config: TagConfig,
    /// Rendering of dry-run previews
    pub render_config: RenderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_lang: "HU".to_string(),
            target_lang: "RU".to_string(),
            similarity: SimilarityWindow::default(),
            retention_days: 30,
            publish_delay: Duration::from_secs(3),
            prune_failure_ceiling: 10,
            ignore_patterns: vec![],
            dry_run: false,
            tag_config: TagConfig::default(),
            render_config: RenderConfig::default(),
        }
    }
}

/// Optional channel receiving the same articles in another language
struct SecondaryChannel<P: ?Sized> {
    publisher: Arc<P>,
    target_lang: String,
}

/// An article that passed deduplication, with its display title
struct Accepted {
    article: Article,
    title: String,
}

/// Pipeline orchestrator
pub struct Pipeline<F, T, G, P, H>
where
    F: FeedSource + ?Sized,
    T: Translator + ?Sized,
    G: Generator + ?Sized,
    P: Publisher + ?Sized,
    H: HistoryStore + ?Sized,
{
    feed_source: Arc<F>,
    translator: Arc<T>,
    generator: Arc<G>,
    publisher: Arc<P>,
    secondary: Option<SecondaryChannel<P>>,
    history: Arc<H>,
    config: PipelineConfig,
    tagger: Tagger,
    renderer: Renderer,
    ignore_patterns: Vec<Regex>,
    prune_failures: AtomicU32,
}

impl<F, T, G, P, H> Pipeline<F, T, G, P, H>
where
    F: FeedSource + ?Sized,
    T: Translator + ?Sized,
    G: Generator + ?Sized,
    P: Publisher + ?Sized,
    H: HistoryStore + ?Sized,
{
    pub fn new(
        feed_source: Arc<F>,
        translator: Arc<T>,
        generator: Arc<G>,
        publisher: Arc<P>,
        history: Arc<H>,
        config: PipelineConfig,
    ) -> Self {
        let ignore_patterns = compile_ignore_patterns(&config.ignore_patterns);
        let tagger = Tagger::new(config.tag_config.clone());
        let renderer = Renderer::new(config.render_config.clone());
        Self {
            feed_source,
            translator,
            generator,
            publisher,
            secondary: None,
            history,
            config,
            tagger,
            renderer,
            ignore_patterns,
            prune_failures: AtomicU32::new(0),
        }
    }

    /// Also publish every article to `publisher`, translated into `target_lang`
    pub fn with_secondary(mut self, publisher: Arc<P>, target_lang: impl Into<String>) -> Self {
        self.secondary = Some(SecondaryChannel {
            publisher,
            target_lang: target_lang.into(),
        });
        self
    }

    /// Consecutive prune failures observed so far
    pub fn prune_failures(&self) -> u32 {
        self.prune_failures.load(Ordering::Relaxed)
    }

    /// Run a single pass over all feeds
    pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.run_phases(run_id).instrument(span).await
    }

    async fn run_phases(&self, run_id: Uuid) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::new(run_id);

        self.maintain().await?;

        let articles = self.fetch(&mut report).await?;
        let fresh = self.filter_seen(articles, &mut report).await;
        let accepted = self.translate_and_dedup(fresh, &mut report).await;
        self.publish_all(accepted, &mut report).await;

        tracing::info!(
            fetched = report.fetched,
            ignored = report.ignored,
            repeated_urls = report.repeated_urls,
            already_seen = report.already_seen,
            published = report.published(),
            skipped = report.skipped(),
            failed = report.failed(),
            dry_run = self.config.dry_run,
            "Run complete"
        );

        Ok(report)
    }

    /// Phase 0: prune old history, tolerating failures up to the ceiling
    async fn maintain(&self) -> Result<(), PipelineError> {
        if self.config.dry_run {
            tracing::debug!("[DRY RUN] Skipping history prune");
            return Ok(());
        }

        match self.history.prune(self.config.retention_days).await {
            Ok(removed) => {
                self.prune_failures.store(0, Ordering::Relaxed);
                if removed > 0 {
                    tracing::info!(
                        removed = removed,
                        keep_days = self.config.retention_days,
                        "Pruned history"
                    );
                }
                Ok(())
            }
            Err(e) => {
                let failures = self.prune_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= self.config.prune_failure_ceiling {
                    tracing::error!(
                        failures = failures,
                        error = %e,
                        "History prune keeps failing, aborting run"
                    );
                    return Err(PipelineError::Maintenance {
                        failures,
                        error: e.to_string(),
                    });
                }
                tracing::warn!(
                    failures = failures,
                    ceiling = self.config.prune_failure_ceiling,
                    error = %e,
                    "History prune failed, continuing"
                );
                Ok(())
            }
        }
    }

    /// Phase 1: fetch all feeds, dropping ignored headlines and repeated URLs
    async fn fetch(&self, report: &mut RunReport) -> Result<Vec<Article>, PipelineError> {
        let articles = self.feed_source.fetch_all().await.map_err(|e| {
            tracing::error!(error = %e, "Feed fetch failed, aborting run");
            PipelineError::Fetch(e.to_string())
        })?;

        report.fetched = articles.len();
        tracing::info!(count = articles.len(), "Fetched articles");

        let kept: Vec<Article> = articles
            .into_iter()
            .filter(|article| {
                let ignored = self
                    .ignore_patterns
                    .iter()
                    .any(|pattern| pattern.is_match(&article.title));
                if ignored {
                    tracing::debug!(url = %article.url, "Ignored by pattern");
                }
                !ignored
            })
            .collect();

        report.ignored = report.fetched - kept.len();

        // Feeds overlap, e.g. a section feed repeating the main one
        let mut urls = HashSet::new();
        let unique: Vec<Article> = kept
            .into_iter()
            .filter(|article| {
                let first = urls.insert(article.url.clone());
                if !first {
                    tracing::debug!(
                        url = %article.url,
                        source = %article.source,
                        "Dropped repeated URL"
                    );
                }
                first
            })
            .collect();

        report.repeated_urls = report.fetched - report.ignored - unique.len();
        Ok(unique)
    }

    /// Phase 2: drop URLs already in history, checking all of them concurrently
    async fn filter_seen(&self, articles: Vec<Article>, report: &mut RunReport) -> Vec<Article> {
        let checks = join_all(
            articles
                .iter()
                .map(|article| self.history.is_seen(&article.url)),
        )
        .await;

        let mut fresh = Vec::new();
        for (article, check) in articles.into_iter().zip(checks) {
            match check {
                Ok(true) => report.already_seen += 1,
                Ok(false) => fresh.push(article),
                Err(e) => {
                    tracing::warn!(
                        url = %article.url,
                        error = %e,
                        "Seen check failed, treating as unseen"
                    );
                    fresh.push(article);
                }
            }
        }

        tracing::info!(count = fresh.len(), "Unseen articles");
        fresh
    }

    /// Phase 3: translate each headline and drop cross-run and same-batch duplicates
    async fn translate_and_dedup(
        &self,
        articles: Vec<Article>,
        report: &mut RunReport,
    ) -> Vec<Accepted> {
        let mut batch_titles: Vec<String> = Vec::new();
        let mut accepted = Vec::new();

        for article in articles {
            let title = match self
                .translator
                .translate(
                    &article.title,
                    &self.config.source_lang,
                    &self.config.target_lang,
                )
                .await
            {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => {
                    tracing::error!(url = %article.url, "Translation returned empty text");
                    report.outcomes.push((
                        article.url,
                        ArticleOutcome::Failed {
                            error: "Translation returned empty text".to_string(),
                        },
                    ));
                    continue;
                }
                Err(e) => {
                    tracing::error!(url = %article.url, error = %e, "Translation failed");
                    report.outcomes.push((
                        article.url,
                        ArticleOutcome::Failed {
                            error: format!("Translation failed: {}", e),
                        },
                    ));
                    continue;
                }
            };

            let history_match = match self
                .history
                .find_similar(&title, &self.config.similarity)
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(
                        url = %article.url,
                        error = %e,
                        "Similar-title lookup failed, treating as unique"
                    );
                    None
                }
            };

            if let Some(matched) = history_match {
                self.mark_duplicate(&article, &title).await;
                tracing::info!(url = %article.url, similar_to = %matched, "Skipped duplicate");
                report.outcomes.push((
                    article.url,
                    ArticleOutcome::Skipped {
                        reason: SkipReason::CrossRunDuplicate { matched },
                    },
                ));
                continue;
            }

            if let Some(matched) =
                find_batch_duplicate(&batch_titles, &title, self.config.similarity.threshold)
            {
                let matched = matched.to_string();
                self.mark_duplicate(&article, &title).await;
                tracing::info!(
                    url = %article.url,
                    similar_to = %matched,
                    "Skipped batch duplicate"
                );
                report.outcomes.push((
                    article.url,
                    ArticleOutcome::Skipped {
                        reason: SkipReason::BatchDuplicate { matched },
                    },
                ));
                continue;
            }

            batch_titles.push(title.clone());
            accepted.push(Accepted { article, title });
        }

        accepted
    }

    /// Best-effort seen-mark for a skipped duplicate
    async fn mark_duplicate(&self, article: &Article, title: &str) {
        if self.config.dry_run {
            return;
        }
        if let Err(e) = self.history.mark_seen(&article.url, title).await {
            tracing::warn!(url = %article.url, error = %e, "Failed to mark duplicate as seen");
        }
    }

    /// Phase 4: publish accepted articles one at a time
    async fn publish_all(&self, accepted: Vec<Accepted>, report: &mut RunReport) {
        let mut posted_any = false;
        for item in accepted {
            let outcome = self.publish_one(&item, &mut posted_any).await;
            report.outcomes.push((item.article.url, outcome));
        }
    }

    /// Pause before a post when an earlier item in this run reached the publisher
    async fn pace(&self, posted_any: &mut bool) {
        if *posted_any && !self.config.publish_delay.is_zero() {
            sleep(self.config.publish_delay).await;
        }
        *posted_any = true;
    }

    async fn publish_one(&self, item: &Accepted, posted_any: &mut bool) -> ArticleOutcome {
        let article = &item.article;

        if self.config.dry_run {
            let tags = self.tagger.tags(article, self.generator.as_ref()).await;
            let preview = self.renderer.render_plain(&Dispatch {
                summary: summarize(&item.title),
                url: article.url.clone(),
                source: article.source.clone(),
                tags: tags.clone(),
            });
            tracing::info!(
                url = %article.url,
                preview = %preview,
                "[DRY RUN] Would publish"
            );
            return ArticleOutcome::Previewed {
                title: item.title.clone(),
                tags,
            };
        }

        if !self.publisher.is_enabled() {
            tracing::error!(
                url = %article.url,
                channel = %self.publisher.channel(),
                "Publisher disabled, not publishing"
            );
            return ArticleOutcome::Failed {
                error: "Publisher disabled".to_string(),
            };
        }

        // Marked before posting: a crash or failed post must never lead to a repost
        if let Err(e) = self.history.mark_seen(&article.url, &item.title).await {
            tracing::error!(
                url = %article.url,
                error = %e,
                "Failed to mark seen, not publishing"
            );
            return ArticleOutcome::Failed {
                error: format!("Mark seen failed: {}", e),
            };
        }

        let tags = self.tagger.tags(article, self.generator.as_ref()).await;
        let dispatch = Dispatch {
            summary: summarize(&item.title),
            url: article.url.clone(),
            source: article.source.clone(),
            tags: tags.clone(),
        };

        self.pace(posted_any).await;
        if let Err(e) = self.publisher.post(&dispatch).await {
            tracing::error!(
                url = %article.url,
                channel = %self.publisher.channel(),
                error = %e,
                "Failed to publish"
            );
            return ArticleOutcome::Failed {
                error: format!("Publish failed: {}", e),
            };
        }

        tracing::info!(url = %article.url, channel = %self.publisher.channel(), "Published");

        let secondary = self.publish_secondary(article).await;

        ArticleOutcome::Published {
            title: item.title.clone(),
            tags,
            secondary,
        }
    }

    /// Publish to the secondary channel; returns whether it was delivered
    async fn publish_secondary(&self, article: &Article) -> bool {
        let Some(channel) = &self.secondary else {
            return false;
        };
        if !channel.publisher.is_enabled() {
            return false;
        }

        let title = match self
            .translator
            .translate(&article.title, &self.config.source_lang, &channel.target_lang)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(url = %article.url, "Secondary translation returned empty text");
                return false;
            }
            Err(e) => {
                tracing::warn!(url = %article.url, error = %e, "Secondary translation failed");
                return false;
            }
        };

        let dispatch = Dispatch {
            summary: summarize(&title),
            url: article.url.clone(),
            source: article.source.clone(),
            tags: vec![],
        };

        match channel.publisher.post(&dispatch).await {
            Ok(()) => {
                tracing::info!(
                    url = %article.url,
                    channel = %channel.publisher.channel(),
                    "Published"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    url = %article.url,
                    channel = %channel.publisher.channel(),
                    error = %e,
                    "Failed to publish to secondary channel"
                );
                false
            }
        }
    }
}

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("History maintenance failed {failures} times in a row: {error}")]
    Maintenance { failures: u32, error: String },
    #[error("Feed fetch failed: {0}")]
    Fetch(String),
}

fn find_batch_duplicate<'a>(accepted: &'a [String], title: &str, threshold: f64) -> Option<&'a str> {
    accepted
        .iter()
        .find(|existing| token_sort_ratio(title, existing) >= threshold)
        .map(String::as_str)
}

fn compile_ignore_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(error) => {
                tracing::warn!(pattern = %pattern, error = %error, "Invalid ignore pattern");
                None
            }
        })
        .collect()
}
