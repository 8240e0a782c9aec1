//! Tagging use case - derives topical hashtags from a closed vocabulary

use std::collections::BTreeSet;

use crate::{model::Article, ports::Generator};

/// Topic words accepted from the model by default
pub const DEFAULT_VOCABULARY: [&str; 27] = [
    // Politics & society
    "политика",
    "выборы",
    "общество",
    "право",
    "безопасность",
    // Economy & business
    "экономика",
    "бизнес",
    "финансы",
    "рынки",
    "недвижимость",
    // World
    "мир",
    "европа",
    "сша",
    "украина",
    "ближнийвосток",
    // Hungary
    "венгрия",
    "будапешт",
    "правительство",
    // Life & culture
    "культура",
    "спорт",
    "здоровье",
    "технологии",
    "наука",
    "образование",
    "туризм",
    // Media
    "расследование",
    "аналитика",
];

/// Configuration for the tagger
#[derive(Debug, Clone)]
pub struct TagConfig {
    /// Allowed tag words; anything else the model returns is dropped
    pub vocabulary: Vec<String>,
    /// Maximum tags per article
    pub max_tags: usize,
    /// Prefix added to each tag
    pub marker: char,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            vocabulary: DEFAULT_VOCABULARY.iter().map(|w| w.to_string()).collect(),
            max_tags: 3,
            marker: '#',
        }
    }
}

/// Classifies articles into a fixed set of topics
#[derive(Debug, Clone)]
pub struct Tagger {
    config: TagConfig,
    vocabulary: BTreeSet<String>,
}

impl Tagger {
    pub fn new(config: TagConfig) -> Self {
        let vocabulary = config
            .vocabulary
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { config, vocabulary }
    }

    /// Tags for `article`, or an empty list if the backend fails.
    pub async fn tags<G>(&self, article: &Article, generator: &G) -> Vec<String>
    where
        G: Generator + ?Sized,
    {
        if self.config.max_tags == 0 || self.vocabulary.is_empty() {
            return vec![];
        }

        let prompt = self.build_prompt(article);
        match generator.generate(&prompt).await {
            Ok(response) => {
                let tags = self.parse_tags(&response);
                tracing::debug!(url = %article.url, tags = ?tags, "Derived tags");
                tags
            }
            Err(e) => {
                tracing::warn!(url = %article.url, error = %e, "Failed to get tags");
                vec![]
            }
        }
    }

    /// Build the classification prompt for a headline
    pub fn build_prompt(&self, article: &Article) -> String {
        let allowed = self
            .vocabulary
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let mut prompt = format!(
            "Classify this news headline into 1-{} tags. \
             Choose ONLY from this exact list: {}. \
             Return only tag names from the list, space-separated, nothing else. ",
            self.config.max_tags, allowed
        );
        if !article.raw_categories.is_empty() {
            prompt.push_str(&format!(
                "Publisher categories: {}. ",
                article.raw_categories.join(", ")
            ));
        }
        prompt.push_str(&format!("Headline: {}", article.title));
        prompt
    }

    /// Keep only in-vocabulary words from a model response
    pub fn parse_tags(&self, response: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for word in response.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c| matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '#'));
            if !self.vocabulary.contains(word) {
                continue;
            }
            let tag = format!("{}{}", self.config.marker, word);
            if !tags.contains(&tag) {
                tags.push(tag);
            }
            if tags.len() == self.config.max_tags {
                break;
            }
        }
        tags
    }
}

impl Default for Tagger {
    fn default() -> Self {
        Self::new(TagConfig::default())
    }
}
