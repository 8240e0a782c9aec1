//! Rendering use case - transforms a dispatch into channel markup

use crate::model::Dispatch;

/// Configuration for the renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Link text used when the dispatch has no source label
    pub fallback_source_label: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fallback_source_label: "Источник".to_string(),
        }
    }
}

/// Renderer for channel messages
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render as Telegram-flavoured HTML:
    /// summary, optional tags line, blank line, then a link titled with the source.
    pub fn render_html(&self, dispatch: &Dispatch) -> String {
        let tags_line = if dispatch.tags.is_empty() {
            String::new()
        } else {
            format!("\n{}", dispatch.tags.join(" "))
        };

        let label = if dispatch.source.is_empty() {
            escape_html(&self.config.fallback_source_label)
        } else {
            escape_html(&dispatch.source)
        };

        format!(
            "{}{}\n\n<a href=\"{}\">{}</a>",
            escape_html(&dispatch.summary),
            tags_line,
            escape_html(&dispatch.url),
            label
        )
    }

    /// Render as plain text (for logs and outbox review)
    pub fn render_plain(&self, dispatch: &Dispatch) -> String {
        let mut text = dispatch.summary.clone();
        if !dispatch.tags.is_empty() {
            text.push('\n');
            text.push_str(&dispatch.tags.join(" "));
        }
        text.push_str("\n\n");
        text.push_str(&dispatch.url);
        text
    }
}

/// Escape the characters that are significant in HTML text and attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(tags: Vec<&str>, source: &str) -> Dispatch {
        Dispatch {
            summary: "Новость".to_string(),
            url: "https://example.com".to_string(),
            source: source.to_string(),
            tags: tags.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_no_tags_line_when_empty() {
        let renderer = Renderer::default();
        let text = renderer.render_html(&dispatch(vec![], ""));

        assert_eq!(text, "Новость\n\n<a href=\"https://example.com\">Источник</a>");
    }

    #[test]
    fn test_tags_between_summary_and_link() {
        let renderer = Renderer::default();
        let text = renderer.render_html(&dispatch(vec!["#политика", "#экономика"], "Telex"));

        let summary_pos = text.find("Новость").unwrap();
        let tags_pos = text.find("#политика #экономика").unwrap();
        let link_pos = text.find("href=\"https://example.com\"").unwrap();
        assert!(summary_pos < tags_pos && tags_pos < link_pos);
        assert!(text.ends_with(">Telex</a>"));
    }

    #[test]
    fn test_escapes_summary_source_and_url() {
        let renderer = Renderer::default();
        let text = renderer.render_html(&Dispatch {
            summary: "Title with <b>HTML</b> & \"quotes\"".to_string(),
            url: "https://example.com/a?b=1&c=2".to_string(),
            source: "A&B".to_string(),
            tags: vec![],
        });

        assert!(text.contains("&lt;b&gt;HTML&lt;/b&gt; &amp; &quot;quotes&quot;"));
        assert!(text.contains(">A&amp;B</a>"));
        assert!(text.contains("href=\"https://example.com/a?b=1&amp;c=2\""));
    }

    #[test]
    fn test_custom_fallback_label() {
        let renderer = Renderer::new(RenderConfig {
            fallback_source_label: "Source".to_string(),
        });
        let text = renderer.render_html(&dispatch(vec![], ""));

        assert!(text.ends_with(">Source</a>"));
    }

    #[test]
    fn test_render_plain() {
        let renderer = Renderer::default();
        let text = renderer.render_plain(&dispatch(vec!["#мир"], "HVG"));

        assert_eq!(text, "Новость\n#мир\n\nhttps://example.com");
    }
}
