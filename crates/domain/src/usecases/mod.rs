//! Application use cases / business logic

pub mod pipeline;
pub mod render;
pub mod summarize;
pub mod tagging;

pub use pipeline::{Pipeline, PipelineConfig, PipelineError};
pub use render::{RenderConfig, Renderer, escape_html};
pub use summarize::{MAX_SUMMARY_CHARS, summarize};
pub use tagging::{DEFAULT_VOCABULARY, TagConfig, Tagger};
