//! news-relay adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `history`: SQLite and in-memory history stores
//! - `feeds`: RSS/Atom feed source
//! - `llm`: Ollama, DeepL and stub language backends
//! - `telegram`: Telegram channel publisher
//! - `outbox`: JSONL review publisher

mod history_memory;
mod history_sqlite;

pub mod feeds;
pub mod llm;
pub mod outbox;
pub mod telegram;

/// Re-exports for history adapters
pub mod history {
    pub use crate::history_memory::InMemoryHistoryStore;
    pub use crate::history_sqlite::SqliteHistoryStore;
}
