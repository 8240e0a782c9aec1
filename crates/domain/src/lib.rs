//! news-relay domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `similarity`: Fuzzy title matching used for deduplication
//! - `usecases`: The run-once pipeline, tagging, summarizing and rendering

pub mod model;
pub mod ports;
pub mod similarity;
pub mod usecases;

pub use model::*;
pub use ports::*;
pub use similarity::token_sort_ratio;
