//! Subcommand implementations

pub mod config;
pub mod doctor;
pub mod history;
pub mod run;
pub mod translate;
