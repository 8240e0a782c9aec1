//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// news-relay: relays Hungarian news feeds into a translated Telegram channel
#[derive(Parser, Debug)]
#[command(name = "news-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll feeds and publish new articles
    Run(RunArgs),

    /// One-shot translation and tagging of a headline
    Translate(TranslateArgs),

    /// Inspect and maintain the seen-URL history
    History(HistoryArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Log what would be published without touching history or Telegram
    #[arg(long)]
    pub dry_run: bool,

    /// Process one poll cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Write dispatches to this JSONL file instead of posting to Telegram
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Headline to translate
    #[arg(long)]
    pub text: String,

    /// Source language code (defaults to the configured one)
    #[arg(long)]
    pub from: Option<String>,

    /// Target language code (defaults to the configured one)
    #[arg(long)]
    pub to: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Show record counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show whether a URL has been seen
    Check {
        #[arg(long)]
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete records older than the retention window
    Prune {
        /// Override the configured retention in days
        #[arg(long)]
        keep_days: Option<u32>,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
