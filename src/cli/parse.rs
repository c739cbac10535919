//! CLI parse: clap types for rclctx. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// rclctx CLI - client context lifecycle tooling
#[derive(Parser)]
#[command(name = "rclctx")]
#[command(about = "Initialize and shut down a middleware client context")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (replaces the global config file)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse an argument vector and show its reserved options
    Args {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Arguments to parse, given after `--`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Initialize the default context, wait for a signal or timeout, then shut down
    Run {
        /// Domain id (overrides the environment)
        #[arg(long, allow_negative_numbers = true)]
        domain_id: Option<i64>,
        /// Signal handlers to install (all, no, sigint, sigterm)
        #[arg(long)]
        signals: Option<String>,
        /// Seconds to wait before shutting down (default: wait for a signal)
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Create a node with this name once initialized
        #[arg(long)]
        node_name: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Arguments passed to init, given after `--`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Show the resolved configuration
    Config {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
}
