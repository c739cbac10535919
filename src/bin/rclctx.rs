//! rclctx CLI Binary
//!
//! Command-line interface for inspecting arguments and running a context lifecycle.

use clap::Parser;
use rclctx::cli::{Cli, RunContext};
use rclctx::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let context = match RunContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}", rclctx::cli::map_error(&e));
            process::exit(1);
        }
    };

    // Initialize logging early
    let logging_config = build_logging_config(&cli, &context.config().logging);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("rclctx CLI starting");

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", rclctx::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args on top of the loaded config.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, base: &LoggingConfig) -> LoggingConfig {
    let mut config = base.clone();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    config
}
