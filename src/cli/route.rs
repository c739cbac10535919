//! CLI route: single route table and run context. Dispatches to the library and presentation.

use crate::arguments;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_arguments_json, format_arguments_text, format_config, format_run_summary_json,
    format_run_summary_text, RunSummary,
};
use crate::config::{ConfigLoader, RuntimeConfig};
use crate::context::{self, InitOptions};
use crate::error::ContextError;
use crate::node;
use crate::signals::SignalHandlerOptions;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const RUN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Signal that reached `rclctx run` itself (0 if none).
static RUN_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn record_run_signal(signum: libc::c_int) {
    RUN_SIGNAL.store(signum, Ordering::SeqCst);
}

/// Handlers in place before init, so a signal forwarded after the contexts
/// shut down is recorded instead of terminating the process.
fn install_run_handlers() -> Result<(), ContextError> {
    let action = SigAction::new(
        SigHandler::Handler(record_run_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: record_run_signal only stores an atomic.
        unsafe { signal::sigaction(sig, &action) }.map_err(|source| {
            ContextError::SignalInstall {
                signal: sig.to_string(),
                source,
            }
        })?;
    }
    Ok(())
}

fn run_signal() -> Option<Signal> {
    match RUN_SIGNAL.load(Ordering::SeqCst) {
        0 => None,
        signum => Signal::try_from(signum).ok(),
    }
}

/// Runtime context for CLI execution: the resolved configuration.
pub struct RunContext {
    config: RuntimeConfig,
}

impl RunContext {
    /// Load configuration from `config_path`, or the standard sources when `None`.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ContextError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ContextError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        Ok(Self { config })
    }

    pub fn from_config(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ContextError> {
        match command {
            Commands::Args { format, args } => self.handle_args(format, args),
            Commands::Run {
                domain_id,
                signals,
                timeout_secs,
                node_name,
                format,
                args,
            } => self.handle_run(
                *domain_id,
                signals.as_deref(),
                *timeout_secs,
                node_name.as_deref(),
                format,
                args,
            ),
            Commands::Config { format } => format_config(&self.config, format),
        }
    }

    fn handle_args(&self, format: &str, args: &[OsString]) -> Result<String, ContextError> {
        let decoded = arguments::decode_args(args.iter().cloned())?;
        let parsed = arguments::parse_arguments(&decoded)?;
        match format {
            "json" => format_arguments_json(&parsed),
            _ => Ok(format_arguments_text(&parsed)),
        }
    }

    fn handle_run(
        &self,
        domain_id: Option<i64>,
        signal_option: Option<&str>,
        timeout_secs: Option<u64>,
        node_name: Option<&str>,
        format: &str,
        args: &[OsString],
    ) -> Result<String, ContextError> {
        let mut options = InitOptions::from_config(&self.config).args(args.iter().cloned());
        if let Some(id) = domain_id {
            options = options.domain_id(id);
        }
        if let Some(option) = signal_option {
            let option: SignalHandlerOptions = option.parse().map_err(ContextError::ConfigError)?;
            options = options.signal_handler_options(option);
        }

        install_run_handlers()?;
        let ctx = context::init(None, options)?;
        let status = ctx.status();
        let non_ros_args = ctx.arguments()?.non_ros_args;

        let node = match node_name {
            Some(name) => match node::create_node(name, Some(&ctx)) {
                Ok(node) => Some(node.fully_qualified_name()),
                Err(e) => {
                    if let Err(shutdown_err) = context::try_shutdown(None) {
                        warn!(error = %shutdown_err, "Shutdown after failed node creation failed");
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        let deadline =
            timeout_secs.and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
        info!(context = %ctx.id(), ?timeout_secs, "Waiting for shutdown signal");
        loop {
            if ctx.wait_for_shutdown(RUN_POLL_INTERVAL) || run_signal().is_some() {
                break;
            }
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                break;
            }
        }
        let signal = run_signal().map(|sig| sig.to_string());
        context::try_shutdown(None)?;

        let summary = RunSummary {
            context: status,
            node,
            signal,
            non_ros_args,
        };
        match format {
            "json" => format_run_summary_json(&summary),
            _ => Ok(format_run_summary_text(&summary)),
        }
    }
}
