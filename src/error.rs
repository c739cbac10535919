//! Error types for the client context lifecycle.

use thiserror::Error;

/// Errors surfaced by context, argument, domain and node operations.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Context is already initialized")]
    AlreadyInitialized,

    #[error("Context is not initialized")]
    NotInitialized,

    #[error("Found unknown ROS arguments: {}", python_list(.0))]
    UnknownRosArgs(Vec<String>),

    #[error("Invalid ROS arguments: {0}")]
    InvalidRosArgs(String),

    /// Argument bytes that are not valid UTF-8. The decode failure is passed through as is.
    #[error(transparent)]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Invalid domain id {0}: domain id must be non-negative")]
    InvalidDomainId(i64),

    #[error("Invalid domain id in environment variable {var}: {value:?}")]
    InvalidDomainIdEnv { var: String, value: String },

    #[error("Failed to install handler for {signal}: {source}")]
    SignalInstall {
        signal: String,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("Failed to start signal watcher: {0}")]
    SignalWatcher(#[source] std::io::Error),

    #[error("Invalid node name {name:?}: {reason}")]
    InvalidNodeName { name: String, reason: String },

    #[error("Invalid namespace {namespace:?}: {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::ConfigError(err.to_string())
    }
}

/// Render a token list the way the middleware tooling prints it: `['a', 'b']`.
fn python_list(tokens: &[String]) -> String {
    let quoted: Vec<String> = tokens
        .iter()
        .map(|t| format!("'{}'", t.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(", "))
}
