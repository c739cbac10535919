//! Configuration System
//!
//! Layered runtime configuration for context initialization: built-in defaults,
//! a global TOML file, and `RCLCTX_` environment variables. The result seeds
//! [`crate::context::InitOptions`] and the logging setup of the binary.

use crate::domain::{DEFAULT_DOMAIN_ID, DEFAULT_DOMAIN_ID_ENV_VAR};
use crate::logging::LoggingConfig;
use crate::signals::SignalHandlerOptions;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Domain id resolution
    #[serde(default)]
    pub domain: DomainConfig,

    /// Signal handler defaults
    #[serde(default)]
    pub signals: SignalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Domain id settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Environment variable read when no domain id is given
    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// Domain used when the environment variable is unset
    #[serde(default = "default_domain_id")]
    pub default_domain_id: u64,

    /// Explicit domain id applied to every `init` seeded from this config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<i64>,
}

fn default_env_var() -> String {
    DEFAULT_DOMAIN_ID_ENV_VAR.to_string()
}

fn default_domain_id() -> u64 {
    DEFAULT_DOMAIN_ID
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            default_domain_id: default_domain_id(),
            domain_id: None,
        }
    }
}

/// Signal handler settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Handlers installed when `init` does not ask for specific ones.
    /// Unset means `all` for the default context and `no` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_handlers: Option<SignalHandlerOptions>,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Domain(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Domain(msg) => write!(f, "Domain: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DomainConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.env_var.trim().is_empty() {
            return Err("Environment variable name cannot be empty".to_string());
        }
        if let Some(id) = self.domain_id {
            if id < 0 {
                return Err(format!("Domain id must be non-negative, got {}", id));
            }
        }
        Ok(())
    }
}

impl RuntimeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.domain.validate() {
            errors.push(ValidationError::Domain(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
