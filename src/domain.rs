//! Domain id resolution
//!
//! An explicit id given to `init` always wins. Without one, the id comes from an
//! environment variable read through an [`EnvSource`], falling back to the
//! configured default when the variable is unset or empty.

use crate::error::ContextError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variable consulted when no domain id is given.
pub const DEFAULT_DOMAIN_ID_ENV_VAR: &str = "ROS_DOMAIN_ID";

/// Domain used when neither an explicit id nor the environment provides one.
pub const DEFAULT_DOMAIN_ID: u64 = 0;

/// Read access to environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Where an implicit domain id comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSettings {
    #[serde(default = "default_env_var")]
    pub env_var: String,

    #[serde(default = "default_domain_id")]
    pub default_domain_id: u64,
}

fn default_env_var() -> String {
    DEFAULT_DOMAIN_ID_ENV_VAR.to_string()
}

fn default_domain_id() -> u64 {
    DEFAULT_DOMAIN_ID
}

impl Default for DomainSettings {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            default_domain_id: default_domain_id(),
        }
    }
}

/// Resolve the domain id bound at `init`.
pub fn resolve_domain_id(
    explicit: Option<i64>,
    settings: &DomainSettings,
    env: &dyn EnvSource,
) -> Result<u64, ContextError> {
    if let Some(id) = explicit {
        return u64::try_from(id).map_err(|_| ContextError::InvalidDomainId(id));
    }

    match env.var(&settings.env_var) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ContextError::InvalidDomainIdEnv {
                    var: settings.env_var.clone(),
                    value,
                })
        }
        _ => Ok(settings.default_domain_id),
    }
}
