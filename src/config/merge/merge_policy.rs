//! Merge rules: defaults, override order, conflict handling.

use crate::domain::{DEFAULT_DOMAIN_ID, DEFAULT_DOMAIN_ID_ENV_VAR};
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("domain.env_var", DEFAULT_DOMAIN_ID_ENV_VAR)?
        .set_default("domain.default_domain_id", DEFAULT_DOMAIN_ID)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
