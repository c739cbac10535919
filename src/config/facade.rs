//! Config loading facade: one entry point over defaults, files and environment.

use super::merge::merge_policy;
use super::sources::{env_vars, global_file};
use super::RuntimeConfig;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`RuntimeConfig`] with the standard precedence.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global config file, then `RCLCTX_*` environment variables.
    pub fn load() -> Result<RuntimeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = env_vars::add_to_builder(builder);
        let config: RuntimeConfig = builder.build()?.try_deserialize()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Defaults, then `path` (required), then `RCLCTX_*` environment variables.
    /// The global config file is not consulted.
    pub fn load_from_file(path: &Path) -> Result<RuntimeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = env_vars::add_to_builder(builder);
        let config: RuntimeConfig = builder.build()?.try_deserialize()?;
        debug!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Location of the global config file, if a home directory is known.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
