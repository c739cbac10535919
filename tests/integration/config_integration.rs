//! Integration tests for configuration loading and config-seeded init

use super::test_utils::{global_lock, EnvGuard};
use rclctx::config::{ConfigLoader, RuntimeConfig};
use rclctx::{init, shutdown, Context, ContextError, InitOptions, SignalHandlerOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_env_overrides_file() {
    let _lock = global_lock();
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[domain]
default_domain_id = 3
"#,
    );

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config.domain.default_domain_id, 3);

    let _env = EnvGuard::set(&[("RCLCTX_DOMAIN__DEFAULT_DOMAIN_ID", "9")]);
    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert_eq!(config.domain.default_domain_id, 9);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");
    assert!(ConfigLoader::load_from_file(&missing).is_err());
}

#[test]
fn test_config_seeds_domain_resolution() {
    let _lock = global_lock();
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[domain]
env_var = "LAB_DOMAIN_ID"
default_domain_id = 12
"#,
    );
    let config = ConfigLoader::load_from_file(&path).unwrap();

    let mut env = HashMap::new();
    env.insert("ROS_DOMAIN_ID".to_string(), "99".to_string());
    let context = Context::new();
    init(
        Some(&context),
        InitOptions::from_config(&config).env_source(Arc::new(env.clone())),
    )
    .unwrap();
    // ROS_DOMAIN_ID is not the configured variable.
    assert_eq!(context.get_domain_id().unwrap(), 12);
    shutdown(Some(&context)).unwrap();

    env.insert("LAB_DOMAIN_ID".to_string(), "31".to_string());
    let context = Context::new();
    init(
        Some(&context),
        InitOptions::from_config(&config).env_source(Arc::new(env)),
    )
    .unwrap();
    assert_eq!(context.get_domain_id().unwrap(), 31);
    shutdown(Some(&context)).unwrap();
}

#[test]
fn test_invalid_env_domain_id_fails_init() {
    let _lock = global_lock();
    let mut env = HashMap::new();
    env.insert("ROS_DOMAIN_ID".to_string(), "seven".to_string());

    let context = Context::new();
    let err = init(
        Some(&context),
        InitOptions::new().env_source(Arc::new(env)),
    )
    .unwrap_err();
    assert!(matches!(err, ContextError::InvalidDomainIdEnv { .. }));
    assert!(!context.ok());
}

#[test]
fn test_explicit_options_override_config() {
    let _lock = global_lock();
    let mut config = RuntimeConfig::default();
    config.domain.domain_id = Some(4);
    config.signals.default_handlers = Some(SignalHandlerOptions::All);

    let context = Context::new();
    init(
        Some(&context),
        InitOptions::from_config(&config)
            .domain_id(8)
            .signal_handler_options(SignalHandlerOptions::No),
    )
    .unwrap();
    let status = context.status();
    assert_eq!(status.domain_id, Some(8));
    assert_eq!(status.signal_handler_options, Some(SignalHandlerOptions::No));
    shutdown(Some(&context)).unwrap();
}
