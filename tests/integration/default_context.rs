//! Integration tests for the process default context

use super::test_utils::{global_lock, reset_default_context};
use rclctx::config::RuntimeConfig;
use rclctx::{
    get_current_signal_handlers_options, get_default_context, init, ok, shutdown, try_shutdown,
    ContextError, InitOptions, LifecycleState, SignalHandlerOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_default_context_is_stable_until_shutdown() {
    let _lock = global_lock();
    reset_default_context();

    let first = get_default_context();
    let again = get_default_context();
    assert_eq!(first.id(), again.id());
    assert!(first.is_default());

    init(None, InitOptions::new().signal_handler_options(SignalHandlerOptions::No)).unwrap();
    assert!(ok(None));
    assert_eq!(get_default_context().id(), first.id());

    shutdown(None).unwrap();
    assert!(!ok(None));
    assert_eq!(first.state(), LifecycleState::Shutdown);

    let replacement = get_default_context();
    assert_ne!(replacement.id(), first.id());
    assert_eq!(replacement.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_shut_down_default_handle_is_not_reusable() {
    let _lock = global_lock();
    reset_default_context();

    let default = init(None, InitOptions::new()).unwrap();
    default.shutdown().unwrap();

    assert!(matches!(
        default.init(InitOptions::new()),
        Err(ContextError::AlreadyInitialized)
    ));
    // The global entry point moves on to a fresh default.
    let fresh = init(None, InitOptions::new()).unwrap();
    assert_ne!(fresh.id(), default.id());
    shutdown(None).unwrap();
}

#[test]
fn test_global_shutdown_without_init() {
    let _lock = global_lock();
    reset_default_context();

    assert!(matches!(shutdown(None), Err(ContextError::NotInitialized)));
    assert!(try_shutdown(None).is_ok());
}

#[test]
fn test_default_context_signal_handlers_from_config() {
    let _lock = global_lock();
    reset_default_context();

    let mut config = RuntimeConfig::default();
    config.signals.default_handlers = Some(SignalHandlerOptions::SigInt);

    init(None, InitOptions::from_config(&config)).unwrap();
    assert_eq!(
        get_current_signal_handlers_options(),
        SignalHandlerOptions::SigInt
    );
    shutdown(None).unwrap();
    assert_eq!(
        get_current_signal_handlers_options(),
        SignalHandlerOptions::No
    );
}

#[test]
fn test_on_shutdown_callbacks_run_once() {
    let _lock = global_lock();
    reset_default_context();

    let calls = Arc::new(AtomicUsize::new(0));
    let context = init(None, InitOptions::new()).unwrap();
    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        context.on_shutdown(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    shutdown(None).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(shutdown(Some(&context)).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Registered after shutdown: runs right away.
    let late = Arc::clone(&calls);
    context.on_shutdown(move || {
        late.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
