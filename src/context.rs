//! Client context lifecycle
//!
//! A [`Context`] moves `Uninitialized -> Initialized -> Shutdown` and never
//! back. `init` binds the domain id, parses the reserved argument blocks and,
//! when requested, takes ownership of the process-wide signal handlers.
//! `shutdown` releases them.
//!
//! The process keeps one default context in a single slot. The parameterless
//! forms of [`init`], [`shutdown`], [`try_shutdown`] and [`ok`] act on it. After
//! the default context is shut down the slot is emptied, and the next access
//! creates a fresh one.
//!
//! Lock order: default slot, then context state, then the signal table.

use crate::arguments::{self, ParsedArguments};
use crate::config::RuntimeConfig;
use crate::domain::{self, DomainSettings, EnvSource, ProcessEnv};
use crate::error::ContextError;
use crate::signals::{self, SignalHandlerOptions};
use chrono::{DateTime, Utc};
use parking_lot::{const_mutex, Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CONTEXT_COUNTER: AtomicU64 = AtomicU64::new(1);

static DEFAULT_CONTEXT: Mutex<Option<Context>> = const_mutex(None);

/// Initialized contexts, shut down together when a signal is dispatched.
static LIVE_CONTEXTS: Mutex<Vec<Weak<ContextInner>>> = const_mutex(Vec::new());

/// Process-unique context identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        ContextId(CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Shutdown,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Options for a single `init` call.
#[derive(Clone)]
pub struct InitOptions {
    args: Vec<OsString>,
    domain_id: Option<i64>,
    signal_handler_options: Option<SignalHandlerOptions>,
    domain: DomainSettings,
    env: Arc<dyn EnvSource>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            domain_id: None,
            signal_handler_options: None,
            domain: DomainSettings::default(),
            env: Arc::new(ProcessEnv),
        }
    }
}

impl fmt::Debug for InitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitOptions")
            .field("args", &self.args)
            .field("domain_id", &self.domain_id)
            .field("signal_handler_options", &self.signal_handler_options)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl InitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options seeded from runtime configuration.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            domain_id: config.domain.domain_id,
            signal_handler_options: config.signals.default_handlers,
            domain: DomainSettings {
                env_var: config.domain.env_var.clone(),
                default_domain_id: config.domain.default_domain_id,
            },
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn domain_id(mut self, domain_id: i64) -> Self {
        self.domain_id = Some(domain_id);
        self
    }

    pub fn signal_handler_options(mut self, options: SignalHandlerOptions) -> Self {
        self.signal_handler_options = Some(options);
        self
    }

    pub fn domain_settings(mut self, settings: DomainSettings) -> Self {
        self.domain = settings;
        self
    }

    /// Environment used to resolve an implicit domain id.
    pub fn env_source(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }
}

/// Data bound to an initialized context.
#[derive(Debug, Clone)]
struct Session {
    domain_id: u64,
    arguments: ParsedArguments,
    signal_options: SignalHandlerOptions,
    owns_signal_handlers: bool,
    initialized_at: DateTime<Utc>,
}

#[derive(Debug)]
enum ContextState {
    Uninitialized,
    Initialized(Session),
    Shutdown,
}

type ShutdownCallback = Box<dyn FnOnce() + Send + 'static>;

struct ContextInner {
    id: ContextId,
    state: Mutex<ContextState>,
    shut_down: Condvar,
    on_shutdown: Mutex<Vec<ShutdownCallback>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let ContextState::Initialized(session) = &*self.state.get_mut() {
            warn!(context = %self.id, "Context dropped while initialized");
            if session.owns_signal_handlers {
                if let Err(e) = signals::uninstall(self.id) {
                    warn!(context = %self.id, error = %e, "Failed to release signal handlers");
                }
            }
        }
    }
}

/// Serializable snapshot of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStatus {
    pub id: ContextId,
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_handler_options: Option<SignalHandlerOptions>,
    pub owns_signal_handlers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized_at: Option<String>,
}

/// Handle to a client context. Clones share the same context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Context {
    /// A fresh, uninitialized context.
    pub fn new() -> Self {
        Context {
            inner: Arc::new(ContextInner {
                id: ContextId::next(),
                state: Mutex::new(ContextState::Uninitialized),
                shut_down: Condvar::new(),
                on_shutdown: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn state(&self) -> LifecycleState {
        match &*self.inner.state.lock() {
            ContextState::Uninitialized => LifecycleState::Uninitialized,
            ContextState::Initialized(_) => LifecycleState::Initialized,
            ContextState::Shutdown => LifecycleState::Shutdown,
        }
    }

    /// Whether the context is initialized and not yet shut down.
    pub fn ok(&self) -> bool {
        self.state() == LifecycleState::Initialized
    }

    /// Whether this is the process default context.
    pub fn is_default(&self) -> bool {
        DEFAULT_CONTEXT
            .lock()
            .as_ref()
            .map_or(false, |default| Arc::ptr_eq(&default.inner, &self.inner))
    }

    /// Initialize the context.
    ///
    /// Nothing changes when this fails; the context stays uninitialized.
    pub fn init(&self, options: InitOptions) -> Result<(), ContextError> {
        // Before the state lock: the default slot comes first in lock order.
        let is_default = self.is_default();

        let mut state = self.inner.state.lock();
        if !matches!(*state, ContextState::Uninitialized) {
            return Err(ContextError::AlreadyInitialized);
        }

        let args = arguments::decode_args(options.args)?;
        let parsed = arguments::parse_arguments(&args)?;
        let domain_id =
            domain::resolve_domain_id(options.domain_id, &options.domain, options.env.as_ref())?;

        let signal_options = options.signal_handler_options.unwrap_or(if is_default {
            SignalHandlerOptions::All
        } else {
            SignalHandlerOptions::No
        });
        let owns_signal_handlers = signals::install(self.inner.id, signal_options)?;

        *state = ContextState::Initialized(Session {
            domain_id,
            arguments: parsed,
            signal_options,
            owns_signal_handlers,
            initialized_at: Utc::now(),
        });
        drop(state);

        register_live(&self.inner);
        info!(
            context = %self.inner.id,
            domain_id,
            signal_handlers = %signal_options,
            owns_signal_handlers,
            "Context initialized"
        );
        Ok(())
    }

    /// Shut the context down, releasing any signal handlers it owns.
    pub fn shutdown(&self) -> Result<(), ContextError> {
        let mut state = self.inner.state.lock();
        let owns_signal_handlers = match &*state {
            ContextState::Initialized(session) => session.owns_signal_handlers,
            _ => return Err(ContextError::NotInitialized),
        };

        if owns_signal_handlers {
            signals::uninstall(self.inner.id)?;
        }
        *state = ContextState::Shutdown;
        self.inner.shut_down.notify_all();
        drop(state);

        unregister_live(self.inner.id);
        let callbacks = std::mem::take(&mut *self.inner.on_shutdown.lock());
        debug!(context = %self.inner.id, callbacks = callbacks.len(), "Running shutdown callbacks");
        for callback in callbacks {
            callback();
        }

        info!(context = %self.inner.id, "Context shut down");
        Ok(())
    }

    /// Shut down if initialized; otherwise do nothing.
    pub fn try_shutdown(&self) -> Result<(), ContextError> {
        match self.shutdown() {
            Err(ContextError::NotInitialized) => Ok(()),
            other => other,
        }
    }

    /// Domain id bound at `init`.
    pub fn get_domain_id(&self) -> Result<u64, ContextError> {
        match &*self.inner.state.lock() {
            ContextState::Initialized(session) => Ok(session.domain_id),
            _ => Err(ContextError::NotInitialized),
        }
    }

    /// Arguments parsed at `init`.
    pub fn arguments(&self) -> Result<ParsedArguments, ContextError> {
        match &*self.inner.state.lock() {
            ContextState::Initialized(session) => Ok(session.arguments.clone()),
            _ => Err(ContextError::NotInitialized),
        }
    }

    /// Block until the context is shut down or `timeout` elapses.
    /// Returns whether it is shut down.
    pub fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.inner.state.lock();
        while !matches!(*state, ContextState::Shutdown) {
            match deadline {
                Some(deadline) => {
                    if self.inner.shut_down.wait_until(&mut state, deadline).timed_out() {
                        return matches!(*state, ContextState::Shutdown);
                    }
                }
                None => self.inner.shut_down.wait(&mut state),
            }
        }
        true
    }

    /// Register a callback for shutdown. Runs immediately if already shut down.
    pub fn on_shutdown<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let state = self.inner.state.lock();
        if matches!(*state, ContextState::Shutdown) {
            drop(state);
            callback();
            return;
        }
        self.inner.on_shutdown.lock().push(Box::new(callback));
    }

    pub fn status(&self) -> ContextStatus {
        let state = self.inner.state.lock();
        match &*state {
            ContextState::Initialized(session) => ContextStatus {
                id: self.inner.id,
                state: LifecycleState::Initialized,
                domain_id: Some(session.domain_id),
                signal_handler_options: Some(session.signal_options),
                owns_signal_handlers: session.owns_signal_handlers,
                initialized_at: Some(session.initialized_at.to_rfc3339()),
            },
            other => ContextStatus {
                id: self.inner.id,
                state: if matches!(other, ContextState::Shutdown) {
                    LifecycleState::Shutdown
                } else {
                    LifecycleState::Uninitialized
                },
                domain_id: None,
                signal_handler_options: None,
                owns_signal_handlers: false,
                initialized_at: None,
            },
        }
    }
}

fn register_live(inner: &Arc<ContextInner>) {
    let mut live = LIVE_CONTEXTS.lock();
    live.retain(|weak| weak.strong_count() > 0);
    live.push(Arc::downgrade(inner));
}

fn unregister_live(id: ContextId) {
    LIVE_CONTEXTS
        .lock()
        .retain(|weak| weak.upgrade().map_or(false, |inner| inner.id != id));
}

/// Shut down every initialized context. Returns how many were shut down.
pub(crate) fn shutdown_live_contexts() -> usize {
    let live: Vec<Context> = LIVE_CONTEXTS
        .lock()
        .iter()
        .filter_map(Weak::upgrade)
        .map(|inner| Context { inner })
        .collect();

    let mut count = 0;
    for context in live {
        match context.shutdown() {
            Ok(()) => count += 1,
            Err(ContextError::NotInitialized) => {}
            Err(e) => warn!(context = %context.id(), error = %e, "Failed to shut down context"),
        }
    }
    count
}

/// The process default context, creating a fresh one if needed.
///
/// A shut-down default is never returned again.
pub fn get_default_context() -> Context {
    let mut slot = DEFAULT_CONTEXT.lock();
    match slot.as_ref() {
        Some(context) if context.state() != LifecycleState::Shutdown => context.clone(),
        _ => {
            let context = Context::new();
            debug!(context = %context.id(), "Created default context");
            *slot = Some(context.clone());
            context
        }
    }
}

/// Initialize `context`, or the default context when `None`. Returns the context.
pub fn init(context: Option<&Context>, options: InitOptions) -> Result<Context, ContextError> {
    let context = match context {
        Some(context) => context.clone(),
        None => get_default_context(),
    };
    context.init(options)?;
    Ok(context)
}

/// Shut down `context`, or the default context when `None`.
pub fn shutdown(context: Option<&Context>) -> Result<(), ContextError> {
    match context {
        Some(context) => context.shutdown(),
        None => {
            let context = DEFAULT_CONTEXT
                .lock()
                .clone()
                .ok_or(ContextError::NotInitialized)?;
            context.shutdown()?;
            release_default(&context);
            Ok(())
        }
    }
}

/// Like [`shutdown`], but a context that is not initialized is not an error.
pub fn try_shutdown(context: Option<&Context>) -> Result<(), ContextError> {
    match shutdown(context) {
        Err(ContextError::NotInitialized) => Ok(()),
        other => other,
    }
}

/// Whether `context`, or the default context when `None`, is initialized.
pub fn ok(context: Option<&Context>) -> bool {
    match context {
        Some(context) => context.ok(),
        None => DEFAULT_CONTEXT
            .lock()
            .as_ref()
            .map_or(false, |context| context.ok()),
    }
}

fn release_default(context: &Context) {
    let mut slot = DEFAULT_CONTEXT.lock();
    if slot
        .as_ref()
        .map_or(false, |default| Arc::ptr_eq(&default.inner, &context.inner))
    {
        *slot = None;
    }
}

/// Serializes tests that touch the default slot or the signal table.
#[cfg(test)]
pub(crate) static GLOBAL_TEST_LOCK: Mutex<()> = const_mutex(());
