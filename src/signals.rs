//! Process-wide signal handlers
//!
//! The OS handler table is a single shared resource. At most one context owns
//! it at a time; a second install request while it is owned is a no-op, and
//! only the owner can uninstall. Uninstalling restores whatever dispositions
//! were in place before the install.
//!
//! The installed handler records the signal number and wakes a watcher thread
//! through a socket pair. The watcher runs [`dispatch_pending_signal`] outside
//! signal context: every live context is shut down, which releases the table,
//! and the signal is raised again so the restored disposition still sees it.

use crate::context::{self, ContextId};
use crate::error::ContextError;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use parking_lot::{const_mutex, Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Which OS signals a context installs handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalHandlerOptions {
    /// SIGINT and SIGTERM.
    All,
    /// No handlers.
    No,
    SigInt,
    SigTerm,
}

impl SignalHandlerOptions {
    /// Signals covered by this option.
    pub fn signals(self) -> &'static [Signal] {
        match self {
            SignalHandlerOptions::All => &[Signal::SIGINT, Signal::SIGTERM],
            SignalHandlerOptions::No => &[],
            SignalHandlerOptions::SigInt => &[Signal::SIGINT],
            SignalHandlerOptions::SigTerm => &[Signal::SIGTERM],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalHandlerOptions::All => "all",
            SignalHandlerOptions::No => "no",
            SignalHandlerOptions::SigInt => "sigint",
            SignalHandlerOptions::SigTerm => "sigterm",
        }
    }
}

impl fmt::Display for SignalHandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalHandlerOptions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(SignalHandlerOptions::All),
            "no" | "none" => Ok(SignalHandlerOptions::No),
            "sigint" => Ok(SignalHandlerOptions::SigInt),
            "sigterm" => Ok(SignalHandlerOptions::SigTerm),
            other => Err(format!(
                "Invalid signal handler option: {} (must be 'all', 'no', 'sigint' or 'sigterm')",
                other
            )),
        }
    }
}

struct InstalledHandlers {
    owner: ContextId,
    options: SignalHandlerOptions,
    previous: Vec<(Signal, SigAction)>,
}

static INSTALLED: Mutex<Option<InstalledHandlers>> = const_mutex(None);

/// Last signal caught by the installed handler (0 if none).
static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Write end of the watcher's socket pair (-1 until the watcher starts).
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

/// Keeps the write end open for the life of the process.
static WATCHER: Mutex<Option<UnixStream>> = const_mutex(None);

/// Last signal handled by [`dispatch_pending_signal`] for the current owner.
static DELIVERED: Mutex<Option<Signal>> = const_mutex(None);
static DELIVERED_CV: Condvar = Condvar::new();

/// Async-safe: an atomic store and a non-blocking write(2).
extern "C" fn handle_signal(signum: libc::c_int) {
    PENDING_SIGNAL.store(signum, Ordering::SeqCst);
    let fd = WAKE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        let byte = 1u8;
        // SAFETY: fd is the open, non-blocking write end owned by WATCHER.
        let _ = unsafe { libc::write(fd, (&byte as *const u8).cast(), 1) };
    }
}

/// Start the watcher thread once per process.
fn ensure_watcher() -> Result<(), ContextError> {
    let mut watcher = WATCHER.lock();
    if watcher.is_some() {
        return Ok(());
    }

    let (reader, writer) = UnixStream::pair().map_err(ContextError::SignalWatcher)?;
    writer
        .set_nonblocking(true)
        .map_err(ContextError::SignalWatcher)?;
    std::thread::Builder::new()
        .name("rclctx-signals".to_string())
        .spawn(move || watch(reader))
        .map_err(ContextError::SignalWatcher)?;

    WAKE_FD.store(writer.as_raw_fd(), Ordering::SeqCst);
    *watcher = Some(writer);
    debug!("Signal watcher started");
    Ok(())
}

fn watch(mut reader: UnixStream) {
    let mut buf = [0u8; 16];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(_) => {
                dispatch_pending_signal();
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "Signal watcher stopped");
                return;
            }
        }
    }
}

/// Install handlers for `options` on behalf of `owner`.
///
/// Returns `true` if `owner` now owns the handler table, `false` if nothing was
/// requested or another context already owns it.
pub(crate) fn install(owner: ContextId, options: SignalHandlerOptions) -> Result<bool, ContextError> {
    if options == SignalHandlerOptions::No {
        return Ok(false);
    }

    ensure_watcher()?;

    let mut installed = INSTALLED.lock();
    if let Some(current) = installed.as_ref() {
        debug!(
            requested_by = %owner,
            owner = %current.owner,
            options = %current.options,
            "Signal handlers already installed, not installing again"
        );
        return Ok(false);
    }

    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    let mut previous = Vec::with_capacity(options.signals().len());
    for &sig in options.signals() {
        // SAFETY: handle_signal is async-signal-safe.
        match unsafe { signal::sigaction(sig, &action) } {
            Ok(old) => previous.push((sig, old)),
            Err(source) => {
                restore(&previous);
                return Err(ContextError::SignalInstall {
                    signal: sig.to_string(),
                    source,
                });
            }
        }
    }

    // A new owner never inherits a signal caught for an earlier one.
    PENDING_SIGNAL.store(0, Ordering::SeqCst);
    *DELIVERED.lock() = None;

    *installed = Some(InstalledHandlers {
        owner,
        options,
        previous,
    });
    info!(context = %owner, options = %options, "Signal handlers installed");
    Ok(true)
}

/// Uninstall the handlers if `owner` owns them. Returns whether anything was removed.
pub(crate) fn uninstall(owner: ContextId) -> Result<bool, ContextError> {
    let mut installed = INSTALLED.lock();
    match installed.as_ref() {
        Some(current) if current.owner == owner => {}
        _ => return Ok(false),
    }

    if let Some(current) = installed.as_ref() {
        for (sig, old) in current.previous.iter().rev() {
            // SAFETY: restores a disposition previously returned by sigaction.
            unsafe { signal::sigaction(*sig, old) }.map_err(|source| {
                ContextError::SignalInstall {
                    signal: sig.to_string(),
                    source,
                }
            })?;
        }
    }

    PENDING_SIGNAL.store(0, Ordering::SeqCst);
    *installed = None;
    info!(context = %owner, "Signal handlers uninstalled");
    Ok(true)
}

fn restore(previous: &[(Signal, SigAction)]) {
    for (sig, old) in previous.iter().rev() {
        // SAFETY: restores a disposition previously returned by sigaction.
        if let Err(e) = unsafe { signal::sigaction(*sig, old) } {
            warn!(signal = %sig, error = %e, "Failed to restore signal disposition");
        }
    }
}

/// Policy of the currently installed handlers; `No` when none are installed.
pub fn get_current_signal_handlers_options() -> SignalHandlerOptions {
    INSTALLED
        .lock()
        .as_ref()
        .map(|current| current.options)
        .unwrap_or(SignalHandlerOptions::No)
}

/// Context currently owning the handler table, if any.
pub fn handler_owner() -> Option<ContextId> {
    INSTALLED.lock().as_ref().map(|current| current.owner)
}

/// Signal caught but not yet dispatched, without clearing it.
pub fn pending_signal() -> Option<Signal> {
    to_signal(PENDING_SIGNAL.load(Ordering::SeqCst))
}

/// Signal caught but not yet dispatched, clearing it.
pub fn take_pending_signal() -> Option<Signal> {
    to_signal(PENDING_SIGNAL.swap(0, Ordering::SeqCst))
}

fn to_signal(signum: i32) -> Option<Signal> {
    if signum == 0 {
        return None;
    }
    Signal::try_from(signum).ok()
}

/// Block until a caught signal has been dispatched or `timeout` elapses.
///
/// Returns the dispatched signal. Cleared when a new owner installs handlers.
pub fn wait_for_signal(timeout: Duration) -> Option<Signal> {
    let deadline = Instant::now().checked_add(timeout);
    let mut delivered = DELIVERED.lock();
    loop {
        if let Some(sig) = *delivered {
            return Some(sig);
        }
        match deadline {
            Some(deadline) => {
                if DELIVERED_CV.wait_until(&mut delivered, deadline).timed_out() {
                    return *delivered;
                }
            }
            None => DELIVERED_CV.wait(&mut delivered),
        }
    }
}

/// Shut down every live context if a signal was caught, then forward the
/// signal to the disposition that was in place before the handlers.
///
/// Called by the watcher thread; callers may also drive it directly.
/// Returns the signal, or `None` if nothing was pending.
pub fn dispatch_pending_signal() -> Option<Signal> {
    let sig = take_pending_signal()?;
    let count = context::shutdown_live_contexts();
    info!(signal = %sig, contexts = count, "Signal received, contexts shut down");

    if handler_owner().is_none() {
        debug!(signal = %sig, "Forwarding signal to previous disposition");
        if let Err(e) = signal::raise(sig) {
            warn!(signal = %sig, error = %e, "Failed to forward signal");
        }
    } else {
        warn!(signal = %sig, "Signal handlers still installed, not forwarding");
    }

    *DELIVERED.lock() = Some(sig);
    DELIVERED_CV.notify_all();
    Some(sig)
}
