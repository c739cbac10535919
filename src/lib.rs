//! rclctx: Client Context Lifecycle
//!
//! Initialization and shutdown of a robotics middleware client context: the
//! exactly-once lifecycle, domain id binding, reserved argument parsing and
//! process-wide signal handler ownership.

pub mod arguments;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod logging;
pub mod node;
pub mod signals;

pub use context::{
    get_default_context, init, ok, shutdown, try_shutdown, Context, ContextId, InitOptions,
    LifecycleState,
};
pub use error::ContextError;
pub use node::{create_node, Node};
pub use signals::{get_current_signal_handlers_options, SignalHandlerOptions};
