//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ContextError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &ContextError) -> String {
    match e {
        ContextError::UnknownRosArgs(_) | ContextError::InvalidRosArgs(_) => {
            format!("{}\nReserved arguments follow --ros-args and end at --.", e)
        }
        ContextError::Encoding(_) => format!("Arguments must be valid UTF-8: {}", e),
        _ => e.to_string(),
    }
}
