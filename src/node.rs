//! Node handles
//!
//! Node creation is gated on the context alone: a context that is not
//! initialized rejects every node, whatever its name. Names and namespaces are
//! validated after the `__node` and `__ns` remap rules from the context's
//! arguments are applied.

use crate::context::{self, Context};
use crate::error::ContextError;
use tracing::debug;

const MAX_NAME_LENGTH: usize = 255;

/// A named participant bound to a context.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    namespace: String,
    context: Context,
}

impl Node {
    /// Create a node in the root namespace.
    pub fn new(name: &str, context: &Context) -> Result<Self, ContextError> {
        Self::with_namespace(name, "/", context)
    }

    pub fn with_namespace(
        name: &str,
        namespace: &str,
        context: &Context,
    ) -> Result<Self, ContextError> {
        let arguments = context.arguments()?;

        let resolved_name = arguments
            .remap_for(name, "__node")
            .or_else(|| arguments.remap_for(name, "__name"))
            .unwrap_or(name)
            .to_string();
        let resolved_namespace =
            normalize_namespace(arguments.remap_for(name, "__ns").unwrap_or(namespace));

        validate_node_name(&resolved_name)?;
        validate_namespace(&resolved_namespace)?;

        debug!(
            context = %context.id(),
            name = %resolved_name,
            namespace = %resolved_namespace,
            "Node created"
        );
        Ok(Node {
            name: resolved_name,
            namespace: resolved_namespace,
            context: context.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn fully_qualified_name(&self) -> String {
        if self.namespace == "/" {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Whether the owning context is still initialized.
    pub fn is_valid(&self) -> bool {
        self.context.ok()
    }
}

/// Create a node on `context`, or on the default context when `None`.
pub fn create_node(name: &str, context: Option<&Context>) -> Result<Node, ContextError> {
    match context {
        Some(context) => Node::new(name, context),
        None => Node::new(name, &context::get_default_context()),
    }
}

/// Relative namespaces are anchored at the root.
fn normalize_namespace(namespace: &str) -> String {
    if namespace.is_empty() {
        "/".to_string()
    } else if namespace.starts_with('/') {
        namespace.to_string()
    } else {
        format!("/{}", namespace)
    }
}

fn is_name_token(token: &str) -> Result<(), String> {
    let first = token
        .chars()
        .next()
        .ok_or_else(|| "must not be empty".to_string())?;
    if first.is_ascii_digit() {
        return Err("must not start with a number".to_string());
    }
    if let Some(c) = token.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(format!(
            "must contain only alphanumeric characters and underscores, found {:?}",
            c
        ));
    }
    Ok(())
}

pub fn validate_node_name(name: &str) -> Result<(), ContextError> {
    let invalid = |reason: String| ContextError::InvalidNodeName {
        name: name.to_string(),
        reason,
    };
    if name.len() > MAX_NAME_LENGTH {
        return Err(invalid(format!("longer than {} characters", MAX_NAME_LENGTH)));
    }
    is_name_token(name).map_err(invalid)
}

pub fn validate_namespace(namespace: &str) -> Result<(), ContextError> {
    let invalid = |reason: String| ContextError::InvalidNamespace {
        namespace: namespace.to_string(),
        reason,
    };
    if !namespace.starts_with('/') {
        return Err(invalid("must be absolute".to_string()));
    }
    if namespace == "/" {
        return Ok(());
    }
    if namespace.ends_with('/') {
        return Err(invalid("must not end with '/'".to_string()));
    }
    if namespace.len() > MAX_NAME_LENGTH {
        return Err(invalid(format!("longer than {} characters", MAX_NAME_LENGTH)));
    }
    for token in namespace[1..].split('/') {
        if token.is_empty() {
            return Err(invalid("must not contain repeated '/'".to_string()));
        }
        is_name_token(token).map_err(|reason| invalid(format!("token {:?} {}", token, reason)))?;
    }
    Ok(())
}
