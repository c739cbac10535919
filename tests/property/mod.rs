//! Property-based tests for argument handling and the context lifecycle

mod arguments;
mod lifecycle;
