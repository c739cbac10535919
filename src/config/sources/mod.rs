pub mod env_vars;
pub mod global_file;
