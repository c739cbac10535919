//! CLI domain: parse, route, output, and presentation only.
//! No lifecycle logic of its own; the route table calls into the library.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_arguments_json, format_arguments_text, format_config, format_run_summary_json,
    format_run_summary_text, RunSummary,
};
pub use route::RunContext;
