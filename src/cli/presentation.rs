//! Presentation: text and JSON formatters for parsed arguments, run summaries and config.

use crate::arguments::ParsedArguments;
use crate::config::RuntimeConfig;
use crate::context::ContextStatus;
use crate::error::ContextError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};

/// Outcome of `rclctx run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Context status right after init
    pub context: ContextStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Signal that triggered the shutdown, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    pub non_ros_args: Vec<String>,
}

fn section_title(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ContextError> {
    serde_json::to_string_pretty(value).map_err(|e| ContextError::ConfigError(e.to_string()))
}

pub fn format_arguments_json(parsed: &ParsedArguments) -> Result<String, ContextError> {
    to_json(parsed)
}

pub fn format_arguments_text(parsed: &ParsedArguments) -> String {
    let mut rows: Vec<(String, String)> = Vec::new();
    for rule in &parsed.remap_rules {
        let target = match &rule.node {
            Some(node) => format!("{}:{}", node, rule.from),
            None => rule.from.clone(),
        };
        rows.push(("remap".to_string(), format!("{} -> {}", target, rule.to)));
    }
    for param in &parsed.parameter_overrides {
        let name = match &param.node {
            Some(node) => format!("{}:{}", node, param.name),
            None => param.name.clone(),
        };
        rows.push(("param".to_string(), format!("{} = {}", name, param.value)));
    }
    for file in &parsed.parameter_files {
        rows.push(("params-file".to_string(), file.display().to_string()));
    }
    if let Some(level) = parsed.log_levels.default {
        rows.push(("log-level".to_string(), format!("{:?}", level).to_lowercase()));
    }
    for (logger, level) in &parsed.log_levels.loggers {
        rows.push((
            "log-level".to_string(),
            format!("{} = {}", logger, format!("{:?}", level).to_lowercase()),
        ));
    }
    if let Some(file) = &parsed.log_config_file {
        rows.push(("log-config-file".to_string(), file.display().to_string()));
    }
    if let Some(name) = &parsed.log_file_name {
        rows.push(("log-file-name".to_string(), name.clone()));
    }
    if let Some(enclave) = &parsed.enclave {
        rows.push(("enclave".to_string(), enclave.clone()));
    }
    for (label, toggle) in [
        ("rosout-logs", parsed.rosout_logs),
        ("stdout-logs", parsed.stdout_logs),
        ("external-lib-logs", parsed.external_lib_logs),
    ] {
        if let Some(enabled) = toggle {
            let value = if enabled { "enabled" } else { "disabled" };
            rows.push((label.to_string(), value.to_string()));
        }
    }

    let mut out = section_title("Arguments");
    if parsed.non_ros_args.is_empty() {
        out.push_str("\n  (none)");
    } else {
        for (i, arg) in parsed.non_ros_args.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, arg));
        }
    }

    out.push_str("\n\n");
    out.push_str(&section_title("Reserved options"));
    if rows.is_empty() {
        out.push_str("\n  (none)");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Option", "Value"]);
        for (option, value) in rows {
            table.add_row(vec![option, value]);
        }
        out.push('\n');
        out.push_str(&table.to_string());
    }
    out
}

pub fn format_run_summary_json(summary: &RunSummary) -> Result<String, ContextError> {
    to_json(summary)
}

pub fn format_run_summary_text(summary: &RunSummary) -> String {
    let status = &summary.context;
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Context".to_string(), status.id.to_string()]);
    table.add_row(vec![
        "Domain id".to_string(),
        status
            .domain_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Signal handlers".to_string(),
        status
            .signal_handler_options
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Owns handlers".to_string(),
        status.owns_signal_handlers.to_string(),
    ]);
    if let Some(node) = &summary.node {
        table.add_row(vec!["Node".to_string(), node.clone()]);
    }
    if !summary.non_ros_args.is_empty() {
        table.add_row(vec!["Arguments".to_string(), summary.non_ros_args.join(" ")]);
    }
    table.add_row(vec![
        "Shutdown by".to_string(),
        summary
            .signal
            .clone()
            .unwrap_or_else(|| "timeout".to_string()),
    ]);

    format!("{}\n{}", section_title("Session"), table)
}

pub fn format_config(config: &RuntimeConfig, format: &str) -> Result<String, ContextError> {
    match format {
        "json" => to_json(config),
        "toml" => toml::to_string_pretty(config)
            .map_err(|e| ContextError::ConfigError(e.to_string())),
        other => Err(ContextError::ConfigError(format!(
            "Invalid output format: {} (must be 'toml' or 'json')",
            other
        ))),
    }
}
