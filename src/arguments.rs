//! Command-line argument handling
//!
//! Arguments reach `init` as raw OS strings. They are decoded to UTF-8 first and
//! then split into the application's own arguments and the reserved blocks that
//! start at `--ros-args` and run until `--` or the end of the vector. Every token
//! inside a reserved block must be a recognized option.

use crate::error::ContextError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;
use std::str::FromStr;

/// Token that opens a reserved argument block.
pub const ROS_ARGS_FLAG: &str = "--ros-args";

/// Token that closes a reserved argument block.
pub const ROS_ARGS_END: &str = "--";

/// Decode raw arguments to UTF-8 strings.
///
/// The first undecodable argument fails the whole call with the underlying
/// [`std::string::FromUtf8Error`].
pub fn decode_args<I, S>(args: I) -> Result<Vec<String>, ContextError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    args.into_iter()
        .map(|arg| String::from_utf8(arg.into().into_vec()).map_err(ContextError::from))
        .collect()
}

/// Severity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Unset,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl FromStr for LogSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unset" => Ok(LogSeverity::Unset),
            "debug" => Ok(LogSeverity::Debug),
            "info" => Ok(LogSeverity::Info),
            "warn" | "warning" => Ok(LogSeverity::Warn),
            "error" => Ok(LogSeverity::Error),
            "fatal" => Ok(LogSeverity::Fatal),
            other => Err(format!("unknown log severity '{}'", other)),
        }
    }
}

/// `[node:]from:=to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub from: String,
    pub to: String,
}

impl RemapRule {
    /// Whether the rule applies to a node originally named `node_name`.
    pub fn applies_to(&self, node_name: &str) -> bool {
        self.node.as_deref().map_or(true, |n| n == node_name)
    }
}

/// `[node:]name:=value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub name: String,
    pub value: String,
}

/// Log severities requested with `--log-level`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLevels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<LogSeverity>,
    #[serde(default)]
    pub loggers: Vec<(String, LogSeverity)>,
}

/// Result of parsing an argument vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedArguments {
    /// Arguments outside every reserved block, in their original order.
    pub non_ros_args: Vec<String>,
    pub remap_rules: Vec<RemapRule>,
    pub parameter_overrides: Vec<ParameterOverride>,
    pub parameter_files: Vec<PathBuf>,
    pub log_levels: LogLevels,
    pub log_config_file: Option<PathBuf>,
    pub log_file_name: Option<String>,
    pub enclave: Option<String>,
    pub rosout_logs: Option<bool>,
    pub stdout_logs: Option<bool>,
    pub external_lib_logs: Option<bool>,
}

impl ParsedArguments {
    /// Last remap rule for `from` that applies to `node_name`.
    pub fn remap_for(&self, node_name: &str, from: &str) -> Option<&str> {
        self.remap_rules
            .iter()
            .rev()
            .find(|rule| rule.from == from && rule.applies_to(node_name))
            .map(|rule| rule.to.as_str())
    }
}

/// Parse an already decoded argument vector.
pub fn parse_arguments(args: &[String]) -> Result<ParsedArguments, ContextError> {
    let mut parsed = ParsedArguments::default();
    let mut unknown = Vec::new();
    let mut in_block = false;
    let mut i = 0;

    while i < args.len() {
        let token = args[i].as_str();
        i += 1;

        if !in_block {
            if token == ROS_ARGS_FLAG {
                in_block = true;
            } else {
                parsed.non_ros_args.push(token.to_string());
            }
            continue;
        }

        match token {
            ROS_ARGS_END => in_block = false,
            ROS_ARGS_FLAG => {}
            "-r" | "--remap" => {
                let value = take_value(args, &mut i, token, "remap rule")?;
                let (node, from, to) = split_assignment(value, token)?;
                parsed.remap_rules.push(RemapRule { node, from, to });
            }
            "-p" | "--param" => {
                let value = take_value(args, &mut i, token, "parameter assignment")?;
                let (node, name, value) = split_assignment(value, token)?;
                parsed
                    .parameter_overrides
                    .push(ParameterOverride { node, name, value });
            }
            "--params-file" => {
                let value = take_value(args, &mut i, token, "parameter file path")?;
                parsed.parameter_files.push(PathBuf::from(value));
            }
            "--log-level" => {
                let value = take_value(args, &mut i, token, "log level")?;
                parse_log_level(value, &mut parsed.log_levels)?;
            }
            "--log-config-file" => {
                let value = take_value(args, &mut i, token, "log config file path")?;
                parsed.log_config_file = Some(PathBuf::from(value));
            }
            "--log-file-name" => {
                let value = take_value(args, &mut i, token, "log file name")?;
                parsed.log_file_name = Some(value.to_string());
            }
            "-e" | "--enclave" => {
                let value = take_value(args, &mut i, token, "enclave name")?;
                parsed.enclave = Some(value.to_string());
            }
            "--enable-rosout-logs" => parsed.rosout_logs = Some(true),
            "--disable-rosout-logs" => parsed.rosout_logs = Some(false),
            "--enable-stdout-logs" => parsed.stdout_logs = Some(true),
            "--disable-stdout-logs" => parsed.stdout_logs = Some(false),
            "--enable-external-lib-logs" => parsed.external_lib_logs = Some(true),
            "--disable-external-lib-logs" => parsed.external_lib_logs = Some(false),
            other => unknown.push(other.to_string()),
        }
    }

    if !unknown.is_empty() {
        return Err(ContextError::UnknownRosArgs(unknown));
    }
    Ok(parsed)
}

/// Return only the arguments outside reserved blocks.
///
/// Fails the same way [`parse_arguments`] does, so malformed blocks are never
/// silently dropped.
pub fn remove_ros_args(args: &[String]) -> Result<Vec<String>, ContextError> {
    Ok(parse_arguments(args)?.non_ros_args)
}

fn take_value<'a>(
    args: &'a [String],
    i: &mut usize,
    flag: &str,
    what: &str,
) -> Result<&'a str, ContextError> {
    match args.get(*i) {
        Some(value) if value != ROS_ARGS_END => {
            *i += 1;
            Ok(value.as_str())
        }
        _ => Err(ContextError::InvalidRosArgs(format!(
            "Couldn't parse trailing {} flag. No {} found.",
            flag, what
        ))),
    }
}

/// Split `[node:]lhs:=rhs`.
fn split_assignment(
    value: &str,
    flag: &str,
) -> Result<(Option<String>, String, String), ContextError> {
    let invalid = || {
        ContextError::InvalidRosArgs(format!(
            "Couldn't parse {} value '{}': expected [node:]name:=value",
            flag, value
        ))
    };

    let (lhs, rhs) = value.split_once(":=").ok_or_else(invalid)?;
    let (node, lhs) = match lhs.split_once(':') {
        Some((node, rest)) if !node.is_empty() => (Some(node.to_string()), rest),
        Some(_) => return Err(invalid()),
        None => (None, lhs),
    };
    if lhs.is_empty() || rhs.is_empty() {
        return Err(invalid());
    }
    Ok((node, lhs.to_string(), rhs.to_string()))
}

fn parse_log_level(value: &str, levels: &mut LogLevels) -> Result<(), ContextError> {
    let severity = |s: &str| {
        s.parse::<LogSeverity>().map_err(|e| {
            ContextError::InvalidRosArgs(format!("Couldn't parse log level '{}': {}", value, e))
        })
    };

    match value.split_once(":=") {
        Some((logger, level)) if !logger.is_empty() => {
            let level = severity(level)?;
            levels.loggers.push((logger.to_string(), level));
        }
        Some(_) => {
            return Err(ContextError::InvalidRosArgs(format!(
                "Couldn't parse log level '{}': empty logger name",
                value
            )))
        }
        None => levels.default = Some(severity(value)?),
    }
    Ok(())
}
