//! Integration tests driving the rclctx binary

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Run the binary with an isolated home so no user config is picked up.
fn rclctx(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rclctx"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("RCLCTX_LOG", "off")
        .env_remove("ROS_DOMAIN_ID")
        .output()
        .expect("failed to run rclctx")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_args_reports_reserved_options() {
    let home = TempDir::new().unwrap();
    let output = rclctx(
        home.path(),
        &["args", "--", "talker", "--ros-args", "-r", "chatter:=news", "--", "extra"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("talker"));
    assert!(text.contains("extra"));
    assert!(text.contains("chatter -> news"));
}

#[test]
fn test_args_json() {
    let home = TempDir::new().unwrap();
    let output = rclctx(
        home.path(),
        &["args", "--format", "json", "--", "talker", "--ros-args", "-p", "rate:=10"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["non_ros_args"], serde_json::json!(["talker"]));
    assert_eq!(parsed["parameter_overrides"][0]["name"], "rate");
}

#[test]
fn test_args_rejects_unknown_ros_args() {
    let home = TempDir::new().unwrap();
    let output = rclctx(home.path(), &["args", "--", "--ros-args", "unknown"]);

    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("['unknown']"),
        "stderr: {}",
        stderr(&output)
    );
}

#[test]
fn test_run_with_timeout() {
    let home = TempDir::new().unwrap();
    let output = rclctx(
        home.path(),
        &[
            "run",
            "--domain-id",
            "42",
            "--timeout-secs",
            "0",
            "--node-name",
            "talker",
            "--format",
            "json",
            "--",
            "prog",
            "--ros-args",
            "-r",
            "__ns:=/demo",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["context"]["domain_id"], 42);
    assert_eq!(summary["context"]["signal_handler_options"], "all");
    assert_eq!(summary["node"], "/demo/talker");
    assert_eq!(summary["non_ros_args"], serde_json::json!(["prog"]));
    assert!(summary.get("signal").is_none());
}

#[test]
fn test_run_rejects_negative_domain_id() {
    let home = TempDir::new().unwrap();
    let output = rclctx(
        home.path(),
        &["run", "--domain-id", "-1", "--timeout-secs", "0"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("-1"), "stderr: {}", stderr(&output));
}

#[test]
fn test_config_command_uses_config_file() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("custom.toml");
    std::fs::write(
        &config_path,
        "[domain]\ndefault_domain_id = 21\n\n[signals]\ndefault_handlers = \"sigint\"\n",
    )
    .unwrap();

    let output = rclctx(
        home.path(),
        &[
            "--config",
            config_path.to_str().unwrap(),
            "config",
            "--format",
            "json",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let config: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(config["domain"]["default_domain_id"], 21);
    assert_eq!(config["signals"]["default_handlers"], "sigint");
}

#[test]
fn test_run_config_signal_default() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("custom.toml");
    std::fs::write(&config_path, "[signals]\ndefault_handlers = \"no\"\n").unwrap();

    let output = rclctx(
        home.path(),
        &[
            "--config",
            config_path.to_str().unwrap(),
            "run",
            "--timeout-secs",
            "0",
            "--format",
            "json",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["context"]["signal_handler_options"], "no");
    assert_eq!(summary["context"]["owns_signal_handlers"], false);
}

#[test]
fn test_run_shuts_down_on_sigint() {
    let home = TempDir::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_rclctx"))
        .args(["run", "--format", "json"])
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("RCLCTX_LOG", "info")
        .env("RCLCTX_LOG_FORMAT", "json")
        .env_remove("ROS_DOMAIN_ID")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run rclctx");

    let mut log = BufReader::new(child.stderr.take().unwrap());
    let mut line = String::new();
    loop {
        line.clear();
        let read = log.read_line(&mut line).unwrap();
        assert!(read > 0, "rclctx exited before waiting for a signal");
        if line.contains("Waiting for shutdown signal") {
            break;
        }
    }

    // SAFETY: plain kill(2) on our own child.
    let sent = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(sent, 0);

    let mut rest = String::new();
    log.read_to_string(&mut rest).unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "stderr: {}", rest);

    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["signal"], "SIGINT");
    assert!(rest.contains("Signal received, contexts shut down"), "log: {}", rest);
}
