use std::path::PathBuf;
use std::time::Duration;

use checkpoint_relay::config::{GlobalConfig, RendezvousBackend};
use checkpoint_relay::strategy::CheckpointStrategy;
use checkpoint_relay::AppError;

fn sample_toml(workspace: &str) -> String {
    format!(
        r#"
bind_host = "0.0.0.0"
http_port = 9100
workspace_dir = '{workspace}'
host_cli = "claude-agent"
host_cli_args = ["--stdio"]
model = "claude-opus-4"
allowed_tools = ["Read", "Grep"]
checkpoint_strategy = "respawn"

[timeouts]
idle_seconds = 120
hard_limit_seconds = 900
notification_seconds = 10

[rendezvous]
backend = "sqlite"
db_path = '{workspace}/relay.db'
poll_interval_ms = 250
retention_hours = 6
"#
    )
}

const MINIMAL_TOML: &str = r#"host_cli = "claude-agent""#;

#[test]
fn parses_full_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().to_str().expect("utf8");
    let config = GlobalConfig::from_toml_str(&sample_toml(root)).expect("config parses");

    assert_eq!(config.bind_host, "0.0.0.0");
    assert_eq!(config.http_port, 9100);
    assert_eq!(config.workspace_dir, PathBuf::from(root));
    assert_eq!(config.host_cli_args, vec!["--stdio".to_owned()]);
    assert_eq!(config.model, "claude-opus-4");
    assert_eq!(config.allowed_tools, vec!["Read".to_owned(), "Grep".to_owned()]);
    assert_eq!(config.checkpoint_strategy, CheckpointStrategy::Respawn);
    assert_eq!(config.rendezvous.backend, RendezvousBackend::Sqlite);
    assert_eq!(config.idle_timeout(), Duration::from_secs(120));
    assert_eq!(config.hard_limit(), Duration::from_secs(900));
    assert_eq!(config.notification_timeout(), Duration::from_secs(10));
    assert_eq!(config.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.rendezvous.retention_hours, 6);
}

#[test]
fn minimal_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str(MINIMAL_TOML).expect("config parses");

    assert_eq!(config.bind_host, "127.0.0.1");
    assert_eq!(config.http_port, 8000);
    assert_eq!(config.workspace_dir, PathBuf::from("/tmp/workspace"));
    assert_eq!(config.checkpoint_strategy, CheckpointStrategy::Blocking);
    assert_eq!(config.rendezvous.backend, RendezvousBackend::Memory);
    assert_eq!(config.timeouts.idle_seconds, 300);
    assert_eq!(config.timeouts.hard_limit_seconds, 1800);
    assert_eq!(config.timeouts.notification_seconds, 30);
    assert_eq!(
        config.allowed_tools,
        checkpoint_relay::driver::default_allowed_tools()
    );
    assert!(config.webhook_secret.is_empty());
}

#[test]
fn orchestrator_config_mirrors_global_settings() {
    let config = GlobalConfig::from_toml_str(MINIMAL_TOML).expect("config parses");
    let orch = config.orchestrator_config();

    assert_eq!(orch.idle_timeout, Duration::from_secs(300));
    assert_eq!(orch.hard_limit, Duration::from_secs(1800));
    assert_eq!(orch.model, config.model);
    assert_eq!(orch.allowed_tools, config.allowed_tools);
    assert_eq!(orch.working_directory, config.workspace_dir);
}

#[test]
fn rejects_empty_host_cli() {
    let err = GlobalConfig::from_toml_str(r#"host_cli = "  ""#).expect_err("must fail");
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("host_cli")));
}

#[test]
fn rejects_missing_host_cli() {
    let err = GlobalConfig::from_toml_str("http_port = 1").expect_err("must fail");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn rejects_idle_not_below_hard_limit() {
    let raw = r#"
host_cli = "claude-agent"

[timeouts]
idle_seconds = 600
hard_limit_seconds = 600
"#;
    let err = GlobalConfig::from_toml_str(raw).expect_err("must fail");
    assert!(
        matches!(err, AppError::Config(ref msg) if msg.contains("must be less than")),
        "{err}"
    );
}

#[test]
fn rejects_zero_idle_timeout() {
    let raw = r#"
host_cli = "claude-agent"

[timeouts]
idle_seconds = 0
"#;
    assert!(GlobalConfig::from_toml_str(raw).is_err());
}

#[test]
fn rejects_zero_notification_timeout() {
    let raw = r#"
host_cli = "claude-agent"

[timeouts]
notification_seconds = 0
"#;
    assert!(GlobalConfig::from_toml_str(raw).is_err());
}

#[test]
fn sqlite_backend_requires_db_path() {
    let raw = r#"
host_cli = "claude-agent"

[rendezvous]
backend = "sqlite"
"#;
    let err = GlobalConfig::from_toml_str(raw).expect_err("must fail");
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("db_path")));
}

#[test]
fn rejects_unknown_strategy() {
    let raw = r#"
host_cli = "claude-agent"
checkpoint_strategy = "sometimes"
"#;
    assert!(GlobalConfig::from_toml_str(raw).is_err());
}

#[test]
fn webhook_secret_is_never_read_from_file() {
    let raw = r#"
host_cli = "claude-agent"
webhook_secret = "from-file"
"#;
    let config = GlobalConfig::from_toml_str(raw).expect("config parses");
    assert!(config.webhook_secret.is_empty());
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, MINIMAL_TOML).expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("config loads");
    assert_eq!(config.host_cli, "claude-agent");
}

#[test]
fn load_from_missing_path_fails() {
    let err = GlobalConfig::load_from_path("/nonexistent/checkpoint-relay.toml")
        .expect_err("must fail");
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("failed to read config")));
}
