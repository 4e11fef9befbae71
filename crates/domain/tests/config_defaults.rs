use tg_domain::config::{Config, SESSION_ID_PREFIX};

#[test]
fn default_lookup_timeout_is_ninety_seconds() {
    let config = Config::default();
    assert_eq!(config.sessions.lookup_timeout_secs, 90);
}

#[test]
fn default_prefix_matches_session_ids() {
    let config = Config::default();
    assert_eq!(config.sessions.server_name_prefix, SESSION_ID_PREFIX);
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[worker]
name = "edge-eu-1"

[sessions]
lookup_timeout_secs = 30
sweep_interval_secs = 15
pending_grace_secs = 120

[controller]
initial_delay_ms = 250
max_delay_ms = 10000
max_attempts = 8

[logging]
filter = "tg_sessions=trace,info"
json = false
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.worker.name, "edge-eu-1");
    assert_eq!(config.sessions.lookup_timeout_secs, 30);
    assert_eq!(config.sessions.rpc_timeout_secs, 90);
    assert_eq!(config.controller.max_attempts, 8);
    assert!(!config.logging.json);
    assert!(config.validate().is_empty());
}

#[test]
fn logging_defaults_to_json_info() {
    let config = Config::default();
    assert!(config.logging.json);
    assert_eq!(config.logging.filter, "info");
}
