//! Integration tests for configuration management
//!
//! These tests load real TOML files from disk and check defaults,
//! validation and path handling.

use courtside_engine::config::Config;
use sdk::errors::EngineError;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_full_config_from_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("stats.db");

    let body = format!(
        r#"
[core]
log_level = "debug"

[llm]
default_provider = "ollama"
request_timeout_secs = 30

[llm.ollama]
base_url = "http://gpu-box:11434"
model = "llama3.1:70b"

[llm.openai]
model = "gpt-4o-mini"
api_key_env = "COURTSIDE_OPENAI_KEY"

[database]
path = "{}"
top_k = 10
max_rows = 25

[assistant]
memory_window = 6
max_retries = 2
max_sub_queries = 4
sub_query_timeout_secs = 45
format_answers = true
max_threads = 50

[server]
host = "0.0.0.0"
port = 8080
allowed_origins = ["http://localhost:3000", "https://stats.example.edu"]
"#,
        db_path.display()
    );
    let path = write_config(&dir, &body);

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "ollama");
    assert_eq!(config.llm.request_timeout_secs, 30);
    assert_eq!(config.llm.ollama.model, "llama3.1:70b");
    assert_eq!(config.llm.openai.api_key_env, "COURTSIDE_OPENAI_KEY");
    assert_eq!(config.database.path, db_path);
    assert_eq!(config.database.top_k, 10);
    assert_eq!(config.assistant.memory_window, 6);
    assert_eq!(config.assistant.max_retries, 2);
    assert_eq!(config.assistant.sub_query_timeout_secs, 45);
    assert!(config.assistant.format_answers);
    assert_eq!(config.assistant.max_threads, 50);
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.allowed_origins.len(), 2);
}

#[test]
fn test_sections_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[core]\nlog_level = \"warn\"\n");

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "warn");
    assert_eq!(config.llm.default_provider, "openai");
    assert_eq!(config.assistant.home_team, "UC Davis");
    assert_eq!(config.assistant.max_retries, 3);
    assert_eq!(config.assistant.memory_window, 10);
    assert_eq!(config.assistant.max_threads, 1000);
    assert!(config
        .assistant
        .teams
        .iter()
        .any(|t| t == "UC Santa Barbara"));
    assert_eq!(config.server.port, 5001);
}

#[test]
fn test_loading_touches_nothing_on_disk() {
    let dir = TempDir::new().unwrap();
    let body = format!(
        "[database]\npath = \"{}\"\n",
        dir.path().join("stats.db").display()
    );
    let path = write_config(&dir, &body);

    Config::load_from_path(&path).unwrap();

    let entries: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("config.toml")]);
}

#[test]
fn test_zero_max_threads_rejected() {
    assert!(matches!(
        Config::from_toml_str("[assistant]\nmax_threads = 0\n"),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_invalid_provider_rejected() {
    let err = Config::from_toml_str("[llm]\ndefault_provider = \"gemini\"\n").unwrap_err();
    match err {
        EngineError::Config(msg) => assert!(msg.contains("gemini")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_zero_retries_rejected() {
    assert!(matches!(
        Config::from_toml_str("[assistant]\nmax_retries = 0\n"),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_home_team_must_be_known() {
    let toml = r#"
[assistant]
home_team = "Gonzaga"
teams = ["UC Davis", "UC Irvine"]
"#;
    let err = Config::from_toml_str(toml).unwrap_err();
    assert!(err.to_string().contains("Gonzaga"));
}

#[test]
fn test_conference_average_is_reserved() {
    let toml = r#"
[assistant]
teams = ["UC Davis", "Conference Average"]
"#;
    assert!(Config::from_toml_str(toml).is_err());
}

#[test]
fn test_malformed_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[core\nlog_level = ");
    assert!(matches!(
        Config::load_from_path(&path),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
