//! Integration tests for TOML configuration
//!
//! These tests verify that the configuration system works end-to-end:
//! - Configuration loading and validation
//! - Registry creation from config
//! - Plan execution through config-built executors

mod common;

use common::mocks::{MockDispatcher, MockLLMClient};
use delegator::types::{Classification, HttpMethod, Step};
use delegator::utils::toml_config::{ConfigError, ConfigWarningKind, DelegatorConfig};
use delegator::{CapabilityRegistry, Delegator};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const CONFIG: &str = r#"
[runtime]
request_timeout_secs = 5

[model]
type = "ollama"
model = "llama3.2"

[capabilities.Tasks]
kind = "rest"
base_url = "https://tasks.example.com/api"

[capabilities.Tasks.auth]
type = "bearer"
token_env = "PD_CFG_TASKS_TOKEN"

[capabilities.Zoom]
kind = "zoom"
enabled = false

[capabilities."Google Calendar"]
kind = "google-calendar"
"#;

#[test]
fn test_registry_from_config_skips_disabled() {
    std::env::set_var("PD_CFG_TASKS_TOKEN", "tasks-token");
    let file = write_config(CONFIG);
    let config = DelegatorConfig::load(file.path()).unwrap();

    let registry =
        CapabilityRegistry::from_config(&config, MockDispatcher::returning(json!({})), None)
            .unwrap();

    assert_eq!(
        registry.capability_names(),
        vec!["Google Calendar".to_string(), "Tasks".to_string()]
    );
    assert!(!registry.has_capability("Zoom"));
}

#[test]
fn test_warnings_for_disabled_and_unauthenticated() {
    std::env::set_var("PD_CFG_TASKS_TOKEN", "tasks-token");
    let config: DelegatorConfig = toml::from_str(CONFIG).unwrap();

    let warnings = config.validate_with_warnings().unwrap();
    let kinds: Vec<_> = warnings.iter().map(|w| w.kind.clone()).collect();

    assert!(kinds.contains(&ConfigWarningKind::DisabledCapability));
    assert!(kinds.contains(&ConfigWarningKind::UnauthenticatedCapability));
}

#[test]
fn test_google_drive_kind_registers() {
    let file = write_config(
        r#"
[model]
type = "ollama"
model = "llama3.2"

[capabilities."Google Drive"]
kind = "google-drive"
base_url = "https://drive.example.com/drive/v3"
"#,
    );
    let config = DelegatorConfig::load(file.path()).unwrap();

    let registry =
        CapabilityRegistry::from_config(&config, MockDispatcher::returning(json!({})), None)
            .unwrap();
    assert!(registry.has_capability("Google Drive"));
}

#[test]
fn test_missing_secret_fails_load() {
    let file = write_config(
        r#"
[model]
type = "ollama"
model = "llama3.2"

[capabilities.Secure]
kind = "rest"

[capabilities.Secure.auth]
type = "bearer"
token_env = "PD_CFG_DEFINITELY_UNSET"
"#,
    );

    match DelegatorConfig::load(file.path()) {
        Err(ConfigError::MissingEnvVar(name)) => assert_eq!(name, "PD_CFG_DEFINITELY_UNSET"),
        other => panic!("expected missing env var, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unknown_kind_is_parse_error() {
    let file = write_config(
        r#"
[model]
type = "ollama"
model = "llama3.2"

[capabilities.Fax]
kind = "fax-machine"
"#,
    );

    assert!(matches!(
        DelegatorConfig::load(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[tokio::test]
async fn test_plan_runs_through_config_registry() {
    std::env::set_var("PD_CFG_TASKS_TOKEN", "tasks-token");
    let config: DelegatorConfig = toml::from_str(CONFIG).unwrap();
    config.validate().unwrap();

    let dispatcher = MockDispatcher::returning(json!({"id": "t1", "created": "2026-10-19"}));
    let registry = CapabilityRegistry::from_config(&config, dispatcher.clone(), None).unwrap();
    let llm = MockLLMClient::replying(&[r#"{"title":"Write report"}"#]);

    let step = Step::new("1", "Add a task to write the report", Classification::Operation)
        .with_capability("Tasks")
        .with_route(HttpMethod::Post, "/tasks")
        .with_schema(r#"{"title": ""}"#);
    let result = Delegator::new(llm, Arc::new(registry))
        .run(vec![step], "")
        .await;

    assert!(result.failures.is_empty());
    assert_eq!(
        result.narrative,
        "The Tasks id is t1. The Tasks created is 2026-10-19. "
    );

    let requests = dispatcher.requests();
    assert_eq!(requests[0].url, "https://tasks.example.com/api/tasks");
    assert_eq!(requests[0].bearer.as_deref(), Some("tasks-token"));
}
