//! Init command implementation
//!
//! Scaffolds a starter delegator.toml, an .env.example and a sample plan.

use super::output::Output;
use std::fs;
use std::path::Path;

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (delegator.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: std::path::PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Completion model provider to configure (ollama or openai)
    pub provider: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing plan-delegator");

    let base_path = &config.path;

    let config_path = base_path.join("delegator.toml");
    if config_path.exists() && !config.force {
        output.warning("delegator.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    output.subheader("Creating files");

    let files = [
        ("config", "delegator.toml", generate_delegator_toml(&config)),
        ("env", ".env.example", generate_env_example(&config)),
        ("plan", "plan.example.json", generate_plan_example()),
    ];

    for (file_type, name, content) in &files {
        match write_file(&base_path.join(name), content, config.force) {
            Ok(true) => output.created(file_type, name),
            Ok(false) => output.skipped(name, "already exists"),
            Err(e) => {
                output.error(&format!("Failed to create {}: {}", name, e));
                return InitResult::Error(e.to_string());
            }
        }
    }

    output.complete("plan-delegator initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.newline();

    if config.provider == "ollama" {
        output.info("2. Start Ollama (if not running):");
        output.command("ollama serve");
        output.command("ollama pull llama3.2  # or your preferred model");
        output.newline();
    }

    output.info("3. Run the sample plan:");
    output.command("plan-delegator run plan.example.json -o result.json");

    output.hint("Capabilities are declared under [capabilities.<name>] in delegator.toml");

    InitResult::Success
}

/// Writes `content` unless the file exists and `force` is off; reports whether it wrote.
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_delegator_toml(config: &InitConfig) -> String {
    let model_section = if config.provider == "openai" {
        r#"# OpenAI API (set OPENAI_API_KEY in .env)
[model]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "gpt-4o-mini"
"#
    } else {
        r#"# Ollama - Local inference (no API key required)
[model]
type = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2"
"#
    };

    format!(
        r#"# plan-delegator configuration

[runtime]
log_level = "info"
request_timeout_secs = 30
retrieval_top_k = 3

{model_section}
[delegator]
# Prefixes the narrative with today's date in this time zone
time_zone = "America/Los_Angeles"
context = ""

[capabilities."Google Calendar"]
kind = "google-calendar"

[capabilities."Google Calendar".auth]
type = "google-proxy"
api_key_env = "GOOGLE_PROXY_API_KEY"
refresh_token_env = "GOOGLE_REFRESH_TOKEN"

[capabilities.Zoom]
kind = "zoom"
enabled = false

[capabilities.Zoom.auth]
type = "oauth-refresh"
token_url = "https://zoom.us/oauth/token"
refresh_token_env = "ZOOM_REFRESH_TOKEN"
client_id_env = "ZOOM_CLIENT_ID"
client_secret_env = "ZOOM_CLIENT_SECRET"

[capabilities.Tasks]
kind = "rest"
base_url = "http://localhost:8080/api"
"#
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    let mut content = String::from("# plan-delegator secrets\n\n");
    if config.provider == "openai" {
        content.push_str("OPENAI_API_KEY=\n\n");
    }
    content.push_str(
        "# Google Calendar through the token proxy\n\
         GOOGLE_PROXY_API_KEY=\n\
         GOOGLE_REFRESH_TOKEN=\n\n\
         # Zoom OAuth (only needed once the capability is enabled)\n\
         ZOOM_REFRESH_TOKEN=\n\
         ZOOM_CLIENT_ID=\n\
         ZOOM_CLIENT_SECRET=\n\n\
         # Logging (overrides runtime.log_level)\n\
         RUST_LOG=info\n",
    );
    content
}

fn generate_plan_example() -> String {
    r#"{
  "steps": [
    {
      "id": "1",
      "actionText": "Pick a day next week when everyone is free",
      "classification": "information-analysis"
    },
    {
      "id": "2",
      "actionText": "Create a task for the team sync on that day",
      "classification": "operation",
      "capability": "Tasks",
      "httpMethod": "POST",
      "endpoint": "/tasks",
      "requestSchemaTemplate": "{\"title\": \"\", \"due\": \"\"}"
    }
  ]
}
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegator::types::PlanInput;
    use delegator::utils::toml_config::{CapabilityKind, DelegatorConfig, ModelConfig};
    use tempfile::TempDir;

    fn create_test_config(temp_dir: &TempDir, provider: &str) -> InitConfig {
        InitConfig {
            path: temp_dir.path().to_path_buf(),
            force: false,
            provider: provider.to_string(),
        }
    }

    #[test]
    fn test_generated_toml_parses() {
        let temp_dir = TempDir::new().unwrap();
        let config: DelegatorConfig =
            toml::from_str(&generate_delegator_toml(&create_test_config(&temp_dir, "ollama")))
                .unwrap();

        assert!(matches!(config.model, ModelConfig::Ollama { .. }));
        assert_eq!(
            config.capabilities["Google Calendar"].kind,
            CapabilityKind::GoogleCalendar
        );
        assert!(!config.capabilities["Zoom"].enabled);
        assert_eq!(config.enabled_capabilities(), vec!["Google Calendar", "Tasks"]);
    }

    #[test]
    fn test_generated_toml_openai() {
        let temp_dir = TempDir::new().unwrap();
        let config_str = generate_delegator_toml(&create_test_config(&temp_dir, "openai"));
        let config: DelegatorConfig = toml::from_str(&config_str).unwrap();

        assert!(matches!(config.model, ModelConfig::OpenAI { ref api_key_env, .. } if api_key_env == "OPENAI_API_KEY"));
        assert!(generate_env_example(&create_test_config(&temp_dir, "openai"))
            .contains("OPENAI_API_KEY="));
    }

    #[test]
    fn test_sample_plan_parses() {
        let plan: PlanInput = serde_json::from_str(&generate_plan_example()).unwrap();
        let steps = plan.into_steps();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].capability.as_deref(), Some("Tasks"));
        assert!(steps[1].request_schema_template.is_some());
    }

    #[test]
    fn test_init_creates_files() {
        let temp_dir = TempDir::new().unwrap();
        let output = Output::no_color();

        let result = run(create_test_config(&temp_dir, "ollama"), &output);

        assert!(matches!(result, InitResult::Success));
        assert!(temp_dir.path().join("delegator.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());
        assert!(temp_dir.path().join("plan.example.json").exists());
    }

    #[test]
    fn test_init_refuses_existing_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("delegator.toml"), "# mine").unwrap();

        let result = run(create_test_config(&temp_dir, "ollama"), &Output::no_color());

        assert!(matches!(result, InitResult::AlreadyExists));
        let kept = fs::read_to_string(temp_dir.path().join("delegator.toml")).unwrap();
        assert_eq!(kept, "# mine");
    }

    #[test]
    fn test_init_force_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("delegator.toml"), "# mine").unwrap();

        let mut config = create_test_config(&temp_dir, "ollama");
        config.force = true;
        let result = run(config, &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        let written = fs::read_to_string(temp_dir.path().join("delegator.toml")).unwrap();
        assert!(written.contains("[capabilities.Tasks]"));
    }

    #[test]
    fn test_write_file_skips_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");

        assert!(write_file(&path, "one", false).unwrap());
        assert!(!write_file(&path, "two", false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "one");
        assert!(write_file(&path, "three", true).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "three");
    }
}
