//! TOML-based configuration for the plan delegator
//!
//! This module provides declarative configuration for the completion model,
//! runtime limits, and the capability integrations via a TOML file
//! (`delegator.toml`). Secrets are never stored in the file; it names the
//! environment variables that hold them.

use crate::integrations::auth::DEFAULT_GOOGLE_TOKEN_URL;
use crate::llm::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from delegator.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegatorConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Completion model used for synthesis and analysis steps
    pub model: ModelConfig,

    #[serde(default)]
    pub delegator: DelegatorSettings,

    /// Capability integrations keyed by the name the planner uses
    #[serde(default)]
    pub capabilities: BTreeMap<String, CapabilityConfig>,
}

// ============= Runtime Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Timeout applied to every outbound HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Candidates requested from the schema retriever
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retrieval_top_k() -> usize {
    3
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
            retrieval_top_k: default_retrieval_top_k(),
        }
    }
}

impl RuntimeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl ModelConfig {
    /// Resolve secrets and produce a provider ready to build a client
    pub fn to_provider(&self) -> Result<Provider, ConfigError> {
        match self {
            ModelConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            ModelConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => Ok(Provider::OpenAI {
                api_key: resolve_required_env(api_key_env)?,
                api_base: api_base.clone(),
                model: model.clone(),
            }),
        }
    }
}

// ============= Delegator Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegatorSettings {
    /// IANA time zone; enables the date preamble when set
    #[serde(default)]
    pub time_zone: Option<String>,

    /// Extra context prepended to every plan's narrative
    #[serde(default)]
    pub context: String,
}

// ============= Capability Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
    GoogleCalendar,
    GoogleDrive,
    Zoom,
    MicrosoftOutlook,
    Rest,
}

impl CapabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::GoogleCalendar => "google-calendar",
            CapabilityKind::GoogleDrive => "google-drive",
            CapabilityKind::Zoom => "zoom",
            CapabilityKind::MicrosoftOutlook => "microsoft-outlook",
            CapabilityKind::Rest => "rest",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityConfig {
    pub kind: CapabilityKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overrides the provider's default base URL
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

fn default_true() -> bool {
    true
}

/// How a capability obtains its access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// Static token read from the environment
    Bearer { token_env: String },

    /// Google refresh token exchanged through an API-key protected proxy
    GoogleProxy {
        #[serde(default = "default_google_token_url")]
        token_url: String,
        api_key_env: String,
        refresh_token_env: String,
    },

    /// Standard OAuth2 refresh-token grant
    OauthRefresh {
        token_url: String,
        refresh_token_env: String,
        #[serde(default)]
        client_id_env: Option<String>,
        #[serde(default)]
        client_secret_env: Option<String>,
        #[serde(default)]
        client_auth: ClientAuthPlacement,
    },
}

fn default_google_token_url() -> String {
    DEFAULT_GOOGLE_TOKEN_URL.to_string()
}

/// Where OAuth client credentials go in the token request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuthPlacement {
    #[default]
    Basic,
    Body,
}

impl AuthConfig {
    fn env_vars(&self) -> Vec<&str> {
        match self {
            AuthConfig::Bearer { token_env } => vec![token_env.as_str()],
            AuthConfig::GoogleProxy {
                api_key_env,
                refresh_token_env,
                ..
            } => vec![api_key_env.as_str(), refresh_token_env.as_str()],
            AuthConfig::OauthRefresh {
                refresh_token_env,
                client_id_env,
                client_secret_env,
                ..
            } => {
                let mut vars = vec![refresh_token_env.as_str()];
                vars.extend(client_id_env.as_deref());
                vars.extend(client_secret_env.as_deref());
                vars
            }
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    DisabledCapability,
    UnauthenticatedCapability,
    NoCapabilities,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl DelegatorConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: DelegatorConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "runtime.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.runtime.retrieval_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "runtime.retrieval_top_k must be greater than zero".to_string(),
            ));
        }

        if let ModelConfig::OpenAI { api_key_env, .. } = &self.model {
            self.validate_env_var(api_key_env)?;
        }

        if let Some(tz) = &self.delegator.time_zone {
            if tz.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "delegator.time_zone must not be empty when set".to_string(),
                ));
            }
        }

        for (name, capability) in &self.capabilities {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Capability names must not be empty".to_string(),
                ));
            }
            if !capability.enabled {
                continue;
            }

            if let Some(base_url) = &capability.base_url {
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    return Err(ConfigError::ValidationError(format!(
                        "Capability '{}' base_url must be an http(s) URL, got '{}'",
                        name, base_url
                    )));
                }
            }

            if let Some(auth) = &capability.auth {
                if let AuthConfig::OauthRefresh {
                    client_id_env,
                    client_secret_env,
                    ..
                } = auth
                {
                    if client_id_env.is_some() != client_secret_env.is_some() {
                        return Err(ConfigError::ValidationError(format!(
                            "Capability '{}' must set both client_id_env and client_secret_env, or neither",
                            name
                        )));
                    }
                }
                for var in auth.env_vars() {
                    self.validate_env_var(var)?;
                }
            }
        }

        Ok(())
    }

    /// Validate configuration with warnings for suspicious but legal setups
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();

        if self.capabilities.is_empty() {
            warnings.push(ConfigWarning {
                kind: ConfigWarningKind::NoCapabilities,
                message: "No capabilities are configured; only analysis steps will run"
                    .to_string(),
            });
        }

        for (name, capability) in &self.capabilities {
            if !capability.enabled {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::DisabledCapability,
                    message: format!("Capability '{}' is disabled", name),
                });
            } else if capability.auth.is_none() && capability.kind != CapabilityKind::Rest {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::UnauthenticatedCapability,
                    message: format!(
                        "Capability '{}' ({}) has no [auth] table; requests will be unauthenticated",
                        name,
                        capability.kind.as_str()
                    ),
                });
            }
        }

        Ok(warnings)
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        resolve_required_env(name).map(|_| ())
    }

    /// Names of enabled capabilities
    pub fn enabled_capabilities(&self) -> Vec<&str> {
        self.capabilities
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn resolve_required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}
