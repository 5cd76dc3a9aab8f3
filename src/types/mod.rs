use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::retrieval::RetrievalMatch;

// ============= Plan Types =============

/// Planner classification of a step.
///
/// Accepts both the kebab-case names and the upper-case phrases the planner
/// emits (`"INFORMATION ANALYSIS"`, `"OPERATIONS"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    #[serde(alias = "INTERNAL INFORMATION RETRIEVAL")]
    InformationRetrieval,
    #[serde(alias = "INFORMATION ANALYSIS")]
    InformationAnalysis,
    #[serde(alias = "DOCUMENT INFORMATION EXTRACTION")]
    DocumentExtraction,
    #[serde(alias = "OPERATIONS")]
    Operation,
    #[serde(alias = "USER INPUT")]
    UserInput,
    #[serde(alias = "EXTERNAL INFORMATION RETRIEVAL")]
    ExternalRetrieval,
}

/// HTTP method carried by a step's routing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Methods that act on a resource which already exists.
    pub fn mutates_existing(&self) -> bool {
        matches!(self, HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete)
    }

    /// Pure creation. Identifier substitution never applies.
    pub fn is_creation(&self) -> bool {
        matches!(self, HttpMethod::Post)
    }

    /// Whether the request body is sent on the wire.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "get" | "list" => Ok(HttpMethod::Get),
            "post" | "create" | "insert" => Ok(HttpMethod::Post),
            "put" | "update" => Ok(HttpMethod::Put),
            "patch" => Ok(HttpMethod::Patch),
            "delete" => Ok(HttpMethod::Delete),
            "head" => Ok(HttpMethod::Head),
            "options" => Ok(HttpMethod::Options),
            "trace" => Ok(HttpMethod::Trace),
            other => Err(AppError::InvalidInput(format!(
                "Unknown HTTP method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Deserialize an optional method, treating blank or unknown values as absent.
///
/// A step with an unusable method takes the no-route path instead of
/// rejecting the whole plan.
pub fn lenient_method<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<HttpMethod>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw.parse() {
        Ok(method) => Some(method),
        Err(_) => {
            if !raw.trim().is_empty() {
                tracing::debug!(method = %raw, "Ignoring unrecognized HTTP method");
            }
            None
        }
    }))
}

/// One unit of a planner-produced action plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default, alias = "index")]
    pub id: String,
    #[serde(alias = "action")]
    pub action_text: String,
    #[serde(alias = "type")]
    pub classification: Classification,
    #[serde(
        default,
        alias = "finalTool",
        alias = "final_tool",
        skip_serializing_if = "Option::is_none"
    )]
    pub capability: Option<String>,
    #[serde(
        default,
        alias = "schemaMethod",
        alias = "schema_method",
        deserialize_with = "lenient_method",
        skip_serializing_if = "Option::is_none"
    )]
    pub http_method: Option<HttpMethod>,
    #[serde(
        default,
        alias = "schemaEndpoint",
        alias = "schema_endpoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint: Option<String>,
    #[serde(
        default,
        alias = "schemaSubtool",
        alias = "schema_subtool",
        skip_serializing_if = "Option::is_none"
    )]
    pub subcapability: Option<String>,
    #[serde(
        default,
        alias = "schemaSchema",
        alias = "schema",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_schema_template: Option<String>,
    /// Planner operation tag; `"NONE"` marks a step with nothing to execute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl Step {
    /// Create a step with only the required fields set.
    pub fn new(id: &str, action_text: &str, classification: Classification) -> Self {
        Self {
            id: id.to_string(),
            action_text: action_text.to_string(),
            classification,
            capability: None,
            http_method: None,
            endpoint: None,
            subcapability: None,
            request_schema_template: None,
            operation: None,
        }
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capability = Some(capability.to_string());
        self
    }

    pub fn with_route(mut self, method: HttpMethod, endpoint: &str) -> Self {
        self.http_method = Some(method);
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_subcapability(mut self, subcapability: &str) -> Self {
        self.subcapability = Some(subcapability.to_string());
        self
    }

    pub fn with_schema(mut self, template: &str) -> Self {
        self.request_schema_template = Some(template.to_string());
        self
    }

    pub fn is_noop(&self) -> bool {
        self.operation
            .as_deref()
            .map(|op| op.eq_ignore_ascii_case("none"))
            .unwrap_or(false)
    }
}

/// Plan input accepted by the CLI: either a bare array or `{ "steps": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlanInput {
    Steps(Vec<Step>),
    Wrapped { steps: Vec<Step> },
}

impl PlanInput {
    pub fn into_steps(self) -> Vec<Step> {
        match self {
            PlanInput::Steps(steps) => steps,
            PlanInput::Wrapped { steps } => steps,
        }
    }
}

// ============= Context Types =============

/// Last successful structured outcome for one capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityContext {
    pub narrative_fragment: String,
    /// Seed schema for the next mutating step against the same capability.
    pub serialized_request_body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_match: Option<RetrievalMatch>,
}

// ============= Result Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Synthesis,
    Dispatch,
    Authentication,
    Cancelled,
}

impl FailureKind {
    pub fn from_error(error: &AppError) -> Self {
        match error {
            AppError::Auth(_) => FailureKind::Authentication,
            AppError::Cancelled(_) => FailureKind::Cancelled,
            AppError::Synthesis(_) | AppError::LLM(_) => FailureKind::Synthesis,
            _ => FailureKind::Dispatch,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Synthesis => "synthesis",
            FailureKind::Dispatch => "dispatch",
            FailureKind::Authentication => "authentication",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

/// Immutable record of one failed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub step_action_text: String,
    pub capability: String,
    pub kind: FailureKind,
    pub raw_model_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_request_body: Option<serde_json::Value>,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_match: Option<RetrievalMatch>,
}

/// Aggregated outcome of one plan execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub steps: Vec<Step>,
    pub narrative: String,
    pub per_capability_state: BTreeMap<String, CapabilityContext>,
    pub failures: Vec<FailureRecord>,
    /// Absent when the last step produced no terminal artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
