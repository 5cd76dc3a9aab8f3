//! Completion model abstraction and provider selection
//!
//! The delegator treats the model as a plain request/response function:
//! `(system instructions, messages) -> text`. No streaming and no function
//! calling are assumed at this layer.
//! - **Ollama**: local inference (default feature)
//! - **OpenAI**: OpenAI and compatible APIs (`openai` feature)

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Role of a message in a completion conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single conversation turn sent after the system instructions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Completion model client
///
/// Implementations must be shareable across concurrently running plans.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Complete a conversation under the given system instructions
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including Azure OpenAI and compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the provider's Cargo feature is
    /// not compiled in.
    pub async fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Arc::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "Provider '{}' is not enabled in this build. Rebuild with the '{}' feature.",
                other.name(),
                other.feature()
            ))),
        }
    }

    /// Check if this provider was compiled in
    pub fn is_enabled(&self) -> bool {
        match self {
            Provider::OpenAI { .. } => cfg!(feature = "openai"),
            Provider::Ollama { .. } => cfg!(feature = "ollama"),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    fn feature(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "openai",
            Provider::Ollama { .. } => "ollama",
        }
    }

    /// Model identifier configured for this provider
    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } => model,
            Provider::Ollama { model, .. } => model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let openai = Provider::OpenAI {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "gpt-4o-mini".to_string(),
        };
        assert_eq!(openai.name(), "OpenAI");
        assert_eq!(openai.model(), "gpt-4o-mini");

        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "llama3.2".to_string(),
        };
        assert_eq!(ollama.name(), "Ollama");
    }

    #[test]
    fn test_provider_enabled_matches_features() {
        let ollama = Provider::Ollama {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        };
        assert_eq!(ollama.is_enabled(), cfg!(feature = "ollama"));
    }

    #[cfg(not(feature = "openai"))]
    #[tokio::test]
    async fn test_disabled_provider_returns_helpful_error() {
        let provider = Provider::OpenAI {
            api_key: "test-key".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        };

        // Arc<dyn LLMClient> doesn't implement Debug
        let err = match provider.create_client().await {
            Ok(_) => panic!("Expected error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("not enabled"));
        assert!(err.contains("openai"));
    }

    #[test]
    fn test_chat_message_constructors() {
        assert_eq!(ChatMessage::user("hi").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("{}").content, "{}");
    }
}
