//! Completion Model Clients
//!
//! This module provides the single completion interface the delegator needs:
//! system instructions plus a short conversation in, text out. Provider
//! specifics stay behind the [`LLMClient`] trait so plans can run against a
//! local model during development and a hosted one in production.
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use delegator::llm::{ChatMessage, Provider};
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client()
//! .await?;
//!
//! let text = client
//!     .complete("Answer tersely.", &[ChatMessage::user("What is 2+2?")])
//!     .await?;
//! ```

/// Core completion trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{ChatMessage, ChatRole, LLMClient, Provider};
