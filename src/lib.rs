//! # plan-delegator
//!
//! Delegation and schema-synthesis engine. Takes a multi-step action plan
//! produced by an upstream planner and executes it: each step is either
//! answered by the completion model, executed against a capability
//! integration, or skipped.
//!
//! ## Overview
//!
//! The delegator can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `plan-delegator` binary
//! 2. **As a library** - Embed the [`Delegator`] in your own Rust service
//!
//! ## Quick Start (Library Usage)
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! plan-delegator = "0.1"
//! ```
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use delegator::{CapabilityRegistry, Delegator, DelegatorConfig};
//! use delegator::integrations::ReqwestDispatcher;
//! use delegator::types::PlanInput;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DelegatorConfig::load("delegator.toml")?;
//!     let llm = config.model.to_provider()?.create_client().await?;
//!
//!     let dispatcher = Arc::new(ReqwestDispatcher::new(config.runtime.request_timeout())?);
//!     let registry = Arc::new(CapabilityRegistry::from_config(&config, dispatcher, None)?);
//!
//!     let plan: PlanInput = serde_json::from_str(&std::fs::read_to_string("plan.json")?)?;
//!     let result = Delegator::new(llm, registry)
//!         .run(plan.into_steps(), "")
//!         .await;
//!
//!     println!("{}", result.narrative);
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Capabilities
//!
//! ```rust,ignore
//! use delegator::agents::{ApiExecutor, ApiServices, CapabilityRegistryBuilder};
//! use delegator::integrations::GenericRestAdapter;
//!
//! let services = ApiServices::new(dispatcher);
//! let registry = CapabilityRegistryBuilder::new()
//!     .with_capability(
//!         "Tasks",
//!         ApiExecutor::factory(|| GenericRestAdapter::new("Tasks"), services),
//!     )
//!     .build()?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API and compatible endpoints |
//! | `all-llm` | Both providers |
//!
//! ## Modules
//!
//! - [`agents`] - Delegator, capability registry, schema synthesizer, executors
//! - [`integrations`] - HTTP dispatch, token refresh, provider adapters
//! - [`llm`] - Completion model clients
//! - [`memory`] - Plan-scoped narrative and capability state
//! - [`retrieval`] - Schema retrieval seam
//! - [`types`] - Plan, result and error types
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Plan delegation, capability registry and executors.
pub mod agents;
/// Outbound HTTP dispatch, authentication and provider adapters.
pub mod integrations;
/// Completion model clients and abstractions.
pub mod llm;
/// Plan-scoped narrative and per-capability context.
pub mod memory;
/// Schema retrieval for steps without routing metadata.
pub mod retrieval;
/// Core types (plan steps, results, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use agents::{CapabilityRegistry, CapabilityRegistryBuilder, Delegator, Executor};
pub use llm::{LLMClient, Provider};
pub use memory::PlanContext;
pub use types::{AppError, PlanResult, Result, Step};
pub use utils::toml_config::DelegatorConfig;
