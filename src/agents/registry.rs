//! Capability Registry
//!
//! Maps capability names (as the planner writes them, e.g. `"Google Calendar"`)
//! to executor factories. The registry is built once, then shared read-only
//! across plan executions behind an `Arc`.
//!
//! ## Construction
//!
//! - Programmatically, via [`CapabilityRegistry::register`] or the
//!   [`CapabilityRegistryBuilder`]
//! - From the `[capabilities.*]` tables of `delegator.toml` via
//!   [`CapabilityRegistry::from_config`]

use crate::agents::api_executor::{ApiExecutor, ApiServices};
use crate::agents::{Executor, ExecutorInit};
use crate::integrations::auth::refresher_from_config;
use crate::integrations::{
    GenericRestAdapter, GoogleCalendarAdapter, GoogleDriveAdapter, HttpDispatcher, OutlookAdapter,
    ZoomAdapter,
};
use crate::retrieval::SchemaRetriever;
use crate::types::{AppError, Result};
use crate::utils::toml_config::{CapabilityKind, DelegatorConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a fresh executor for one step.
pub type ExecutorFactory = Arc<dyn Fn(ExecutorInit) -> Box<dyn Executor> + Send + Sync>;

/// Read-only lookup from capability name to executor factory
#[derive(Default)]
pub struct CapabilityRegistry {
    factories: HashMap<String, ExecutorFactory>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the enabled `[capabilities.*]` tables.
    ///
    /// Every capability shares `dispatcher` and, when given, `retriever`.
    /// Token refreshers are created per capability from its `[auth]` table.
    pub fn from_config(
        config: &DelegatorConfig,
        dispatcher: Arc<dyn HttpDispatcher>,
        retriever: Option<Arc<dyn SchemaRetriever>>,
    ) -> Result<Self> {
        let timeout = config.runtime.request_timeout();
        let mut registry = Self::new();

        for (name, capability) in &config.capabilities {
            if !capability.enabled {
                tracing::debug!(capability = %name, "Capability disabled, not registering");
                continue;
            }

            let mut services = ApiServices::new(Arc::clone(&dispatcher));
            if let Some(retriever) = &retriever {
                services =
                    services.with_retriever(Arc::clone(retriever), config.runtime.retrieval_top_k);
            }
            if let Some(auth) = &capability.auth {
                services = services.with_refresher(refresher_from_config(auth, timeout)?);
            }

            let owned_name = name.clone();
            let base_url = capability.base_url.clone();
            let factory = match capability.kind {
                CapabilityKind::GoogleCalendar => ApiExecutor::factory(
                    move || GoogleCalendarAdapter::new(&owned_name).with_base_url(base_url.clone()),
                    services,
                ),
                CapabilityKind::GoogleDrive => ApiExecutor::factory(
                    move || GoogleDriveAdapter::new(&owned_name).with_base_url(base_url.clone()),
                    services,
                ),
                CapabilityKind::Zoom => ApiExecutor::factory(
                    move || ZoomAdapter::new(&owned_name).with_base_url(base_url.clone()),
                    services,
                ),
                CapabilityKind::MicrosoftOutlook => ApiExecutor::factory(
                    move || OutlookAdapter::new(&owned_name).with_base_url(base_url.clone()),
                    services,
                ),
                CapabilityKind::Rest => ApiExecutor::factory(
                    move || GenericRestAdapter::new(&owned_name).with_base_url(base_url.clone()),
                    services,
                ),
            };

            tracing::info!(capability = %name, kind = ?capability.kind, "Registered capability");
            registry.register(name, factory);
        }

        Ok(registry)
    }

    /// Register a factory, replacing any previous one under the same name
    pub fn register(&mut self, name: &str, factory: ExecutorFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Get the factory for a capability
    pub fn get(&self, name: &str) -> Option<&ExecutorFactory> {
        self.factories.get(name)
    }

    /// Build an executor for `init.step`, if the capability is registered
    pub fn create(&self, name: &str, init: ExecutorInit) -> Option<Box<dyn Executor>> {
        self.get(name).map(|factory| factory(init))
    }

    /// Check if a capability is registered
    pub fn has_capability(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Get all registered capability names, sorted
    pub fn capability_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Builder for creating CapabilityRegistry with fluent API
#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    factories: Vec<(String, ExecutorFactory)>,
}

impl CapabilityRegistryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability factory
    pub fn with_capability(mut self, name: &str, factory: ExecutorFactory) -> Self {
        self.factories.push((name.to_string(), factory));
        self
    }

    /// Build the CapabilityRegistry
    ///
    /// Blank or duplicate capability names are rejected.
    pub fn build(self) -> Result<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        for (name, factory) in self.factories {
            if name.trim().is_empty() {
                return Err(AppError::Configuration(
                    "Capability name must not be empty".into(),
                ));
            }
            if registry.has_capability(&name) {
                return Err(AppError::Configuration(format!(
                    "Capability '{}' is registered twice",
                    name
                )));
            }
            registry.register(&name, factory);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::StepOutcome;
    use crate::types::CapabilityContext;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct NoopExecutor;

    #[async_trait]
    impl Executor for NoopExecutor {
        async fn run(&self, _cancel: &CancellationToken) -> StepOutcome {
            StepOutcome::Success(CapabilityContext::default())
        }
    }

    fn noop_factory() -> ExecutorFactory {
        Arc::new(|_init: ExecutorInit| -> Box<dyn Executor> { Box::new(NoopExecutor) })
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = CapabilityRegistry::new();
        registry.register("Zoom", noop_factory());
        registry.register("Google Calendar", noop_factory());

        assert!(registry.has_capability("Zoom"));
        assert!(registry.get("Google Calendar").is_some());
        assert!(!registry.has_capability("Slack"));
        assert_eq!(
            registry.capability_names(),
            vec!["Google Calendar".to_string(), "Zoom".to_string()]
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = CapabilityRegistryBuilder::new()
            .with_capability("Zoom", noop_factory())
            .with_capability("Zoom", noop_factory())
            .build();
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_blank_name() {
        let result = CapabilityRegistryBuilder::new()
            .with_capability("  ", noop_factory())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_builds() {
        let registry = CapabilityRegistryBuilder::new()
            .with_capability("Cal", noop_factory())
            .build()
            .unwrap();
        assert!(registry.has_capability("Cal"));
        assert!(!registry.is_empty());
    }
}
