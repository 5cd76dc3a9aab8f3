//! Plan delegation and per-capability execution.
//!
//! The [`Delegator`] walks a plan step by step. Steps that need an external
//! system are handed to an [`Executor`] built by the [`CapabilityRegistry`];
//! everything the executor produces flows back as a [`StepOutcome`].

pub mod api_executor;
pub mod delegator;
pub mod registry;
pub mod synthesizer;

use crate::types::{AppError, CapabilityContext, FailureRecord, Result, Step};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// Re-export commonly used types
pub use api_executor::{ApiExecutor, ApiServices, CapabilityAdapter, Normalized, Route};
pub use delegator::Delegator;
pub use registry::{CapabilityRegistry, CapabilityRegistryBuilder, ExecutorFactory};
pub use synthesizer::{parse_against_template, SchemaSynthesizer};

/// Everything an executor is constructed with for a single step.
#[derive(Clone)]
pub struct ExecutorInit {
    pub step: Step,
    /// Last successful context for the step's capability, if any.
    pub carried_context: Option<CapabilityContext>,
    /// Narrative as it stood when the step started.
    pub narrative: String,
    pub synthesizer: Arc<SchemaSynthesizer>,
}

/// Result of running one executor.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Success(CapabilityContext),
    Failure(FailureRecord),
}

/// Base trait for capability executors
///
/// An executor never returns an error: every failure is folded into a
/// [`FailureRecord`] so the delegator can keep going.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, cancel: &CancellationToken) -> StepOutcome;
}

/// Race `fut` against `cancel`, mapping cancellation to [`AppError::Cancelled`].
pub async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled("plan execution was cancelled".to_string())),
        result = fut => result,
    }
}
