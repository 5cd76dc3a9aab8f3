//! Delegator
//!
//! Walks a plan in order. For each step it either answers it directly with
//! the completion model, hands it to the executor registered for its
//! capability, or skips it. Step failures are collected, never fatal.

use crate::agents::registry::CapabilityRegistry;
use crate::agents::synthesizer::SchemaSynthesizer;
use crate::agents::{until_cancelled, ExecutorInit, StepOutcome};
use crate::llm::LLMClient;
use crate::memory::{date_preamble, PlanContext};
use crate::types::{Classification, FailureKind, FailureRecord, PlanResult, Step};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Orchestrates one or more plan executions
///
/// Cheap to share: every plan gets its own [`PlanContext`], so concurrent
/// runs against the same `Delegator` do not interfere.
pub struct Delegator {
    synthesizer: Arc<SchemaSynthesizer>,
    registry: Arc<CapabilityRegistry>,
    time_zone: Option<String>,
}

impl Delegator {
    pub fn new(llm: Arc<dyn LLMClient>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            synthesizer: Arc::new(SchemaSynthesizer::new(llm)),
            registry,
            time_zone: None,
        }
    }

    /// Prefix new narratives with today's date and this IANA time zone
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Create the context a fresh plan starts from
    pub fn initial_context(&self, initial_narrative: &str) -> PlanContext {
        match &self.time_zone {
            Some(tz) => PlanContext::new(&format!(
                "{}{}",
                date_preamble(Utc::now(), tz),
                initial_narrative
            )),
            None => PlanContext::new(initial_narrative),
        }
    }

    /// Execute a plan from scratch without a cancellation signal
    pub async fn run(&self, steps: Vec<Step>, initial_narrative: &str) -> PlanResult {
        let context = self.initial_context(initial_narrative);
        self.run_with_context(steps, context, &CancellationToken::new())
            .await
    }

    /// Execute a plan on top of an existing context
    ///
    /// Once `cancel` fires, the step in flight is recorded as a cancelled
    /// failure and no further steps start.
    pub async fn run_with_context(
        &self,
        steps: Vec<Step>,
        mut context: PlanContext,
        cancel: &CancellationToken,
    ) -> PlanResult {
        let mut failures: Vec<FailureRecord> = Vec::new();
        let mut outputs: HashMap<String, String> = HashMap::new();

        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(
                    remaining = steps.len() - index,
                    "Plan cancelled, skipping remaining steps"
                );
                break;
            }

            tracing::info!("Step {}: {}", index + 1, step.action_text);

            if step.classification == Classification::InformationAnalysis {
                self.analyze(step, &mut context, &mut failures, cancel).await;
                continue;
            }

            if step.classification == Classification::UserInput || step.is_noop() {
                log_skip(step);
                continue;
            }

            let capability = match step.capability.as_deref() {
                Some(name) if self.registry.has_capability(name) => name,
                _ => {
                    log_skip(step);
                    continue;
                }
            };

            let init = ExecutorInit {
                step: step.clone(),
                carried_context: context.capability_context(capability).cloned(),
                narrative: context.narrative().to_string(),
                synthesizer: Arc::clone(&self.synthesizer),
            };
            let Some(executor) = self.registry.create(capability, init) else {
                log_skip(step);
                continue;
            };

            match executor.run(cancel).await {
                StepOutcome::Success(result) => {
                    tracing::debug!(capability, "Step succeeded");
                    outputs.insert(
                        step.action_text.clone(),
                        result.serialized_request_body.clone(),
                    );
                    context.record_success(capability, result);
                }
                StepOutcome::Failure(failure) => {
                    tracing::warn!(
                        capability,
                        kind = ?failure.kind,
                        error = %failure.error,
                        "Step failed, continuing with next step"
                    );
                    failures.push(failure);
                }
            }
        }

        let final_response = steps
            .last()
            .and_then(|last| outputs.get(&last.action_text))
            .map(|raw| canonical_response(raw));

        let (narrative, per_capability_state) = context.into_parts();
        PlanResult {
            steps,
            narrative,
            per_capability_state,
            failures,
            final_response,
        }
    }

    async fn analyze(
        &self,
        step: &Step,
        context: &mut PlanContext,
        failures: &mut Vec<FailureRecord>,
        cancel: &CancellationToken,
    ) {
        tracing::info!(" - Analyzing with LLM");
        let answer = until_cancelled(
            cancel,
            self.synthesizer.ask(&step.action_text, context.narrative()),
        )
        .await;

        match answer {
            Ok(answer) => context.append_ai_response(&answer),
            Err(error) => {
                tracing::warn!(error = %error, "Analysis step failed");
                failures.push(FailureRecord {
                    step_action_text: step.action_text.clone(),
                    capability: step.capability.clone().unwrap_or_default(),
                    kind: FailureKind::from_error(&error),
                    raw_model_output: String::new(),
                    attempted_request_body: None,
                    error: error.to_string(),
                    retrieval_match: None,
                });
            }
        }
    }
}

fn log_skip(step: &Step) {
    if step.classification == Classification::UserInput {
        tracing::warn!("Skipping step: user input is not supported yet");
    } else if let Some(capability) = step.capability.as_deref() {
        if !step.is_noop() {
            tracing::warn!(capability, "Skipping step: no executor registered");
        }
    }
}

/// JSON is re-serialized compactly; anything else is returned as-is.
fn canonical_response(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => value.to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_response() {
        assert_eq!(canonical_response("{ \"id\" : \"1\" }"), r#"{"id":"1"}"#);
        assert_eq!(canonical_response("plain words"), "plain words");
    }
}
