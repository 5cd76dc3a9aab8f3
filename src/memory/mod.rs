//! Plan-scoped context management.
//!
//! This module provides:
//! - [`PlanContext`], the narrative and per-capability state owned by the
//!   delegator for the duration of one plan execution
//! - The date/time-zone preamble prepended to the narrative so completion
//!   calls can resolve relative dates ("next Friday")
//!
//! Nothing here is persisted. Callers wanting multi-turn continuity rebuild a
//! `PlanContext` from a previous [`PlanResult`](crate::types::PlanResult).

use crate::types::{CapabilityContext, PlanResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Prefix applied to reasoning-only answers when appended to the narrative.
pub const AI_RESPONSE_PREFIX: &str = "AI_RESPONSE is ";

/// Mutable state threaded between the steps of one plan.
///
/// The narrative only ever grows. Capability slots are replaced wholesale,
/// never merged.
#[derive(Debug, Clone, Default)]
pub struct PlanContext {
    narrative: String,
    per_capability_state: BTreeMap<String, CapabilityContext>,
}

impl PlanContext {
    /// Start a fresh context with the given initial narrative.
    pub fn new(initial_narrative: &str) -> Self {
        Self {
            narrative: initial_narrative.to_string(),
            per_capability_state: BTreeMap::new(),
        }
    }

    /// Resume from the narrative and capability state of an earlier run.
    pub fn with_state(
        narrative: &str,
        per_capability_state: BTreeMap<String, CapabilityContext>,
    ) -> Self {
        Self {
            narrative: narrative.to_string(),
            per_capability_state,
        }
    }

    /// Resume from a previous plan result.
    pub fn resume(previous: &PlanResult) -> Self {
        Self::with_state(&previous.narrative, previous.per_capability_state.clone())
    }

    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    pub fn append_narrative(&mut self, fragment: &str) {
        self.narrative.push_str(fragment);
    }

    /// Append a reasoning-only answer using the `AI_RESPONSE is` convention.
    pub fn append_ai_response(&mut self, response: &str) {
        self.narrative.push_str(AI_RESPONSE_PREFIX);
        self.narrative.push_str(response);
    }

    pub fn capability_context(&self, capability: &str) -> Option<&CapabilityContext> {
        self.per_capability_state.get(capability)
    }

    /// Replace the slot for `capability` and append its narrative fragment.
    pub fn record_success(&mut self, capability: &str, context: CapabilityContext) {
        self.narrative.push_str(&context.narrative_fragment);
        self.per_capability_state
            .insert(capability.to_string(), context);
    }

    pub fn per_capability_state(&self) -> &BTreeMap<String, CapabilityContext> {
        &self.per_capability_state
    }

    pub fn into_parts(self) -> (String, BTreeMap<String, CapabilityContext>) {
        (self.narrative, self.per_capability_state)
    }
}

/// Build the date preamble added ahead of caller-supplied context.
///
/// # Example
/// ```ignore
/// let preamble = date_preamble(Utc::now(), "America/Los_Angeles");
/// // "TODAY is October 19, 2026.\nThe TIME is 00:00.\nTimezone is America/Los_Angeles.\n..."
/// ```
pub fn date_preamble(now: DateTime<Utc>, time_zone: &str) -> String {
    format!(
        "TODAY is {}.\n\
         The TIME is 00:00.\n\
         Timezone is {}.\n\
         All timezones should map to IANA Time Zone id for timezone values. \
         If an end time is not specified then the default end time should be at least 30 minutes later than start time.\n\
         Calculate dates using TODAY as a reference.\n\
         Make sure the date is on the day of the week described in ACTION.\n",
        now.format("%B %-d, %Y"),
        time_zone
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx(fragment: &str, body: &str) -> CapabilityContext {
        CapabilityContext {
            narrative_fragment: fragment.to_string(),
            serialized_request_body: body.to_string(),
            retrieval_match: None,
        }
    }

    #[test]
    fn test_narrative_is_append_only() {
        let mut context = PlanContext::new("start. ");
        context.append_ai_response("Tuesday");
        context.append_narrative(" more");

        assert_eq!(context.narrative(), "start. AI_RESPONSE is Tuesday more");
    }

    #[test]
    fn test_record_success_overwrites_slot() {
        let mut context = PlanContext::new("");
        context.record_success("Cal", ctx("first. ", r#"{"id":"1","title":"a"}"#));
        context.record_success("Cal", ctx("second. ", r#"{"id":"2"}"#));

        assert_eq!(context.per_capability_state().len(), 1);
        assert_eq!(
            context.capability_context("Cal").unwrap(),
            &ctx("second. ", r#"{"id":"2"}"#)
        );
        assert_eq!(context.narrative(), "first. second. ");
    }

    #[test]
    fn test_resume_from_previous_result() {
        let mut state = BTreeMap::new();
        state.insert("Zoom".to_string(), ctx("zoom. ", "{}"));
        let previous = PlanResult {
            steps: vec![],
            narrative: "earlier".to_string(),
            per_capability_state: state,
            failures: vec![],
            final_response: None,
        };

        let context = PlanContext::resume(&previous);
        assert_eq!(context.narrative(), "earlier");
        assert!(context.capability_context("Zoom").is_some());
    }

    #[test]
    fn test_date_preamble_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap();
        let preamble = date_preamble(now, "America/Los_Angeles");

        assert!(preamble.starts_with("TODAY is October 19, 2026."));
        assert!(preamble.contains("Timezone is America/Los_Angeles."));
    }
}
