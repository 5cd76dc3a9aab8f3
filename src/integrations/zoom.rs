//! Zoom meetings API.

use crate::agents::{CapabilityAdapter, Route};
use crate::types::CapabilityContext;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://api.zoom.us/v2";
const ZOOM_ICON_URI: &str =
    "https://lh3.googleusercontent.com/pw/AM-JKLUkiyTEgH-6DiQP85RGtd_BORvAuFnS9katNMgwYQBJUTiDh12qtQxMJFWYH2Dj30hNsNUrr-kzKMl7jX-Qd0FR7JmVSx-Fhruf8xTPPI-wdsMYez6WJE7tz7KmqsORKBEnBTiILtMJXuMvphqKdB9X=s128-no";

pub struct ZoomAdapter {
    capability: String,
    base_url: String,
}

impl ZoomAdapter {
    pub fn new(capability: &str) -> Self {
        Self {
            capability: capability.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        self
    }
}

impl CapabilityAdapter for ZoomAdapter {
    fn capability(&self) -> &str {
        &self.capability
    }

    fn base_url(&self) -> Option<&str> {
        Some(&self.base_url)
    }

    /// Only reuse a body that was produced for this capability.
    fn reuses_prior_body(&self, prior: &CapabilityContext) -> bool {
        match &prior.retrieval_match {
            Some(matched) => matched
                .metadata
                .capability
                .as_deref()
                .map(|name| name == self.capability)
                .unwrap_or(true),
            None => true,
        }
    }

    fn target_url(&self, url: &str, id: Option<&str>, route: &Route) -> String {
        let existing = route.is_sub("update") || route.is_sub("get") || route.is_sub("delete");
        match id {
            Some(id) if url.contains("{id}") && !route.method.is_creation() => {
                url.replace("{id}", id)
            }
            Some(id) if existing => format!("{}/{}", url.trim_end_matches('/'), id),
            _ => url.to_string(),
        }
    }

    fn narrative_fragment(&self, record: &Value) -> String {
        let field = |name: &str| match record.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "unknown".to_string(),
            Some(other) => other.to_string(),
        };

        format!(
            "The ZOOM MEETING has a meeting id of {}.\n\
             The ZOOM MEETING meeting link is {}.\n\
             The host of the ZOOM MEETING is {}.\n\
             The name of the ZOOM MEETING is Zoom meeting.\n\
             The icon uri or url of the ZOOM MEETING is {}\n\
             The ZOOM MEETING is a video meeting.\n\
             The ZOOM MEETING has been referenced.\n",
            field("id"),
            field("join_url"),
            field("host_email"),
            ZOOM_ICON_URI
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{MatchMetadata, RetrievalMatch};
    use crate::types::HttpMethod;
    use serde_json::json;

    fn prior_with_match(capability: Option<&str>) -> CapabilityContext {
        CapabilityContext {
            narrative_fragment: String::new(),
            serialized_request_body: r#"{"id":1}"#.to_string(),
            retrieval_match: Some(RetrievalMatch {
                id: "m".to_string(),
                score: 0.9,
                metadata: MatchMetadata {
                    capability: capability.map(str::to_string),
                    ..Default::default()
                },
            }),
        }
    }

    #[test]
    fn test_reuse_requires_same_capability() {
        let adapter = ZoomAdapter::new("Zoom");
        assert!(adapter.reuses_prior_body(&prior_with_match(Some("Zoom"))));
        assert!(!adapter.reuses_prior_body(&prior_with_match(Some("Google Calendar"))));
        assert!(adapter.reuses_prior_body(&prior_with_match(None)));
    }

    #[test]
    fn test_target_url_for_meeting_update() {
        let adapter = ZoomAdapter::new("Zoom");
        let route = Route {
            method: HttpMethod::Patch,
            endpoint: "/meetings".to_string(),
            subcapability: Some("update".to_string()),
        };
        assert_eq!(
            adapter.target_url("https://api.zoom.us/v2/meetings", Some("85746065"), &route),
            "https://api.zoom.us/v2/meetings/85746065"
        );
    }

    #[test]
    fn test_fragment_describes_meeting() {
        let adapter = ZoomAdapter::new("Zoom");
        let fragment = adapter.narrative_fragment(&json!({
            "id": 85746065,
            "join_url": "https://zoom.us/j/85746065",
            "host_email": "host@example.com"
        }));

        assert!(fragment.contains("meeting id of 85746065"));
        assert!(fragment.contains("https://zoom.us/j/85746065"));
        assert!(fragment.contains("host@example.com"));
        assert!(fragment.contains("The ZOOM MEETING has been referenced."));
    }
}
