//! Plain JSON REST APIs with no provider quirks.

use crate::agents::{CapabilityAdapter, Normalized, Route};
use serde_json::Value;

/// Fields worth repeating in the narrative when a response carries them.
const IDENTIFYING_FIELDS: &[&str] = &["id", "join_url", "htmlLink", "start", "end", "created"];

pub struct GenericRestAdapter {
    capability: String,
    base_url: Option<String>,
}

impl GenericRestAdapter {
    pub fn new(capability: &str) -> Self {
        Self {
            capability: capability.to_string(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }
}

impl CapabilityAdapter for GenericRestAdapter {
    fn capability(&self) -> &str {
        &self.capability
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn normalize(&self, response: Value, route: &Route) -> Normalized {
        if !route.is_sub("list") {
            return Normalized::Record(response);
        }
        match response {
            Value::Array(records) => Normalized::Records(records),
            other => Normalized::Records(
                other
                    .get("items")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            ),
        }
    }

    fn narrative_fragment(&self, record: &Value) -> String {
        IDENTIFYING_FIELDS
            .iter()
            .filter_map(|field| {
                let value = match record.get(*field)? {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some(format!("The {} {} is {}. ", self.capability, field, value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;
    use serde_json::json;

    fn list_route() -> Route {
        Route {
            method: HttpMethod::Get,
            endpoint: "/events".to_string(),
            subcapability: Some("list".to_string()),
        }
    }

    #[test]
    fn test_list_accepts_bare_array_and_items() {
        let adapter = GenericRestAdapter::new("Cal");
        assert_eq!(
            adapter.normalize(json!([{"id": 1}]), &list_route()),
            Normalized::Records(vec![json!({"id": 1})])
        );
        assert_eq!(
            adapter.normalize(json!({"items": [{"id": 2}]}), &list_route()),
            Normalized::Records(vec![json!({"id": 2})])
        );
    }

    #[test]
    fn test_fragment_lists_identifying_fields() {
        let adapter = GenericRestAdapter::new("Cal");
        let fragment = adapter.narrative_fragment(&json!({"id": "123", "title": "Meeting"}));
        assert_eq!(fragment, "The Cal id is 123. ");
    }

    #[test]
    fn test_fragment_empty_for_non_object() {
        let adapter = GenericRestAdapter::new("Cal");
        assert_eq!(adapter.narrative_fragment(&Value::Null), "");
    }
}
