//! Microsoft Graph calendar events (Outlook).

use crate::agents::{CapabilityAdapter, Normalized, Route};
use crate::types::HttpMethod;
use serde_json::{json, Value};
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const UPDATED_SUBJECT: &str = "Calendar invite created by AI Agent";

const RECURRENCE_GUIDANCE: &str = "\
RECURRING_EVENT is this JSON string {\"recurrence\": {\"pattern\": RECURRENCE_PATTERN, \"range\": RECURRENCE_RANGE}}.
RECURRENCE_PATTERN is a JSON object with these properties:
  type - daily, weekly, absoluteMonthly, relativeMonthly, absoluteYearly or relativeYearly. Required.
  interval - number of units between occurrences, in days, weeks, months or years depending on type. Required.
  daysOfWeek - days the event occurs on (sunday to saturday). Required for weekly, relativeMonthly and relativeYearly.
  dayOfMonth - day of the month the event occurs on. Required for absoluteMonthly and absoluteYearly.
  firstDayOfWeek - first day of the week, default sunday. Required for weekly.
  index - first, second, third, fourth or last instance of daysOfWeek in the month. Used by relativeMonthly and relativeYearly.
  month - month number from 1 to 12.
RECURRENCE_RANGE is a JSON object with these properties:
  type - endDate, noEnd or numbered. Required.
  startDate - date the pattern starts; must match the start of the event. Required.
  endDate - date the pattern stops. Required for endDate.
  numberOfOccurrences - how many times the event repeats. Required and positive for numbered.
  recurrenceTimeZone - time zone for startDate and endDate. Optional.
If ACTION creates or updates a recurring event, fill RECURRING_EVENT from ACTION and add it to REQUEST BODY. \
If ACTION also changes the time, update start.dateTime in REQUEST BODY.
If ACTION does not describe a recurring event, do not add RECURRING_EVENT to REQUEST BODY.
";

pub struct OutlookAdapter {
    capability: String,
    base_url: String,
    /// Idempotency key for event creation, fresh for every executor.
    transaction_id: String,
}

impl OutlookAdapter {
    pub fn new(capability: &str) -> Self {
        Self {
            capability: capability.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            transaction_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        self
    }
}

impl CapabilityAdapter for OutlookAdapter {
    fn capability(&self) -> &str {
        &self.capability
    }

    fn base_url(&self) -> Option<&str> {
        Some(&self.base_url)
    }

    fn contextualize(&self, narrative: &str) -> String {
        format!("{}\n\n{}", narrative, RECURRENCE_GUIDANCE)
    }

    fn prepare_body(&self, body: &mut Value, route: &Route, action_text: &str) {
        let Some(event) = body.as_object_mut() else {
            return;
        };

        let has_subject = event
            .get("subject")
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if !has_subject {
            if route.is_sub("updateEvent") {
                event.insert("subject".to_string(), json!(UPDATED_SUBJECT));
            } else if route.is_sub("createEvent") {
                event.insert("subject".to_string(), json!(action_text));
            }
        }

        if event.get("body").map(Value::is_null).unwrap_or(true) {
            let subject = event.get("subject").cloned().unwrap_or(Value::Null);
            event.insert(
                "body".to_string(),
                json!({"content": subject, "contentType": "HTML"}),
            );
        }

        if route.method == HttpMethod::Post {
            event.insert("transactionId".to_string(), json!(self.transaction_id));
        }
    }

    fn normalize(&self, response: Value, route: &Route) -> Normalized {
        if route.is_sub("listEvents") {
            let events = response
                .get("value")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            return Normalized::Records(events);
        }
        Normalized::Record(response)
    }

    fn narrative_fragment(&self, record: &Value) -> String {
        let time = |field: &str| {
            record
                .get(field)
                .and_then(|t| t.get("dateTime"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        match (time("start"), time("end")) {
            (Some(start), Some(end)) => format!(
                "The calendar event start time is {} and the end time is {}.",
                start, end
            ),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(method: HttpMethod, sub: &str) -> Route {
        Route {
            method,
            endpoint: "/me/events/{id}".to_string(),
            subcapability: Some(sub.to_string()),
        }
    }

    #[test]
    fn test_create_defaults_subject_and_body() {
        let adapter = OutlookAdapter::new("Microsoft Outlook");
        let mut body = json!({"start": {"dateTime": "2026-10-20T09:00:00"}});

        adapter.prepare_body(
            &mut body,
            &route(HttpMethod::Post, "createEvent"),
            "Book a dentist appointment",
        );

        assert_eq!(body["subject"], "Book a dentist appointment");
        assert_eq!(
            body["body"],
            json!({"content": "Book a dentist appointment", "contentType": "HTML"})
        );
        assert_eq!(body["transactionId"], json!(adapter.transaction_id));
    }

    #[test]
    fn test_update_uses_fixed_subject_without_transaction() {
        let adapter = OutlookAdapter::new("Microsoft Outlook");
        let mut body = json!({"id": "AAMk", "subject": ""});

        adapter.prepare_body(&mut body, &route(HttpMethod::Patch, "updateEvent"), "x");

        assert_eq!(body["subject"], UPDATED_SUBJECT);
        assert!(body.get("transactionId").is_none());
    }

    #[test]
    fn test_id_substitution() {
        let adapter = OutlookAdapter::new("Microsoft Outlook");
        assert_eq!(
            adapter.target_url(
                "https://graph.microsoft.com/v1.0/me/events/{id}",
                Some("AAMk"),
                &route(HttpMethod::Patch, "updateEvent")
            ),
            "https://graph.microsoft.com/v1.0/me/events/AAMk"
        );
    }

    #[test]
    fn test_list_events_normalizes_value() {
        let adapter = OutlookAdapter::new("Microsoft Outlook");
        let normalized = adapter.normalize(
            json!({"value": [{"id": "a"}]}),
            &route(HttpMethod::Get, "listEvents"),
        );
        assert_eq!(normalized, Normalized::Records(vec![json!({"id": "a"})]));
    }
}
