//! Google Calendar events API.

use crate::agents::api_executor::body_as_query;
use crate::agents::{CapabilityAdapter, Normalized, Route};
use crate::types::HttpMethod;
use serde_json::{json, Value};
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_SUMMARY: &str = "Calendar invite created by AI Agent";

pub struct GoogleCalendarAdapter {
    capability: String,
    base_url: String,
    /// Google Meet create-request id, fresh for every executor.
    meet_request_id: String,
}

impl GoogleCalendarAdapter {
    pub fn new(capability: &str) -> Self {
        Self {
            capability: capability.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            meet_request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        self
    }

    fn targets_existing_event(route: &Route) -> bool {
        route.is_sub("update") || route.is_sub("get") || route.is_sub("delete")
    }
}

impl CapabilityAdapter for GoogleCalendarAdapter {
    fn capability(&self) -> &str {
        &self.capability
    }

    fn base_url(&self) -> Option<&str> {
        Some(&self.base_url)
    }

    fn contextualize(&self, narrative: &str) -> String {
        format!(
            "The ZOOM MEETING has not been referenced.\n\
             {narrative}\n\
             If The ZOOM MEETING has not been referenced do not add CONFERENCE_DATA to REQUEST BODY.\n\
             If The ZOOM MEETING has been referenced then CONFERENCE_DATA is this JSON string \
             {{\"conferenceData\": {{\"conferenceSolution\": {{\"key\": {{\"type\": \"addOn\"}}, \"name\": \"Zoom Meeting\", \"iconUri\": \"\"}}, \
             \"entryPoints\": [{{\"entryPointType\": \"video\", \"uri\": \"\"}}]}}}}. \
             Fill CONFERENCE_DATA from what is known about The ZOOM MEETING, without a signature field, \
             then add it to REQUEST BODY and keep REQUEST BODY valid JSON.\n\
             If ACTION wants to add Google Meet to the event then MEET_DATA is \
             \"conferenceData\": {{\"createRequest\": {{\"requestId\": \"{request_id}\"}}}}. \
             Add MEET_DATA to REQUEST BODY. Otherwise do not add MEET_DATA.\n",
            narrative = narrative,
            request_id = self.meet_request_id,
        )
    }

    fn prepare_body(&self, body: &mut Value, route: &Route, _action_text: &str) {
        let Some(event) = body.as_object_mut() else {
            return;
        };

        if let Some(Value::Array(attendees)) = event.get_mut("attendees") {
            attendees.retain(|attendee| {
                attendee
                    .get("email")
                    .and_then(Value::as_str)
                    .map(is_valid_email)
                    .unwrap_or(false)
            });
        }

        let keep_conference = event
            .get("conferenceData")
            .map(|data| has_addon_conference(data) || has_meet_request(data))
            .unwrap_or(false);
        if !keep_conference {
            event.remove("conferenceData");
        }

        let has_summary = event
            .get("summary")
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if route.is_sub("insert") && !has_summary {
            event.insert("summary".to_string(), json!(DEFAULT_SUMMARY));
        }
    }

    fn target_url(&self, url: &str, id: Option<&str>, route: &Route) -> String {
        match id {
            Some(id) if Self::targets_existing_event(route) => {
                if url.contains("{id}") {
                    url.replace("{id}", id)
                } else {
                    format!("{}/{}", url.trim_end_matches('/'), id)
                }
            }
            _ => url.to_string(),
        }
    }

    fn query_params(&self, body: &Value, route: &Route) -> Vec<(String, String)> {
        if route.method == HttpMethod::Get {
            return body_as_query(body);
        }

        let mut params = vec![("conferenceDataVersion".to_string(), "1".to_string())];
        if Self::targets_existing_event(route) && body.get("id").is_some() {
            let has_attendees = body
                .get("attendees")
                .and_then(Value::as_array)
                .map(|a| !a.is_empty())
                .unwrap_or(false);
            let notify = has_attendees || route.is_sub("delete");
            params.push(("sendNotifications".to_string(), notify.to_string()));
        }
        params
    }

    fn normalize(&self, response: Value, route: &Route) -> Normalized {
        if route.is_sub("list") {
            let items = response
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            return Normalized::Records(items);
        }
        Normalized::Record(response)
    }

    fn narrative_fragment(&self, record: &Value) -> String {
        match (event_time(record, "start"), event_time(record, "end")) {
            (Some(start), Some(end)) => format!(
                "The calendar event start time is {} and the end time is {}.",
                start, end
            ),
            _ => String::new(),
        }
    }
}

/// Every entry point of an add-on conference carries a URI.
fn has_addon_conference(data: &Value) -> bool {
    match data.get("entryPoints").and_then(Value::as_array) {
        Some(points) if !points.is_empty() => points.iter().all(|point| {
            point
                .get("uri")
                .and_then(Value::as_str)
                .map(|uri| !uri.is_empty())
                .unwrap_or(false)
        }),
        _ => false,
    }
}

fn has_meet_request(data: &Value) -> bool {
    data.get("createRequest")
        .and_then(|request| request.get("requestId"))
        .map(|id| !id.is_null())
        .unwrap_or(false)
}

fn event_time<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    let time = record.get(field)?;
    time.get("dateTime")
        .or_else(|| time.get("date"))
        .and_then(Value::as_str)
}

/// Minimal address check: one `@`, a non-empty local part, a dotted domain.
pub(crate) fn is_valid_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !address.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
