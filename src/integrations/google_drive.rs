//! Google Drive files API.

use crate::agents::api_executor::body_as_query;
use crate::agents::{CapabilityAdapter, Normalized, Route};
use crate::types::HttpMethod;
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

const QUERY_GUIDANCE: &str = "\
To search for a specific set of files or folders, use the query string q with files.list to filter the files to return.\n\
QUERY_STRING has the format QUERY_TERM OPERATOR VALUES.\n\
QUERY_TERM can be one of: name, fullText, mimeType, modifiedTime, viewedByMeTime, trashed, starred, \
owners, writers, readers, sharedWithMe, createdTime, properties, appProperties, visibility, shortcutDetails.targetId.\n\
OPERATOR can be one of: contains, =, !=.\n\
Create QUERY_STRING from the ACTION description. If ACTION searches for files in a folder and FOUND_FILES \
lists file names and ids, use FOUND_FILES to create QUERY_STRING.\n";

pub struct GoogleDriveAdapter {
    capability: String,
    base_url: String,
}

impl GoogleDriveAdapter {
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

impl CapabilityAdapter for GoogleDriveAdapter {
    fn capability(&self) -> &str {
        &self.capability
    }

    fn base_url(&self) -> Option<&str> {
        Some(&self.base_url)
    }

    fn contextualize(&self, narrative: &str) -> String {
        format!("{}\n{}", narrative, QUERY_GUIDANCE)
    }

    fn target_url(&self, url: &str, id: Option<&str>, route: &Route) -> String {
        match id {
            Some(id) if !route.method.is_creation() => {
                url.replace("{fileId}", id).replace("{id}", id)
            }
            _ => url.to_string(),
        }
    }

    /// The file id travels in the path, never in the query.
    fn query_params(&self, body: &Value, route: &Route) -> Vec<(String, String)> {
        if route.method != HttpMethod::Get {
            return Vec::new();
        }
        body_as_query(body)
            .into_iter()
            .filter(|(key, _)| key != "id")
            .collect()
    }

    /// Drive rejects a writable `id` in file metadata.
    fn wire_body(&self, body: &Value) -> Value {
        let mut body = body.clone();
        if let Some(fields) = body.as_object_mut() {
            fields.remove("id");
        }
        body
    }

    fn normalize(&self, response: Value, route: &Route) -> Normalized {
        if route.is_sub("listFiles") {
            let files = response
                .get("files")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            return Normalized::Records(files);
        }
        Normalized::Record(response)
    }

    fn records_fragment(&self, records: &[Value], action_text: &str) -> String {
        let text = |record: &Value, field: &str| {
            record
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };
        let found = records
            .iter()
            .map(|file| {
                format!(
                    "Name: {}, Id: {}, MimeType: {}",
                    text(file, "name"),
                    text(file, "id"),
                    text(file, "mimeType")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "\nThe action \"{}\" resulted in these FOUND_FILES being: {}",
            action_text, found
        )
    }
}
