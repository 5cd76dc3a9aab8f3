//! Schema/endpoint retrieval seam.
//!
//! When the planner leaves a step without routing metadata, executors ask a
//! [`SchemaRetriever`] for candidate operations in the capability's namespace
//! and take the highest scoring one. The backing store (vector index,
//! keyword index, ...) lives outside this crate.

use crate::types::{lenient_method, HttpMethod, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Routing metadata attached to a retrieval match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    /// Capability the matched operation belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_method",
        skip_serializing_if = "Option::is_none"
    )]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcapability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Anything else the store returned, kept opaque.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One ranked candidate returned by a retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: MatchMetadata,
}

#[async_trait]
pub trait SchemaRetriever: Send + Sync {
    /// Rank candidate operations for `action_text` within `namespace`.
    async fn query(
        &self,
        namespace: &str,
        action_text: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>>;
}

/// Pick the highest scoring match. Ties keep the first one encountered.
pub fn best_match(matches: Vec<RetrievalMatch>) -> Option<RetrievalMatch> {
    let mut best: Option<RetrievalMatch> = None;
    for candidate in matches {
        let better = match &best {
            Some(current) => candidate.score > current.score,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}
