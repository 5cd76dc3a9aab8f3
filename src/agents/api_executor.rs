//! Generic executor for JSON-over-HTTP capabilities.
//!
//! [`ApiExecutor`] runs the same four phases for every provider:
//!
//! 1. **Schema selection** from the step, a retrieval match, or the carried
//!    context of a previous step on the same capability
//! 2. **Synthesis** of the request body through the [`SchemaSynthesizer`]
//! 3. **Dispatch** of one call, or one call per element for array bodies
//! 4. **Normalization** of the response into a [`CapabilityContext`]
//!
//! Provider differences live in a [`CapabilityAdapter`].
//!
//! [`SchemaSynthesizer`]: crate::agents::SchemaSynthesizer

use crate::agents::synthesizer::parse_against_template;
use crate::agents::{until_cancelled, Executor, ExecutorFactory, ExecutorInit, StepOutcome};
use crate::integrations::{join_url, HttpDispatcher, OutboundRequest, TokenRefresher};
use crate::memory::AI_RESPONSE_PREFIX;
use crate::retrieval::{best_match, RetrievalMatch, SchemaRetriever};
use crate::types::{AppError, CapabilityContext, FailureKind, FailureRecord, HttpMethod, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolved routing for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: HttpMethod,
    pub endpoint: String,
    pub subcapability: Option<String>,
}

impl Route {
    /// Case-insensitive check of the sub-capability name.
    pub fn is_sub(&self, name: &str) -> bool {
        self.subcapability
            .as_deref()
            .map(|sub| sub.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    }
}

/// A provider response reduced to what the plan cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record(Value),
    Records(Vec<Value>),
}

/// Provider-specific hooks used by [`ApiExecutor`].
///
/// Every hook has a plain JSON-API default.
pub trait CapabilityAdapter: Send + Sync {
    /// Capability name used in logs and failure records.
    fn capability(&self) -> &str;

    /// Base URL that relative step endpoints are joined onto.
    fn base_url(&self) -> Option<&str> {
        None
    }

    /// Narrative handed to the synthesizer, with any provider guidance.
    fn contextualize(&self, narrative: &str) -> String {
        narrative.to_string()
    }

    /// Whether the carried body may seed a mutating step.
    fn reuses_prior_body(&self, _prior: &CapabilityContext) -> bool {
        true
    }

    /// Last-moment fixes to a synthesized body before it is sent.
    fn prepare_body(&self, _body: &mut Value, _route: &Route, _action_text: &str) {}

    /// Final request URL. `{id}` is substituted for non-creation methods.
    fn target_url(&self, url: &str, id: Option<&str>, route: &Route) -> String {
        match id {
            Some(id) if !route.method.is_creation() => substitute_id(url, id),
            _ => url.to_string(),
        }
    }

    /// Query parameters. GET requests send the body fields.
    fn query_params(&self, body: &Value, route: &Route) -> Vec<(String, String)> {
        if route.method == HttpMethod::Get {
            body_as_query(body)
        } else {
            Vec::new()
        }
    }

    fn normalize(&self, response: Value, _route: &Route) -> Normalized {
        Normalized::Record(response)
    }

    /// Narrative sentence(s) describing a single saved record.
    fn narrative_fragment(&self, _record: &Value) -> String {
        String::new()
    }

    /// Narrative describing a normalized list result.
    fn records_fragment(&self, _records: &[Value], _action_text: &str) -> String {
        String::new()
    }

    /// Body as written on the wire. The full body still drives URL targeting
    /// and is what gets saved.
    fn wire_body(&self, body: &Value) -> Value {
        body.clone()
    }
}

/// Shared collaborators for every executor of one capability.
#[derive(Clone)]
pub struct ApiServices {
    pub dispatcher: Arc<dyn HttpDispatcher>,
    pub refresher: Option<Arc<dyn TokenRefresher>>,
    pub retriever: Option<Arc<dyn SchemaRetriever>>,
    pub retrieval_top_k: usize,
}

impl ApiServices {
    pub fn new(dispatcher: Arc<dyn HttpDispatcher>) -> Self {
        Self {
            dispatcher,
            refresher: None,
            retriever: None,
            retrieval_top_k: 3,
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn SchemaRetriever>, top_k: usize) -> Self {
        self.retriever = Some(retriever);
        self.retrieval_top_k = top_k;
        self
    }
}

/// Lifecycle of a single executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Pending,
    SchemaSelected,
    Synthesized,
    Dispatched,
    Normalized,
    Failed,
}

/// What has been captured so far, reported on failure.
#[derive(Debug)]
struct Attempt {
    phase: ExecutionPhase,
    raw_model_output: String,
    request_body: Option<Value>,
    retrieval_match: Option<RetrievalMatch>,
}

impl Attempt {
    fn new() -> Self {
        Self {
            phase: ExecutionPhase::Pending,
            raw_model_output: String::new(),
            request_body: None,
            retrieval_match: None,
        }
    }

    fn advance(&mut self, capability: &str, next: ExecutionPhase) {
        tracing::debug!(capability, from = ?self.phase, to = ?next, "Executor phase");
        self.phase = next;
    }
}

struct Selection {
    route: Route,
    schema: String,
}

/// Executor for one step against one HTTP capability.
pub struct ApiExecutor<A> {
    adapter: A,
    init: ExecutorInit,
    services: ApiServices,
}

impl<A: CapabilityAdapter + 'static> ApiExecutor<A> {
    pub fn new(adapter: A, init: ExecutorInit, services: ApiServices) -> Self {
        Self {
            adapter,
            init,
            services,
        }
    }

    /// Factory that builds a fresh adapter for every executor.
    pub fn factory<F>(make_adapter: F, services: ApiServices) -> ExecutorFactory
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Arc::new(move |init: ExecutorInit| -> Box<dyn Executor> {
            Box::new(ApiExecutor::new(make_adapter(), init, services.clone()))
        })
    }

    fn capability_name(&self) -> &str {
        self.init
            .step
            .capability
            .as_deref()
            .unwrap_or_else(|| self.adapter.capability())
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        attempt: &mut Attempt,
    ) -> Result<CapabilityContext> {
        let capability = self.capability_name();
        let action = self.init.step.action_text.as_str();

        let Some(selection) = self.select_schema(cancel, attempt).await? else {
            tracing::info!(capability, "No request schema resolved, answering directly");
            return self.answer_without_schema(cancel).await;
        };
        attempt.advance(capability, ExecutionPhase::SchemaSelected);

        let narrative = self.adapter.contextualize(&self.init.narrative);
        let raw = until_cancelled(
            cancel,
            self.init
                .synthesizer
                .synthesize(action, &narrative, &selection.schema, capability),
        )
        .await?;
        attempt.raw_model_output = raw.clone();

        let body = parse_against_template(&raw, &selection.schema)?;
        attempt.request_body = Some(body.clone());
        attempt.advance(capability, ExecutionPhase::Synthesized);

        let token = match &self.services.refresher {
            Some(refresher) => Some(until_cancelled(cancel, refresher.refresh()).await?),
            None => None,
        };

        tracing::info!(
            capability,
            method = %selection.route.method,
            endpoint = %selection.route.endpoint,
            "Dispatching"
        );

        let route = &selection.route;
        let token = token.as_deref();
        let (exchanges, batched) = match body {
            Value::Array(elements) => {
                let calls = elements
                    .into_iter()
                    .map(|element| self.dispatch_one(element, route, token));
                (until_cancelled(cancel, try_join_all(calls)).await?, true)
            }
            single => (
                vec![until_cancelled(cancel, self.dispatch_one(single, route, token)).await?],
                false,
            ),
        };
        attempt.advance(capability, ExecutionPhase::Dispatched);

        Ok(self.build_context(exchanges, batched, route, attempt.retrieval_match.clone()))
    }

    async fn select_schema(
        &self,
        cancel: &CancellationToken,
        attempt: &mut Attempt,
    ) -> Result<Option<Selection>> {
        let step = &self.init.step;
        let mut method = step.http_method;
        let mut endpoint = step.endpoint.clone();
        let mut subcapability = step.subcapability.clone();
        let mut schema = step.request_schema_template.as_deref().map(strip_backslashes);

        if method.is_none() || endpoint.is_none() || schema.is_none() {
            if let Some(matched) = self.retrieve(cancel).await? {
                let meta = &matched.metadata;
                method = method.or(meta.method);
                endpoint = endpoint.or_else(|| meta.endpoint.clone());
                subcapability = subcapability.or_else(|| meta.subcapability.clone());
                schema = schema.or_else(|| meta.schema.as_deref().map(strip_backslashes));
                attempt.retrieval_match = Some(matched);
            }
        }

        let (Some(method), Some(endpoint)) = (method, endpoint) else {
            return Ok(None);
        };

        if method.mutates_existing() {
            if let Some(prior) = &self.init.carried_context {
                if !prior.serialized_request_body.is_empty() && self.adapter.reuses_prior_body(prior)
                {
                    tracing::debug!(
                        capability = self.capability_name(),
                        "Seeding schema from previous step"
                    );
                    schema = Some(prior.serialized_request_body.clone());
                }
            }
        }

        Ok(schema.map(|schema| Selection {
            route: Route {
                method,
                endpoint,
                subcapability,
            },
            schema,
        }))
    }

    async fn retrieve(&self, cancel: &CancellationToken) -> Result<Option<RetrievalMatch>> {
        let Some(retriever) = &self.services.retriever else {
            return Ok(None);
        };

        let matches = until_cancelled(
            cancel,
            retriever.query(
                self.capability_name(),
                &self.init.step.action_text,
                self.services.retrieval_top_k,
            ),
        )
        .await?;

        Ok(best_match(matches))
    }

    async fn answer_without_schema(&self, cancel: &CancellationToken) -> Result<CapabilityContext> {
        let answer = until_cancelled(
            cancel,
            self.init
                .synthesizer
                .ask(&self.init.step.action_text, &self.init.narrative),
        )
        .await?;

        let carried = self.init.carried_context.as_ref();
        Ok(CapabilityContext {
            narrative_fragment: format!("{}{}", AI_RESPONSE_PREFIX, answer),
            serialized_request_body: carried
                .map(|c| c.serialized_request_body.clone())
                .unwrap_or_default(),
            retrieval_match: carried.and_then(|c| c.retrieval_match.clone()),
        })
    }

    async fn dispatch_one(
        &self,
        mut body: Value,
        route: &Route,
        token: Option<&str>,
    ) -> Result<(Value, Value)> {
        self.adapter
            .prepare_body(&mut body, route, &self.init.step.action_text);

        let id = body_id(&body);
        let url = join_url(self.adapter.base_url(), &route.endpoint);
        let url = self.adapter.target_url(&url, id.as_deref(), route);

        let mut request = OutboundRequest::new(route.method, url)
            .with_query(self.adapter.query_params(&body, route))
            .with_bearer(token.map(str::to_string));
        if route.method.carries_body() {
            request = request.with_body(self.adapter.wire_body(&body));
        }

        let response = self.services.dispatcher.call(request).await?;
        Ok((body, response))
    }

    fn build_context(
        &self,
        exchanges: Vec<(Value, Value)>,
        batched: bool,
        route: &Route,
        retrieval_match: Option<RetrievalMatch>,
    ) -> CapabilityContext {
        let mut fragments = String::new();
        let mut saved = Vec::with_capacity(exchanges.len());

        for (body, response) in exchanges {
            match self.adapter.normalize(response, route) {
                Normalized::Record(record) => {
                    fragments.push_str(&self.adapter.narrative_fragment(&record));
                    saved.push(merge_bodies(&body, &record));
                }
                Normalized::Records(records) => {
                    fragments.push_str(
                        &self
                            .adapter
                            .records_fragment(&records, &self.init.step.action_text),
                    );
                    saved.push(Value::Array(records));
                }
            }
        }

        let serialized = if batched {
            Value::Array(saved)
        } else {
            saved.pop().unwrap_or(Value::Null)
        };

        CapabilityContext {
            narrative_fragment: fragments,
            serialized_request_body: serialized.to_string(),
            retrieval_match,
        }
    }

    fn failure(&self, attempt: Attempt, error: AppError) -> FailureRecord {
        FailureRecord {
            step_action_text: self.init.step.action_text.clone(),
            capability: self.capability_name().to_string(),
            kind: FailureKind::from_error(&error),
            raw_model_output: attempt.raw_model_output,
            attempted_request_body: attempt.request_body,
            error: error.to_string(),
            retrieval_match: attempt.retrieval_match,
        }
    }
}

#[async_trait]
impl<A: CapabilityAdapter + 'static> Executor for ApiExecutor<A> {
    async fn run(&self, cancel: &CancellationToken) -> StepOutcome {
        let capability = self.capability_name();
        let mut attempt = Attempt::new();

        match self.execute(cancel, &mut attempt).await {
            Ok(context) => {
                attempt.advance(capability, ExecutionPhase::Normalized);
                StepOutcome::Success(context)
            }
            Err(error) => {
                tracing::warn!(capability, phase = ?attempt.phase, error = %error, "Step failed");
                attempt.advance(capability, ExecutionPhase::Failed);
                StepOutcome::Failure(self.failure(attempt, error))
            }
        }
    }
}

/// Replace every `{id}` placeholder in `url`.
pub fn substitute_id(url: &str, id: &str) -> String {
    url.replace("{id}", id)
}

/// Overlay response fields on the request body. Response fields win.
///
/// A response that is not an object leaves the body unchanged.
pub fn merge_bodies(body: &Value, response: &Value) -> Value {
    match (body, response) {
        (Value::Object(request), Value::Object(reply)) => {
            let mut merged = request.clone();
            merged.extend(reply.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::Object(merged)
        }
        (_, Value::Object(_)) => response.clone(),
        _ => body.clone(),
    }
}

/// Flatten a JSON object into query pairs, skipping nulls.
pub fn body_as_query(body: &Value) -> Vec<(String, String)> {
    let Value::Object(fields) = body else {
        return Vec::new();
    };
    fields
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

fn body_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn strip_backslashes(template: &str) -> String {
    template.replace('\\', "")
}
