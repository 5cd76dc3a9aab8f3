//! Mock implementations for testing.
//!
//! This module provides a scripted completion model, a recording HTTP
//! dispatcher and a fixed schema retriever that can be used across
//! different test files without duplication.

use async_trait::async_trait;
use delegator::integrations::{HttpDispatcher, OutboundRequest};
use delegator::llm::{ChatMessage, LLMClient};
use delegator::retrieval::{RetrievalMatch, SchemaRetriever};
use delegator::types::{AppError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// One scripted completion.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Return this text
    Text(String),
    /// Fail with an LLM error
    Fail,
    /// Never resolve; only cancellation ends the call
    Hang,
}

/// A single recorded `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

/// Mock completion model that replays a script of replies in order.
///
/// Every call is recorded so tests can inspect the prompts that were built.
/// Once the script runs out, calls fail with an LLM error.
///
/// # Examples
///
/// ```ignore
/// let llm = MockLLMClient::replying(&["Tuesday", r#"{"title":"Meeting"}"#]);
/// let llm = MockLLMClient::scripted(vec![Reply::Fail, Reply::Hang]);
/// ```
#[derive(Default)]
pub struct MockLLMClient {
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockLLMClient {
    /// Create a mock client from a script of replies.
    pub fn scripted(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Create a mock client that returns the given texts in order.
    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::scripted(texts.iter().map(|t| Reply::Text(t.to_string())).collect())
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().push(RecordedCall {
            system: system.to_string(),
            messages: messages.to_vec(),
        });

        let next = self.script.lock().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail) => Err(AppError::LLM("Mock LLM failure".to_string())),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(AppError::LLM("Mock LLM script exhausted".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

type Responder = dyn Fn(&OutboundRequest) -> Result<Value> + Send + Sync;

/// Mock dispatcher that records every request and answers through a closure.
pub struct MockDispatcher {
    responder: Box<Responder>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockDispatcher {
    /// Answer every request with `responder`.
    pub fn responding<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&OutboundRequest) -> Result<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every request with the same JSON value.
    pub fn returning(value: Value) -> Arc<Self> {
        Self::responding(move |_| Ok(value.clone()))
    }

    /// Replay `values` in order, failing once they run out.
    pub fn sequence(values: Vec<Value>) -> Arc<Self> {
        let queue = Mutex::new(VecDeque::from(values));
        Self::responding(move |_| {
            queue
                .lock()
                .pop_front()
                .ok_or_else(|| AppError::Dispatch("Mock dispatcher exhausted".to_string()))
        })
    }

    /// All requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpDispatcher for MockDispatcher {
    async fn call(&self, request: OutboundRequest) -> Result<Value> {
        let reply = (self.responder)(&request);
        self.requests.lock().push(request);
        reply
    }
}

/// Retriever that returns a fixed candidate list and records queries.
pub struct StubRetriever {
    matches: Vec<RetrievalMatch>,
    queries: Mutex<Vec<(String, String, usize)>>,
}

impl StubRetriever {
    pub fn new(matches: Vec<RetrievalMatch>) -> Arc<Self> {
        Arc::new(Self {
            matches,
            queries: Mutex::new(Vec::new()),
        })
    }

    /// `(namespace, action_text, top_k)` for every query.
    pub fn queries(&self) -> Vec<(String, String, usize)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SchemaRetriever for StubRetriever {
    async fn query(
        &self,
        namespace: &str,
        action_text: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>> {
        self.queries
            .lock()
            .push((namespace.to_string(), action_text.to_string(), top_k));
        Ok(self.matches.clone())
    }
}
