//! Testing utilities for Quill workspace
//!
//! Generation client doubles and fixtures shared by tests and the simulator.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use quill_core::{
    ClientError, DocumentModel, GenerationClient, GenerationOrchestrator, GenerationRequest,
    GenerationResponse, QuillConfig,
};
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::oneshot;

pub type Reply = Result<Value, ClientError>;

/// Success payload carrying `text` as its only candidate
pub fn text_payload(text: &str) -> Value {
    GenerationResponse::single(text).to_payload()
}

/// Orchestrator over a document seeded with `paragraphs`
pub fn seeded<C: GenerationClient>(client: C, paragraphs: &[&str]) -> GenerationOrchestrator<C> {
    let document = DocumentModel::from_paragraphs(None, paragraphs.iter().copied());
    GenerationOrchestrator::with_document(client, QuillConfig::new(), document)
}

/// Answers requests from a queue of scripted replies, in order
///
/// Runs dry with a transport failure.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, text: &str) -> Self {
        self.push(Ok(text_payload(text)));
        self
    }

    pub fn with_payload(self, payload: Value) -> Self {
        self.push(Ok(payload));
        self
    }

    pub fn with_error(self, error: ClientError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().push_back(reply);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, ClientError> {
        self.requests.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("no scripted reply".to_string())))
    }
}

/// Holds every request open until the test releases it
///
/// Lets tests interleave user actions with in-flight requests.
#[derive(Debug, Default)]
pub struct GatedClient {
    waiting: Mutex<VecDeque<(GenerationRequest, oneshot::Sender<Reply>)>>,
}

impl GatedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests waiting for a reply
    pub fn pending(&self) -> usize {
        self.waiting.lock().len()
    }

    /// Yield until at least `count` requests are waiting
    pub async fn wait_for_requests(&self, count: usize) {
        while self.pending() < count {
            tokio::task::yield_now().await;
        }
    }

    /// Answer the oldest waiting request
    ///
    /// Returns the request that was answered.
    pub fn release(&self, reply: Reply) -> Option<GenerationRequest> {
        let (request, tx) = self.waiting.lock().pop_front()?;
        let _ = tx.send(reply);
        Some(request)
    }

    pub fn release_text(&self, text: &str) -> Option<GenerationRequest> {
        self.release(Ok(text_payload(text)))
    }
}

#[async_trait]
impl GenerationClient for GatedClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().push_back((request, tx));
        rx.await
            .unwrap_or_else(|_| Err(ClientError::Transport("gate closed".to_string())))
    }
}
