//! Generation service boundary
//!
//! The transport itself lives outside this crate. Implementations hand back
//! the raw JSON payload; [`GenerationResponse::from_payload`] is the only way
//! to read generated text out of it, so unrecognised payloads never reach the
//! document.

use crate::error::ClientError;
use async_trait::async_trait;
use quill_slice::GenerationAction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One request to the generation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Action tag
    pub action: GenerationAction,
    /// Prompt text
    pub prompt: String,
}

impl GenerationRequest {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(action: GenerationAction, prompt: impl Into<String>) -> Self {
        Self {
            action,
            prompt: prompt.into(),
        }
    }
}

/// Text generation service
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Perform one request and return the raw response payload
    ///
    /// # Errors
    /// - `ClientError::Transport` if the request did not complete
    async fn generate(&self, request: GenerationRequest) -> Result<Value, ClientError>;
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, ClientError> {
        (**self).generate(request).await
    }
}

/// Recognised success payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Response body
    pub body: GenerationBody,
}

/// Body of a success payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationBody {
    /// Candidates in service order
    pub generations: Vec<Generation>,
    /// Originating prompt, echoed by `GENERATE` responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// One generated candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    /// Generated text
    pub text: String,
}

impl GenerationResponse {
    /// Build a success payload with a single candidate
    #[must_use]
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            body: GenerationBody {
                generations: vec![Generation { text: text.into() }],
                prompt: None,
            },
        }
    }

    /// Parse a raw payload
    ///
    /// # Errors
    /// - `ClientError::Malformed` if the payload is not a success shape or
    ///   carries no candidates
    pub fn from_payload(payload: &Value) -> Result<Self, ClientError> {
        let response = Self::deserialize(payload)
            .map_err(|e| ClientError::Malformed(e.to_string()))?;
        if response.body.generations.is_empty() {
            return Err(ClientError::Malformed("no generations".to_string()));
        }
        Ok(response)
    }

    /// Text of the first candidate (the only one used)
    #[inline]
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.body.generations.first().map(|g| g.text.as_str())
    }

    /// Encode as a raw payload
    #[must_use]
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Check whether a raw payload is a usable success response
#[must_use]
pub fn is_generation_response(payload: &Value) -> bool {
    GenerationResponse::from_payload(payload).is_ok()
}

/// Split generated text into paragraphs
///
/// Paragraphs are separated by blank lines; each is trimmed and blank ones
/// are dropped.
#[must_use]
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.trim()
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
