//! Core types for Quill
//!
//! Defines:
//! - Quill configuration
//! - Outcomes of slice and document actions

use crate::error::{DocumentError, QuillError};
use quill_slice::{CleanupOptions, RequestTicket, SliceAction, SliceError, SliceId, SliceState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default prefix for prompts synthesized from a document topic
pub const DEFAULT_PROMPT_PREFIX: &str = "Write about ";

/// Quill configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    /// Prefix placed before the topic when a document has no slices to chain from
    pub generation_prompt_prefix: String,
    /// Cleanup applied to slice proposals
    pub cleanup: CleanupOptions,
    /// Per-request time limit in seconds (none = wait indefinitely)
    pub request_timeout_secs: Option<u64>,
    /// Buffered change events per subscriber
    pub event_capacity: usize,
}

impl QuillConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// - `QuillError::Config` on invalid TOML or mistyped values
    pub fn from_toml_str(source: &str) -> Result<Self, QuillError> {
        Ok(toml::from_str(source)?)
    }

    /// With prompt prefix
    #[inline]
    #[must_use]
    pub fn with_prompt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.generation_prompt_prefix = prefix.into();
        self
    }

    /// With cleanup options
    #[inline]
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Request timeout as a duration
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            generation_prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            cleanup: CleanupOptions::default(),
            request_timeout_secs: None,
            event_capacity: 64,
        }
    }
}

/// Why an action left state untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ignored {
    /// Action not allowed in the slice's current state
    InvalidTransition {
        /// State the slice was in
        state: SliceState,
        /// Requested action
        action: SliceAction,
    },
    /// Slice does not exist (or was deleted)
    UnknownSlice(SliceId),
    /// Response for a request that was cancelled or whose slice is gone
    StaleResponse(RequestTicket),
    /// Generation produced no usable text
    EmptyResult,
    /// Text to commit was blank
    EmptyText,
    /// A document extension is already running
    ExtendInFlight,
    /// Document has neither slices nor a prompt to seed from
    NothingToExtend,
}

impl From<SliceError> for Ignored {
    fn from(value: SliceError) -> Self {
        match value {
            SliceError::InvalidTransition { state, action } => {
                Self::InvalidTransition { state, action }
            }
            SliceError::EmptyText => Self::EmptyText,
            SliceError::StaleTicket { ticket } => Self::StaleResponse(ticket),
            SliceError::EmptyResult => Self::EmptyResult,
        }
    }
}

impl From<DocumentError> for Ignored {
    fn from(value: DocumentError) -> Self {
        match value {
            DocumentError::UnknownSlice(id) => Self::UnknownSlice(id),
            DocumentError::Slice(e) => e.into(),
        }
    }
}

/// Result of a slice-level action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Transition applied; carries the slice's new state (`None` once deleted)
    Applied(Option<SliceState>),
    /// No-op
    Ignored(Ignored),
}

impl ActionOutcome {
    /// Check if the action changed state
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Reason for a no-op
    #[inline]
    #[must_use]
    pub fn ignored(&self) -> Option<&Ignored> {
        match self {
            Self::Ignored(reason) => Some(reason),
            Self::Applied(_) => None,
        }
    }
}

/// Result of extending or bootstrapping a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// New slices appended, in document order
    Appended(Vec<SliceId>),
    /// No-op
    Ignored(Ignored),
}

impl ExtendOutcome {
    /// Ids of appended slices (empty for no-ops)
    #[must_use]
    pub fn appended(&self) -> &[SliceId] {
        match self {
            Self::Appended(ids) => ids,
            Self::Ignored(_) => &[],
        }
    }
}
