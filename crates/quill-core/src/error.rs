//! Error types for Quill Core
//!
//! Provides error handling for:
//! - Generation service failures (transport, timeout, malformed payload)
//! - Document lookups against unknown slices
//! - Configuration loading

use quill_slice::{SliceError, SliceId};

/// Main Quill error type
///
/// Only failures worth reporting to the user end up here. Rejected actions
/// and empty generations are ignored outcomes, not errors.
#[derive(Debug, thiserror::Error)]
pub enum QuillError {
    /// Generation request failed
    #[error("generation failed: {0}")]
    Generation(#[from] ClientError),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl QuillError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(e) if e.is_retryable())
    }

    /// Check if error came from the generation service
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}

/// Generation client errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Request did not complete
    #[error("transport failure: {0}")]
    Transport(String),

    /// Request exceeded the configured time limit
    #[error("request timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Payload does not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }
}

/// Document-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// No slice with this id (never existed or already deleted)
    #[error("slice not found: {0}")]
    UnknownSlice(SliceId),

    /// Slice refused the transition
    #[error(transparent)]
    Slice(#[from] SliceError),
}
