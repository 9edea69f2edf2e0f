//! Error types for slice transitions
//!
//! Every rejected action leaves the slice untouched. Callers at the
//! orchestration boundary turn these into ignored outcomes rather than
//! surfacing them as failures.

use crate::state::{SliceAction, SliceState};
use crate::id::RequestTicket;

/// Slice transition error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SliceError {
    /// Action not allowed from the current state
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// State the slice was in
        state: SliceState,
        /// Action that was requested
        action: SliceAction,
    },

    /// Slice text would become empty
    #[error("slice text must not be empty")]
    EmptyText,

    /// Response arrived for a request the slice no longer tracks
    #[error("stale response for request {ticket}")]
    StaleTicket {
        /// Ticket the response was issued under
        ticket: RequestTicket,
    },

    /// Generation produced nothing usable after cleanup
    #[error("generation returned no usable text")]
    EmptyResult,
}

impl SliceError {
    /// Check if the error is an invalid transition
    #[inline]
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Shorthand for an invalid transition error
    #[inline]
    #[must_use]
    pub fn invalid(state: SliceState, action: SliceAction) -> Self {
        Self::InvalidTransition { state, action }
    }
}
