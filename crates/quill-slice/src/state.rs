//! Slice states, user actions and the transition table

use crate::error::SliceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable state of a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceState {
    /// Showing accepted text, nothing open
    Idle,
    /// A generation request for this slice is in flight
    Loading,
    /// A proposal awaits accept or discard
    Proposed,
    /// The user is revising the text by hand
    Editing,
}

impl SliceState {
    /// Check if a proposal or edit is open
    #[inline]
    #[must_use]
    pub fn has_open_alternative(&self) -> bool {
        matches!(self, Self::Proposed | Self::Editing)
    }
}

impl fmt::Display for SliceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Proposed => "proposed",
            Self::Editing => "editing",
        };
        f.write_str(s)
    }
}

/// Action a user can trigger on a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceAction {
    /// Ask for a shorter version
    Summarize,
    /// Ask for a rewritten version
    Regenerate,
    /// Ask for a continuation of the slice
    ExtendSlice,
    /// Start manual editing
    Edit,
    /// Live edit input
    EditInput,
    /// Commit the open alternative
    Accept,
    /// Drop the open alternative
    Discard,
    /// Abandon the in-flight request
    Cancel,
    /// Remove the slice from its document
    Delete,
}

impl SliceAction {
    /// Generation request this action issues, if any
    #[inline]
    #[must_use]
    pub fn generation(&self) -> Option<GenerationAction> {
        match self {
            Self::Summarize => Some(GenerationAction::Summarize),
            Self::Regenerate => Some(GenerationAction::Regenerate),
            Self::ExtendSlice => Some(GenerationAction::Extend),
            _ => None,
        }
    }
}

impl fmt::Display for SliceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Summarize => "summarize",
            Self::Regenerate => "regenerate",
            Self::ExtendSlice => "extend slice",
            Self::Edit => "edit",
            Self::EditInput => "edit input",
            Self::Accept => "accept",
            Self::Discard => "discard",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Action tag sent to the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationAction {
    /// Condense the prompt
    Summarize,
    /// Rewrite the prompt
    Regenerate,
    /// Continue the prompt
    Extend,
    /// Produce new paragraphs following the prompt
    Generate,
}

impl GenerationAction {
    /// Wire tag
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "SUMMARIZE",
            Self::Regenerate => "REGENERATE",
            Self::Extend => "EXTEND",
            Self::Generate => "GENERATE",
        }
    }
}

impl fmt::Display for GenerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a user action against the current state.
pub fn validate_action(state: SliceState, action: SliceAction) -> Result<(), SliceError> {
    if allowed_actions(state).contains(&action) {
        Ok(())
    } else {
        Err(SliceError::invalid(state, action))
    }
}

/// Actions accepted in a given state
#[must_use]
pub fn allowed_actions(state: SliceState) -> Vec<SliceAction> {
    use SliceAction::*;
    match state {
        SliceState::Idle => vec![Summarize, Regenerate, ExtendSlice, Edit, Delete],
        SliceState::Loading => vec![Cancel, Delete],
        SliceState::Proposed => vec![Accept, Discard, Delete],
        SliceState::Editing => vec![EditInput, Accept, Discard, Delete],
    }
}

/// State reached after a successful user action
///
/// Generation actions land in `Loading`; the response decides what follows.
/// `Delete` has no successor.
#[must_use]
pub fn next_state(action: SliceAction) -> Option<SliceState> {
    use SliceAction::*;
    match action {
        Summarize | Regenerate | ExtendSlice => Some(SliceState::Loading),
        Edit | EditInput => Some(SliceState::Editing),
        Accept | Discard | Cancel => Some(SliceState::Idle),
        Delete => None,
    }
}
