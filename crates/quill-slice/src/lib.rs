//! Quill Slice - paragraph revision state machine
//!
//! A slice is one paragraph of a generated document. It can be summarized,
//! regenerated, extended or edited by hand; every alternative is held as a
//! proposal until the user accepts or discards it.
//!
//! # Example
//!
//! ```rust
//! use quill_slice::{RequestTicket, Slice, SliceAction, SliceState, TextCleaner};
//!
//! let mut slice = Slice::new("Cats sleep a lot.").unwrap();
//! let request = slice.begin_generation(SliceAction::Summarize, RequestTicket(1)).unwrap();
//! assert_eq!(request.prompt, "Cats sleep a lot.");
//!
//! slice
//!     .complete_generation(request.ticket, " Cats nap. ", &TextCleaner::default())
//!     .unwrap();
//! assert_eq!(slice.state(), SliceState::Proposed);
//!
//! slice.accept().unwrap();
//! assert_eq!(slice.current_text(), "Cats nap.");
//! ```

#![warn(unreachable_pub)]

pub mod cleanup;
pub mod error;
pub mod id;
pub mod slice;
pub mod state;

pub use cleanup::{CleanupOptions, TextCleaner};
pub use error::SliceError;
pub use id::{RequestTicket, SliceId};
pub use slice::{PendingGeneration, Slice, SliceView};
pub use state::{
    allowed_actions, next_state, validate_action, GenerationAction, SliceAction, SliceState,
};
