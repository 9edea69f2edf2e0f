//! Quill Core - document model and generation orchestration
//!
//! Builds a document out of generated paragraphs ("slices"):
//! - Extends the document by chaining its last slice into a new request
//! - Revises single slices (summarize, regenerate, extend, manual edit)
//! - Holds every revision as a proposal until accepted or discarded
//! - Exports only accepted text
//!
//! The generation service is abstracted behind [`GenerationClient`].
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_core::{GenerationOrchestrator, QuillConfig};
//!
//! # async fn example(client: impl quill_core::GenerationClient) -> Result<(), quill_core::QuillError> {
//! let quill = GenerationOrchestrator::bootstrap(client, QuillConfig::new(), "Cats").await?;
//!
//! let first = quill.slice_ids()[0];
//! quill.summarize(first).await?;
//! quill.accept(first);
//!
//! quill.extend_document().await?;
//! println!("{}", quill.export_text());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod client;
pub mod document;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod types;

// Re-exports for convenience
pub use client::{
    is_generation_response, split_paragraphs, Generation, GenerationBody, GenerationClient,
    GenerationRequest, GenerationResponse,
};
pub use document::{DocumentModel, DocumentSnapshot, SLICE_SEPARATOR};
pub use error::{ClientError, DocumentError, QuillError};
pub use events::{DocumentEvent, EventSender};
pub use orchestrator::GenerationOrchestrator;
pub use types::{ActionOutcome, ExtendOutcome, Ignored, QuillConfig, DEFAULT_PROMPT_PREFIX};

pub use quill_slice::{
    CleanupOptions, GenerationAction, RequestTicket, Slice, SliceAction, SliceId, SliceState,
    SliceView, TextCleaner,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Quill Core
    pub use crate::{
        ActionOutcome, DocumentModel, ExtendOutcome, GenerationClient, GenerationOrchestrator,
        GenerationRequest, Ignored, QuillConfig, QuillError, SliceId, SliceState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
