//! Post-processing of generated text before it becomes a proposal
//!
//! The generation service sometimes emits literal `-` characters as stray
//! punctuation. Stripping them is a heuristic tied to the upstream model, so
//! it is switchable.

use serde::{Deserialize, Serialize};

/// Cleanup switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupOptions {
    /// Remove every literal `-` character
    pub strip_artifact_dashes: bool,
    /// Trim surrounding whitespace
    pub trim: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            strip_artifact_dashes: true,
            trim: true,
        }
    }
}

impl CleanupOptions {
    /// Options that leave text untouched
    #[inline]
    #[must_use]
    pub fn raw() -> Self {
        Self {
            strip_artifact_dashes: false,
            trim: false,
        }
    }

    /// With dash stripping toggled
    #[inline]
    #[must_use]
    pub fn with_strip_artifact_dashes(mut self, strip: bool) -> Self {
        self.strip_artifact_dashes = strip;
        self
    }
}

/// Applies [`CleanupOptions`] to generated text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCleaner {
    options: CleanupOptions,
}

impl TextCleaner {
    /// Create cleaner with options
    #[inline]
    #[must_use]
    pub fn new(options: CleanupOptions) -> Self {
        Self { options }
    }

    /// Configured options
    #[inline]
    #[must_use]
    pub fn options(&self) -> CleanupOptions {
        self.options
    }

    /// Clean one generated text
    ///
    /// Trimming happens before dash removal, so `" - text"` becomes `" text"`
    /// rather than `"text"`.
    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        let text = if self.options.trim { text.trim() } else { text };
        if self.options.strip_artifact_dashes {
            text.replace('-', "")
        } else {
            text.to_string()
        }
    }
}
