// SPDX-License-Identifier: AGPL-3.0-or-later
//! The canonical document: markup text plus metadata
//!
//! Between edit sessions the markup text is the single source of truth. The
//! text last pushed into the inactive view is kept alongside it so that a view
//! switch can tell whether a conversion is needed at all.

use crate::ast::Node;
use crate::formats::markdown::parse_markdown;
use serde::{Deserialize, Serialize};

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Explicit title; falls back to the first heading when unset
    pub title: Option<String>,
    /// Canonical text changed since the document was opened or last saved
    pub modified: bool,
}

/// Word and character counts for a status bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub word_count: usize,
    pub char_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    canonical_text: String,
    last_synced_text: String,
    pub meta: DocumentMeta,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            last_synced_text: text.clone(),
            canonical_text: text,
            meta: DocumentMeta::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    pub fn canonical_text(&self) -> &str {
        &self.canonical_text
    }

    /// Text last pushed into the inactive view
    pub fn last_synced_text(&self) -> &str {
        &self.last_synced_text
    }

    /// Record new canonical text from the active view
    pub fn set_canonical_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.canonical_text {
            self.canonical_text = text;
            self.meta.modified = true;
        }
    }

    pub(crate) fn set_last_synced_text(&mut self, text: impl Into<String>) {
        self.last_synced_text = text.into();
    }

    pub fn mark_saved(&mut self) {
        self.meta.modified = false;
    }

    /// Parse the canonical text into a tree
    pub fn parse(&self) -> Node {
        parse_markdown(&self.canonical_text)
    }

    /// Explicit title, else the first heading
    pub fn title(&self) -> Option<String> {
        self.meta
            .title
            .clone()
            .or_else(|| self.parse().first_heading())
    }

    pub fn stats(&self) -> DocumentStats {
        let doc = self.parse();
        DocumentStats {
            word_count: doc.word_count(),
            char_count: doc.char_count(),
        }
    }
}
