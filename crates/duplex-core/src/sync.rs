// SPDX-License-Identifier: AGPL-3.0-or-later
//! Rich/source view synchronization
//!
//! Exactly one view is authoritative at a time. Switching views converts the
//! document once, and only when the text actually differs from what the
//! target view last received. Programmatic replacements run under the change
//! channel's guard so the rich view's own update events never come back as
//! user edits.

use crate::document::Document;
use crate::rich::{change_channel, ChangeChannel, RichView};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Plain-text editing surface for canonical markup
pub trait SourceView {
    fn text(&self) -> String;

    /// Replace the whole buffer
    fn set_text(&mut self, text: &str);
}

/// Minimal source buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// User typing into the buffer
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl SourceView for TextBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }
}

/// Which view currently owns the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    Rich,
    Source,
}

/// Result of a view switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Content was converted and pushed into the newly active view
    Converted,
    /// Rich serialization failed; the last canonical text was used instead
    Fallback,
    /// Nothing changed since the last sync, no conversion ran
    Skipped,
    /// The requested view was already active
    AlreadyActive,
}

pub struct SyncController<R: RichView, S: SourceView> {
    document: Document,
    rich: R,
    source: S,
    active: ActiveView,
    changes: ChangeChannel,
}

impl<R: RichView, S: SourceView> SyncController<R, S> {
    /// Take ownership of both views and load the document into the rich view,
    /// which starts out active.
    pub fn new(document: Document, mut rich: R, mut source: S) -> Self {
        let (notifier, changes) = change_channel();
        rich.set_change_notifier(notifier);
        source.set_text(document.canonical_text());

        let mut controller = Self {
            document,
            rich,
            source,
            active: ActiveView::Rich,
            changes,
        };
        let text = controller.document.canonical_text().to_string();
        controller.replace_rich(&text);
        controller.document.set_last_synced_text(text);
        controller
    }

    pub fn active(&self) -> ActiveView {
        self.active
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn rich(&self) -> &R {
        &self.rich
    }

    /// Rich view access for user edits
    pub fn rich_mut(&mut self) -> &mut R {
        &mut self.rich
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Source view access for user edits
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_parts(self) -> (Document, R, S) {
        (self.document, self.rich, self.source)
    }

    /// Fold pending rich-view edits into the document.
    ///
    /// Returns `true` if the canonical text was updated.
    pub fn sync_rich_edits(&mut self) -> bool {
        let Some(markup) = self.changes.latest() else {
            return false;
        };
        if self.active != ActiveView::Rich {
            debug!("dropping rich view edit while source view is active");
            return false;
        }
        self.document.set_canonical_text(markup);
        true
    }

    /// Fold the source buffer into the document while the source view is
    /// active.
    pub fn sync_source_edits(&mut self) -> bool {
        if self.active != ActiveView::Source {
            return false;
        }
        let text = self.source.text();
        let changed = text != self.document.canonical_text();
        self.document.set_canonical_text(text);
        changed
    }

    /// Bring the document up to date with the active view and return its
    /// canonical text.
    pub fn current_text(&mut self) -> &str {
        match self.active {
            ActiveView::Rich => self.sync_rich_edits(),
            ActiveView::Source => self.sync_source_edits(),
        };
        self.document.canonical_text()
    }

    pub fn switch_to(&mut self, view: ActiveView) -> SwitchOutcome {
        match view {
            ActiveView::Rich => self.switch_to_rich(),
            ActiveView::Source => self.switch_to_source(),
        }
    }

    pub fn toggle(&mut self) -> SwitchOutcome {
        match self.active {
            ActiveView::Rich => self.switch_to_source(),
            ActiveView::Source => self.switch_to_rich(),
        }
    }

    /// Rich → source: serialize the rich tree, falling back to the last
    /// canonical text if the serializer is unavailable.
    pub fn switch_to_source(&mut self) -> SwitchOutcome {
        if self.active == ActiveView::Source {
            return SwitchOutcome::AlreadyActive;
        }
        self.sync_rich_edits();

        let (text, outcome) = match self.rich.serialize_to_markup() {
            Ok(markup) => (markup, SwitchOutcome::Converted),
            Err(err) => {
                warn!(error = %err, "rich view serialization failed, using last canonical text");
                (
                    self.document.canonical_text().to_string(),
                    SwitchOutcome::Fallback,
                )
            }
        };

        self.source.set_text(&text);
        self.document.set_canonical_text(text.clone());
        self.document.set_last_synced_text(text);
        self.active = ActiveView::Source;
        outcome
    }

    /// Source → rich: replace the rich tree only if the source text differs
    /// from what was last synced.
    pub fn switch_to_rich(&mut self) -> SwitchOutcome {
        if self.active == ActiveView::Rich {
            return SwitchOutcome::AlreadyActive;
        }
        let text = self.source.text();
        self.active = ActiveView::Rich;

        if text == self.document.last_synced_text() {
            debug!("source unchanged since last sync, keeping rich view state");
            // Intermediate source edits may have been recorded and then reverted.
            self.document.set_canonical_text(text);
            return SwitchOutcome::Skipped;
        }

        self.replace_rich(&text);
        self.document.set_canonical_text(text.clone());
        self.document.set_last_synced_text(text);
        SwitchOutcome::Converted
    }

    /// Replace the document wholesale (reload, open from storage).
    ///
    /// The active view receives the new text. When the source view is active
    /// the rich view is refreshed as well, so that the synced text really is
    /// what the inactive view holds.
    pub fn replace_document(&mut self, text: &str) {
        // Edits made against the old content are obsolete.
        let _ = self.changes.latest();

        match self.active {
            ActiveView::Rich => self.replace_rich(text),
            ActiveView::Source => {
                self.source.set_text(text);
                self.replace_rich(text);
            }
        }
        self.document.set_canonical_text(text);
        self.document.set_last_synced_text(text);
        self.document.mark_saved();
    }

    fn replace_rich(&mut self, markup: &str) {
        let _guard = self.changes.begin_programmatic();
        self.rich.replace_content(markup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rich::StructuredView;

    fn controller(text: &str) -> SyncController<StructuredView, TextBuffer> {
        SyncController::new(
            Document::new(text),
            StructuredView::default(),
            TextBuffer::new(),
        )
    }

    #[test]
    fn test_starts_rich_with_document_loaded() {
        let sync = controller("# Hello\n");
        assert_eq!(sync.active(), ActiveView::Rich);
        assert_eq!(sync.rich().serialize_to_markup().unwrap(), "# Hello\n");
        assert_eq!(sync.document().last_synced_text(), "# Hello\n");
    }

    #[test]
    fn test_loading_is_not_a_user_edit() {
        let mut sync = controller("# Hello\n");
        assert!(!sync.sync_rich_edits());
        assert!(!sync.document().meta.modified);
    }

    #[test]
    fn test_switch_to_active_view_is_noop() {
        let mut sync = controller("text\n");
        assert_eq!(sync.switch_to_rich(), SwitchOutcome::AlreadyActive);
        sync.switch_to_source();
        assert_eq!(sync.switch_to_source(), SwitchOutcome::AlreadyActive);
    }

    #[test]
    fn test_switch_to_dispatches_on_target() {
        let mut sync = controller("one\n");
        assert_eq!(sync.switch_to(ActiveView::Source), SwitchOutcome::Converted);
        assert_eq!(sync.active(), ActiveView::Source);
        assert_eq!(sync.switch_to(ActiveView::Source), SwitchOutcome::AlreadyActive);
        assert_eq!(sync.switch_to(ActiveView::Rich), SwitchOutcome::Skipped);
        assert_eq!(sync.active(), ActiveView::Rich);
    }

    #[test]
    fn test_toggle_round_trip() {
        let mut sync = controller("one\n");
        assert_eq!(sync.toggle(), SwitchOutcome::Converted);
        assert_eq!(sync.active(), ActiveView::Source);
        assert_eq!(sync.toggle(), SwitchOutcome::Skipped);
        assert_eq!(sync.active(), ActiveView::Rich);
    }
}
