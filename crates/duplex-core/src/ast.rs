// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown document AST shared by the parser, the serializer, the rich view
//! and the export renderers.
//!
//! The node set is closed. Anything the parser dialect produces beyond the
//! known variants is carried as [`Node::Other`], which every consumer treats as
//! transparent: its children are visited, the node itself contributes nothing.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Deepest heading level the document model carries.
pub const MAX_HEADING_DEPTH: u8 = 3;

/// A node of the document tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Document root
    Root { children: Vec<Node> },

    /// Heading with depth 1-3
    Heading { depth: u8, children: Vec<Node> },

    Paragraph { children: Vec<Node> },

    /// Literal text
    Text { value: String },

    /// Strong emphasis (usually bold)
    Strong { children: Vec<Node> },

    /// Emphasis (usually italic)
    Emphasis { children: Vec<Node> },

    InlineCode { value: String },

    /// Fenced or indented code block
    Code {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },

    Link { url: String, children: Vec<Node> },

    /// Image reference exactly as written in the markup
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },

    /// Ordered or bullet list; `items` are `ListItem` nodes
    List { ordered: bool, items: Vec<Node> },

    ListItem { children: Vec<Node> },

    Blockquote { children: Vec<Node> },

    ThematicBreak,

    /// Hard line break
    LineBreak,

    /// Raw HTML passed through from the source
    RawMarkup { value: String },

    /// Pipe table
    Table { rows: Vec<TableRow> },

    /// Parser extension outside the known node set
    Other { kind: String, children: Vec<Node> },
}

/// One row of a table; each cell holds inline nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub header: bool,
    pub cells: Vec<Vec<Node>>,
}

impl Node {
    pub fn root(children: Vec<Node>) -> Self {
        Node::Root { children }
    }

    /// Build a heading, clamping the depth into `1..=MAX_HEADING_DEPTH`.
    pub fn heading(depth: u8, children: Vec<Node>) -> Self {
        Node::Heading {
            depth: depth.clamp(1, MAX_HEADING_DEPTH),
            children,
        }
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph { children }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    /// Child nodes of container variants; empty for leaves and tables.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root { children }
            | Node::Heading { children, .. }
            | Node::Paragraph { children }
            | Node::Strong { children }
            | Node::Emphasis { children }
            | Node::Link { children, .. }
            | Node::ListItem { children }
            | Node::Blockquote { children }
            | Node::Other { children, .. } => children,
            Node::List { items, .. } => items,
            _ => &[],
        }
    }

    /// Mutable access to the child list, `None` for leaves and tables.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root { children }
            | Node::Heading { children, .. }
            | Node::Paragraph { children }
            | Node::Strong { children }
            | Node::Emphasis { children }
            | Node::Link { children, .. }
            | Node::ListItem { children }
            | Node::Blockquote { children }
            | Node::Other { children, .. } => Some(children),
            Node::List { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Pre-order traversal, descending into table cells as well.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        if let Node::Table { rows } = self {
            for cell in rows.iter().flat_map(|row| &row.cells) {
                for node in cell {
                    node.walk(visit);
                }
            }
            return;
        }
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Concatenated literal text of this subtree
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node| match node {
            Node::Text { value } | Node::InlineCode { value } => out.push_str(value),
            Node::Image { alt: Some(alt), .. } => out.push_str(alt),
            _ => {}
        });
        out
    }

    /// Text of the first heading in document order
    pub fn first_heading(&self) -> Option<String> {
        let mut found = None;
        self.walk(&mut |node| {
            if found.is_none() && matches!(node, Node::Heading { .. }) {
                found = Some(node.plain_text());
            }
        });
        found.filter(|title| !title.trim().is_empty())
    }

    /// Count words in this subtree
    pub fn word_count(&self) -> usize {
        match self {
            Node::Text { value } | Node::InlineCode { value } | Node::Code { value, .. } => {
                value.unicode_words().count()
            }
            Node::Table { rows } => rows
                .iter()
                .flat_map(|row| &row.cells)
                .flatten()
                .map(Node::word_count)
                .sum(),
            _ => self.children().iter().map(Node::word_count).sum(),
        }
    }

    /// Count characters in this subtree
    pub fn char_count(&self) -> usize {
        match self {
            Node::Text { value } | Node::InlineCode { value } | Node::Code { value, .. } => {
                value.chars().count()
            }
            Node::Table { rows } => rows
                .iter()
                .flat_map(|row| &row.cells)
                .flatten()
                .map(Node::char_count)
                .sum(),
            _ => self.children().iter().map(Node::char_count).sum(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn simple_text_strategy() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{0,60}"
    }

    fn inline_strategy() -> impl Strategy<Value = Node> {
        prop_oneof![
            simple_text_strategy().prop_map(Node::text),
            simple_text_strategy().prop_map(|value| Node::InlineCode { value }),
            Just(Node::LineBreak),
        ]
    }

    fn block_strategy() -> impl Strategy<Value = Node> {
        prop_oneof![
            prop::collection::vec(inline_strategy(), 0..5).prop_map(Node::paragraph),
            (0u8..=9, prop::collection::vec(inline_strategy(), 1..3))
                .prop_map(|(depth, children)| Node::heading(depth, children)),
            Just(Node::ThematicBreak),
        ]
    }

    proptest! {
        // Property: constructed headings never leave the 1..=3 range
        #[test]
        fn prop_heading_depth_in_range(depth in any::<u8>()) {
            if let Node::Heading { depth, .. } = Node::heading(depth, vec![]) {
                prop_assert!((1..=MAX_HEADING_DEPTH).contains(&depth));
            }
        }

        // Property: root word count is the sum of block word counts
        #[test]
        fn prop_root_word_count_sum(blocks in prop::collection::vec(block_strategy(), 0..8)) {
            let expected: usize = blocks.iter().map(Node::word_count).sum();
            prop_assert_eq!(Node::root(blocks).word_count(), expected);
        }

        // Property: serde roundtrip preserves the tree
        #[test]
        fn prop_node_serde_roundtrip(blocks in prop::collection::vec(block_strategy(), 0..8)) {
            let doc = Node::root(blocks);
            let json = serde_json::to_string(&doc).expect("serialize");
            let back: Node = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(doc, back);
        }
    }
}
