// SPDX-License-Identifier: AGPL-3.0-or-later
//! Parser and serializer traits, their configuration, and the core error type

use crate::ast::Node;

/// Error type for view synchronization
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The rich view's markup serializer is not initialized yet
    #[error("Serialization unavailable: {0}")]
    SerializationUnavailable(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Configuration for parsing
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Recognize GFM pipe tables
    pub tables: bool,
    /// Turn bare URLs into links
    pub autolink: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            tables: true,
            autolink: false,
        }
    }
}

/// Configuration for markup serialization
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Marker for bullet list items
    pub bullet: char,
    /// Marker for emphasis (`*` or `_`)
    pub emphasis: char,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bullet: '-',
            emphasis: '*',
        }
    }
}

/// Parser trait: markup text to AST.
///
/// Parsing never fails; malformed input yields a best-effort tree.
pub trait Parser: Send + Sync {
    fn parse(&self, input: &str, config: &ParseConfig) -> Node;
}

/// Serializer trait: AST back to markup text
pub trait Serializer: Send + Sync {
    fn serialize(&self, doc: &Node, config: &RenderConfig) -> String;
}

/// Parse then serialize with default configuration.
///
/// This is the conversion the rich view performs when it loads markup and
/// emits it again.
pub fn normalize_markup<H: Parser + Serializer>(handler: &H, input: &str) -> String {
    let doc = handler.parse(input, &ParseConfig::default());
    handler.serialize(&doc, &RenderConfig::default())
}
