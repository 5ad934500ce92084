// SPDX-License-Identifier: AGPL-3.0-or-later
//! Duplex Core - Markdown document model and view synchronization
//!
//! This crate provides:
//! - A closed markdown AST with a transparent fallback for unknown nodes
//! - A comrak-backed parser and a stable markup serializer
//! - Image reference classification and display resolution
//! - The rich view contract and an in-memory structured view
//! - The controller keeping the rich and source views in sync

pub mod assets;
pub mod ast;
pub mod document;
pub mod formats;
pub mod rich;
pub mod sync;
pub mod traits;

pub use assets::{classify, normalize, AssetKind, AssetRef, DisplayBridge};
pub use ast::{Node, TableRow};
pub use document::{Document, DocumentMeta, DocumentStats};
pub use formats::markdown::{parse_markdown, serialize_markdown};
pub use rich::{ChangeNotifier, ImageNode, RichNode, RichView, StructuredView};
pub use sync::{ActiveView, SourceView, SwitchOutcome, SyncController, TextBuffer};
pub use traits::{ParseConfig, Parser, RenderConfig, Result, Serializer, SyncError};
