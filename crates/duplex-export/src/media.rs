// SPDX-License-Identifier: AGPL-3.0-or-later
//! Media materialization
//!
//! Image bytes are loaded before rendering, one reference at a time in
//! document order. The renderers are synchronous and only look up what this
//! pass produced.

use crate::loader::AssetLoader;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use duplex_core::Node;
use std::collections::HashMap;
use tracing::warn;

/// Bytes of one loaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Media {
    pub fn new(reference: &str, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: mime_type(reference).to_string(),
        }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Loaded images keyed by the reference as written in the markup.
///
/// References that failed to load are absent.
#[derive(Debug, Clone, Default)]
pub struct MediaMap {
    loaded: HashMap<String, Media>,
}

impl MediaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every image of `doc` through `loader`.
    pub async fn materialize(doc: &Node, loader: &dyn AssetLoader) -> Self {
        let mut media = Self::new();
        for reference in image_references(doc) {
            match loader.load_bytes(reference).await {
                Ok(bytes) => media.insert(reference, bytes),
                Err(err) => warn!(reference, error = %err, "image unreachable"),
            }
        }
        media
    }

    pub fn insert(&mut self, reference: &str, bytes: Vec<u8>) {
        self.loaded
            .insert(reference.to_string(), Media::new(reference, bytes));
    }

    pub fn get(&self, reference: &str) -> Option<&Media> {
        self.loaded.get(reference)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

/// Distinct image references in document order
pub fn image_references(doc: &Node) -> Vec<&str> {
    let mut refs: Vec<&str> = Vec::new();
    doc.walk(&mut |node| {
        if let Node::Image { url, .. } = node {
            if !refs.contains(&url.as_str()) {
                refs.push(url);
            }
        }
    });
    refs
}

/// MIME type from a reference's file extension.
///
/// `data:` references carry their own type.
pub fn mime_type(reference: &str) -> &str {
    if let Some(rest) = reference.strip_prefix("data:") {
        if let Some(mime) = rest.split([';', ',']).next().filter(|m| !m.is_empty()) {
            return mime;
        }
    }

    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.contains(['/', '\\']))
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
