// SPDX-License-Identifier: AGPL-3.0-or-later
//! Duplex Export - HTML and DOCX artifacts from canonical markup
//!
//! An export parses the markup once, loads every referenced image in document
//! order, then hands the tree and the loaded media to a synchronous renderer.
//! Unreachable images never fail an export; only packaging errors propagate.

pub mod config;
pub mod docx;
pub mod error;
pub mod html;
pub mod loader;
pub mod media;
pub mod sanitize;

pub use config::ExportConfig;
pub use docx::DocxRenderer;
pub use error::{AssetError, ExportError, Result};
pub use html::HtmlRenderer;
pub use loader::{AssetLoader, AssetResolver};
pub use media::{mime_type, Media, MediaMap};
pub use sanitize::{artifact_file_name, sanitize_filename};

use duplex_core::{parse_markdown, Document, Node};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

const DEFAULT_TITLE: &str = "Untitled";

/// Target artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Docx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Html, ExportFormat::Docx];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ExportFormat::Html),
            "docx" | "word" => Ok(ExportFormat::Docx),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// A rendered, write-once export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Write into `dir` under the artifact's file name
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// Export canonical markup text
pub async fn export_markup(
    markup: &str,
    format: ExportFormat,
    loader: &dyn AssetLoader,
    config: &ExportConfig,
) -> Result<Artifact> {
    let doc = parse_markdown(markup);
    let title = config
        .title
        .clone()
        .or_else(|| doc.first_heading())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    export_tree(&doc, &title, format, loader, config).await
}

/// Export a document, preferring its own title over the first heading
pub async fn export_document(
    document: &Document,
    format: ExportFormat,
    loader: &dyn AssetLoader,
    config: &ExportConfig,
) -> Result<Artifact> {
    let doc = document.parse();
    let title = config
        .title
        .clone()
        .or_else(|| document.meta.title.clone())
        .or_else(|| doc.first_heading())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    export_tree(&doc, &title, format, loader, config).await
}

async fn export_tree(
    doc: &Node,
    title: &str,
    format: ExportFormat,
    loader: &dyn AssetLoader,
    config: &ExportConfig,
) -> Result<Artifact> {
    let media = MediaMap::materialize(doc, loader).await;

    let bytes = match format {
        ExportFormat::Html => HtmlRenderer::new(config)
            .render(doc, &media, title)
            .into_bytes(),
        ExportFormat::Docx => DocxRenderer::new(config).render(doc, &media)?,
    };

    let artifact = Artifact {
        format,
        file_name: artifact_file_name(title, format),
        bytes,
    };
    info!(
        format = %format,
        mime = format.mime_type(),
        file_name = %artifact.file_name,
        images = media.len(),
        bytes = artifact.bytes.len(),
        "export complete"
    );
    Ok(artifact)
}
