// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command implementations for document operations

use anyhow::{bail, Context, Result};
use duplex_core::formats::MarkdownHandler;
use duplex_core::traits::normalize_markup;
use duplex_core::Document;
use duplex_export::{export_document, AssetResolver, ExportConfig, ExportFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Document summary printed by `duplex stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub path: String,
    pub title: Option<String>,
    pub word_count: usize,
    pub char_count: usize,
    /// Whether the file is already in canonical form
    pub canonical: bool,
}

/// Load a markdown document from the filesystem
pub async fn load_document(path: &Path) -> Result<Document> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Document::new(content))
}

/// Export `input` into `out_dir`, returning the written path
pub async fn export(
    input: &Path,
    format: ExportFormat,
    out_dir: &Path,
    config_path: Option<&Path>,
    title: Option<String>,
) -> Result<PathBuf> {
    let mut config = match config_path {
        Some(path) => ExportConfig::load(path)
            .await
            .with_context(|| format!("Failed to load export config {}", path.display()))?,
        None => ExportConfig::default(),
    };
    if title.is_some() {
        config.title = title;
    }

    let document = load_document(input).await?;
    let resolver = AssetResolver::new(&config)?;
    let artifact = export_document(&document, format, &resolver, &config)
        .await
        .with_context(|| format!("Failed to export {}", input.display()))?;

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let path = artifact
        .write_to_dir(out_dir)
        .await
        .with_context(|| format!("Failed to write into {}", out_dir.display()))?;
    info!(path = %path.display(), "artifact written");
    Ok(path)
}

/// Canonical serialization of `input`, as the rich view would emit it.
///
/// With `check`, fails when the file is not already canonical.
pub async fn roundtrip(input: &Path, check: bool) -> Result<String> {
    let document = load_document(input).await?;
    let canonical = normalize_markup(&MarkdownHandler::new(), document.canonical_text());
    if check && canonical != document.canonical_text() {
        bail!("{} is not in canonical form", input.display());
    }
    Ok(canonical)
}

pub async fn stats(input: &Path) -> Result<DocumentReport> {
    let document = load_document(input).await?;
    let stats = document.stats();
    Ok(DocumentReport {
        path: input.display().to_string(),
        title: document.title(),
        word_count: stats.word_count,
        char_count: stats.char_count,
        canonical: normalize_markup(&MarkdownHandler::new(), document.canonical_text())
            == document.canonical_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_roundtrip_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.md", "Title\n=====\n\n* a\n* b\n");

        assert_eq!(roundtrip(&input, false).await.unwrap(), "# Title\n\n- a\n- b\n");
        assert!(roundtrip(&input, true).await.is_err());
    }

    #[tokio::test]
    async fn test_export_writes_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.md", "# Q3 / Plan\n\nbody\n");
        let out = dir.path().join("out");

        let path = export(&input, ExportFormat::Html, &out, None, None)
            .await
            .unwrap();
        assert_eq!(path, out.join("Q3_Plan.html"));
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.contains("<p>body</p>"));
    }

    #[tokio::test]
    async fn test_export_title_override_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.md", "# Heading\n");
        let config = write(dir.path(), "export.toml", "title = \"From config\"\n");

        let path = export(
            &input,
            ExportFormat::Docx,
            dir.path(),
            Some(&config),
            Some("From flag".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(path, dir.path().join("From_flag.docx"));
    }

    #[tokio::test]
    async fn test_missing_input_is_reported() {
        let err = stats(Path::new("/no/such/file.md")).await.unwrap_err();
        assert!(err.to_string().contains("/no/such/file.md"));
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "in.md", "# Notes\n\nthree small words\n");

        let report = stats(&input).await.unwrap();
        assert_eq!(report.title.as_deref(), Some("Notes"));
        assert_eq!(report.word_count, 4);
        assert!(report.canonical);
    }
}
