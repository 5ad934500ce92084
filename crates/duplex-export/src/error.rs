// SPDX-License-Identifier: AGPL-3.0-or-later
//! Export error types

use thiserror::Error;

/// Failure to load an image's bytes.
///
/// These never abort an export: the renderers apply their own fallback.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Reading {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported asset reference: {0}")]
    Unsupported(String),
}

/// Error type for export operations
#[derive(Debug, Error)]
pub enum ExportError {
    /// The artifact could not be assembled
    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid export configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
