// SPDX-License-Identifier: AGPL-3.0-or-later
//! Image byte loading for export
//!
//! Remote references are fetched over HTTP, local absolute paths are read
//! from disk, and inline `data:` references are decoded in place.

use crate::config::ExportConfig;
use crate::error::{AssetError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use duplex_core::AssetRef;
use tracing::debug;

/// Source of image bytes.
///
/// Called once per distinct reference, in document order.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load_bytes(&self, reference: &str) -> std::result::Result<Vec<u8>, AssetError>;
}

/// Default loader: reqwest for remote URLs, tokio fs for local paths
pub struct AssetResolver {
    client: reqwest::Client,
}

impl AssetResolver {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, AssetError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AssetError::Unsupported(url.to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| AssetError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AssetError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| AssetError::Fetch {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    async fn read(&self, path: &str) -> std::result::Result<Vec<u8>, AssetError> {
        tokio::fs::read(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.to_string())
            } else {
                AssetError::Io {
                    path: path.to_string(),
                    source,
                }
            }
        })
    }
}

#[async_trait]
impl AssetLoader for AssetResolver {
    async fn load_bytes(&self, reference: &str) -> std::result::Result<Vec<u8>, AssetError> {
        if let Some(bytes) = decode_data_uri(reference) {
            return bytes;
        }

        let asset = AssetRef::new(reference);
        debug!(reference, kind = ?asset.kind, "loading image");
        if asset.is_local() {
            self.read(&asset.location).await
        } else {
            self.fetch(&asset.location).await
        }
    }
}

/// Decode a base64 `data:` reference.
///
/// Returns `None` when the reference is not a data URI at all.
pub(crate) fn decode_data_uri(reference: &str) -> Option<std::result::Result<Vec<u8>, AssetError>> {
    let rest = reference.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err(AssetError::Unsupported(reference.to_string())));
    };
    if !header.ends_with(";base64") {
        return Some(Err(AssetError::Unsupported(reference.to_string())));
    }
    Some(
        STANDARD
            .decode(payload.trim())
            .map_err(|_| AssetError::Unsupported(reference.to_string())),
    )
}
