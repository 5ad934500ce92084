// SPDX-License-Identifier: AGPL-3.0-or-later
//! Export configuration, loadable from TOML

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// English Metric Units per pixel at 96 DPI
const EMU_PER_PIXEL: u32 = 9525;

/// Settings shared by both renderers and the asset loader.
///
/// Every field is optional in TOML; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Overrides the title derived from the first heading
    pub title: Option<String>,
    /// Extra CSS appended to the built-in stylesheet
    pub stylesheet: Option<String>,
    /// Embed width for word-processor pictures
    pub image_width_px: u32,
    /// Embed height for word-processor pictures
    pub image_height_px: u32,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: None,
            stylesheet: None,
            image_width_px: 480,
            image_height_px: 320,
            fetch_timeout_secs: 30,
            user_agent: concat!("duplex-docs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ExportConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let input = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&input)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Picture extent in EMU, as the word-processor format expects
    pub fn image_size_emu(&self) -> (u32, u32) {
        (
            self.image_width_px.saturating_mul(EMU_PER_PIXEL),
            self.image_height_px.saturating_mul(EMU_PER_PIXEL),
        )
    }
}
