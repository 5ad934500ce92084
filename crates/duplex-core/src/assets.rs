// SPDX-License-Identifier: AGPL-3.0-or-later
//! Image reference classification and normalization
//!
//! References found in markup are either remote URLs or absolute local paths,
//! possibly percent-encoded, prefixed with `file://`, or carrying a stray
//! separator in front of a Windows drive letter (`/C:/...`). Everything here is
//! pure; byte loading lives in the export crate.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where an image reference points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Remote,
    LocalAbsolute,
}

/// A classified image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub kind: AssetKind,
    /// The normalized path for local references, the reference untouched
    /// for remote ones
    pub location: String,
}

impl AssetRef {
    pub fn new(reference: &str) -> Self {
        let normalized = normalize(reference);
        if is_local_absolute(&normalized) {
            Self {
                kind: AssetKind::LocalAbsolute,
                location: normalized,
            }
        } else {
            Self {
                kind: AssetKind::Remote,
                location: reference.to_string(),
            }
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind == AssetKind::LocalAbsolute
    }
}

/// Classify a reference after normalizing it
pub fn classify(reference: &str) -> AssetKind {
    AssetRef::new(reference).kind
}

/// Percent-decode, strip a `file://` scheme, then strip one separator that
/// precedes a drive letter.
///
/// A reference that does not decode to UTF-8 is kept as written.
pub fn normalize(reference: &str) -> String {
    let decoded = match urlencoding::decode(reference) {
        Ok(decoded) => decoded.into_owned(),
        Err(err) => {
            debug!(reference, error = %err, "percent-decoding failed, using reference as written");
            reference.to_string()
        }
    };

    let without_scheme = match decoded.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("file://") => &decoded[7..],
        _ => decoded.as_str(),
    };

    match without_scheme.strip_prefix(['/', '\\']) {
        Some(rest) if starts_with_drive(rest) => rest.to_string(),
        _ => without_scheme.to_string(),
    }
}

/// `C:\...`, `C:/...`, or `/...` (but not protocol-relative `//host/...`)
pub fn is_local_absolute(path: &str) -> bool {
    if starts_with_drive(path) {
        return matches!(path.as_bytes().get(2), Some(b'/' | b'\\'));
    }
    path.starts_with('/') && !path.starts_with("//")
}

fn starts_with_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Platform bridge turning a local path into something the rich view can
/// display (an asset-protocol URL in a webview, for instance)
pub trait DisplayBridge: Send + Sync {
    fn convert_file_src(&self, path: &str) -> String;
}

/// Asset-protocol bridge: `asset://localhost/<percent-encoded path>`
#[derive(Debug, Clone)]
pub struct AssetProtocol {
    base: String,
}

impl AssetProtocol {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl Default for AssetProtocol {
    fn default() -> Self {
        Self::new("asset://localhost/")
    }
}

impl DisplayBridge for AssetProtocol {
    fn convert_file_src(&self, path: &str) -> String {
        format!("{}{}", self.base, urlencoding::encode(path))
    }
}

/// Reference to show on screen; never used for serialization.
pub fn resolve_for_display(reference: &str, bridge: &dyn DisplayBridge) -> String {
    let asset = AssetRef::new(reference);
    match asset.kind {
        AssetKind::Remote => reference.to_string(),
        AssetKind::LocalAbsolute => bridge.convert_file_src(&asset.location),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_windows_path() {
        assert_eq!(classify("C:\\a\\b.png"), AssetKind::LocalAbsolute);
    }

    #[test]
    fn test_classify_unix_path() {
        assert_eq!(classify("/home/u/b.png"), AssetKind::LocalAbsolute);
    }

    #[test]
    fn test_classify_remote() {
        assert_eq!(classify("https://x/y.png"), AssetKind::Remote);
        assert_eq!(classify("//cdn.example.com/y.png"), AssetKind::Remote);
        assert_eq!(classify("img/relative.png"), AssetKind::Remote);
    }

    #[test]
    fn test_file_url_with_drive() {
        let asset = AssetRef::new("file:///C:/a/b.png");
        assert_eq!(asset.kind, AssetKind::LocalAbsolute);
        assert_eq!(asset.location, "C:/a/b.png");
    }

    #[test]
    fn test_file_url_unix() {
        let asset = AssetRef::new("file:///home/u/shot%201.png");
        assert_eq!(asset.kind, AssetKind::LocalAbsolute);
        assert_eq!(asset.location, "/home/u/shot 1.png");
    }

    #[test]
    fn test_stray_separator_before_drive() {
        assert_eq!(normalize("/D:/shots/1.png"), "D:/shots/1.png");
        assert_eq!(normalize("\\D:\\shots\\1.png"), "D:\\shots\\1.png");
    }

    #[test]
    fn test_malformed_encoding_passes_through() {
        assert_eq!(normalize("/tmp/%FF.png"), "/tmp/%FF.png");
        assert_eq!(classify("/tmp/%FF.png"), AssetKind::LocalAbsolute);
    }

    #[test]
    fn test_remote_location_is_untouched() {
        let asset = AssetRef::new("https://x/a%20b.png");
        assert_eq!(asset.location, "https://x/a%20b.png");
        assert!(!asset.is_local());
        assert!(AssetRef::new("file:///C:/img/a.png").is_local());
    }

    #[test]
    fn test_resolve_for_display() {
        let bridge = AssetProtocol::default();
        assert_eq!(
            resolve_for_display("https://x/y.png", &bridge),
            "https://x/y.png"
        );
        assert_eq!(
            resolve_for_display("/home/u/b.png", &bridge),
            "asset://localhost/%2Fhome%2Fu%2Fb.png"
        );
    }
}
