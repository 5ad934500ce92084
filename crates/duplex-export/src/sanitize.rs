// SPDX-License-Identifier: AGPL-3.0-or-later
//! Portable artifact file names

use crate::ExportFormat;

const MAX_FILE_NAME: usize = 255;
const FALLBACK_NAME: &str = "untitled";

const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make `name` safe as a file name on Windows, macOS and Linux.
///
/// Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    sanitize_with_limit(name, MAX_FILE_NAME)
}

/// Sanitized title plus the format's extension, within the length limit
pub fn artifact_file_name(title: &str, format: ExportFormat) -> String {
    let extension = format.extension();
    let stem = sanitize_with_limit(title, MAX_FILE_NAME - extension.len() - 1);
    format!("{stem}.{extension}")
}

fn sanitize_with_limit(name: &str, limit: usize) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if INVALID_CHARS.contains(&c) || c.is_control() || c == ' ' {
            '_'
        } else {
            c
        };
        if c == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(c);
    }

    let mut sanitized = trim_dots_and_spaces(&sanitized).to_string();

    let base = sanitized.split('.').next().unwrap_or_default().to_uppercase();
    if RESERVED_NAMES.contains(&base.as_str()) {
        sanitized.insert(0, '_');
    }

    if sanitized.len() > limit {
        let mut end = limit;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized.truncate(end);
        sanitized = trim_dots_and_spaces(&sanitized).to_string();
    }

    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

fn trim_dots_and_spaces(name: &str) -> &str {
    name.trim_matches(|c| c == '.' || c == ' ')
}
