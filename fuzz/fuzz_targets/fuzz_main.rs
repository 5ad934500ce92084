// SPDX-License-Identifier: AGPL-3.0-or-later
#![no_main]

use duplex_core::{parse_markdown, serialize_markdown};
use duplex_export::html::render_body;
use duplex_export::MediaMap;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(markup) = std::str::from_utf8(data) else {
        return;
    };

    let doc = parse_markdown(markup);
    let serialized = serialize_markdown(&doc);
    let _ = parse_markdown(&serialized);
    let _ = render_body(&doc, &MediaMap::new());
});
