// SPDX-License-Identifier: AGPL-3.0-or-later
//! Self-contained HTML rendering
//!
//! Each node maps to one element. Images come from the materialized media map
//! as data URIs; an image that failed to load keeps its original reference.

use crate::config::ExportConfig;
use crate::media::MediaMap;
use duplex_core::ast::MAX_HEADING_DEPTH;
use duplex_core::{Node, TableRow};
use tracing::trace;

const BASE_STYLESHEET: &str = "\
body { margin: 0; background: #fff; color: #1f2328; }
article { max-width: 46rem; margin: 2rem auto; padding: 0 1rem; font: 16px/1.6 system-ui, sans-serif; }
h1, h2, h3 { line-height: 1.25; margin: 1.5em 0 0.5em; }
pre { background: #f6f8fa; border: 1px solid #d0d7de; border-radius: 6px; padding: 0.75em 1em; overflow-x: auto; }
code { font-family: ui-monospace, Consolas, monospace; font-size: 0.9em; }
blockquote { margin: 0; padding: 0 1em; color: #59636e; border-left: 0.25em solid #d0d7de; }
img { max-width: 100%; }
table { border-collapse: collapse; }
th, td { border: 1px solid #d0d7de; padding: 0.3em 0.75em; }
hr { border: 0; border-top: 1px solid #d0d7de; }
";

pub struct HtmlRenderer<'a> {
    config: &'a ExportConfig,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Render a complete HTML document
    pub fn render(&self, doc: &Node, media: &MediaMap, title: &str) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n");
        out.push_str("<html lang=\"en\">\n<head>\n");
        out.push_str("<meta charset=\"utf-8\">\n");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        out.push_str(&format!("<title>{}</title>\n", escape(title)));
        out.push_str("<style>\n");
        out.push_str(BASE_STYLESHEET);
        if let Some(extra) = &self.config.stylesheet {
            out.push_str(extra);
            out.push('\n');
        }
        out.push_str("</style>\n</head>\n<body>\n<article>\n");
        out.push_str(&render_body(doc, media));
        out.push_str("</article>\n</body>\n</html>\n");
        out
    }
}

/// Render only the document body
pub fn render_body(doc: &Node, media: &MediaMap) -> String {
    let mut writer = HtmlWriter {
        out: String::new(),
        media,
    };
    writer.node(doc);
    writer.out
}

struct HtmlWriter<'a> {
    out: String,
    media: &'a MediaMap,
}

impl HtmlWriter<'_> {
    fn node(&mut self, node: &Node) {
        match node {
            Node::Root { children } => self.nodes(children),
            Node::Heading { depth, children } => {
                let depth = (*depth).clamp(1, MAX_HEADING_DEPTH);
                self.out.push_str(&format!("<h{depth}>"));
                self.nodes(children);
                self.out.push_str(&format!("</h{depth}>\n"));
            }
            Node::Paragraph { children } => self.wrap("p", children, "\n"),
            Node::Text { value } => self.out.push_str(&escape(value)),
            Node::Strong { children } => self.wrap("strong", children, ""),
            Node::Emphasis { children } => self.wrap("em", children, ""),
            Node::InlineCode { value } => {
                self.out.push_str(&format!("<code>{}</code>", escape(value)));
            }
            Node::Code { value, language } => {
                match language {
                    Some(lang) => self.out.push_str(&format!(
                        "<pre><code class=\"language-{}\">",
                        escape(lang)
                    )),
                    None => self.out.push_str("<pre><code>"),
                }
                self.out.push_str(&escape(value));
                if !value.is_empty() {
                    self.out.push('\n');
                }
                self.out.push_str("</code></pre>\n");
            }
            Node::Link { url, children } => {
                self.out.push_str(&format!("<a href=\"{}\">", escape(url)));
                self.nodes(children);
                self.out.push_str("</a>");
            }
            Node::Image { url, alt } => self.image(url, alt.as_deref().unwrap_or_default()),
            Node::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                self.out.push_str(&format!("<{tag}>\n"));
                self.nodes(items);
                self.out.push_str(&format!("</{tag}>\n"));
            }
            Node::ListItem { children } => self.list_item(children),
            Node::Blockquote { children } => {
                self.out.push_str("<blockquote>\n");
                self.nodes(children);
                self.out.push_str("</blockquote>\n");
            }
            Node::ThematicBreak => self.out.push_str("<hr>\n"),
            Node::LineBreak => self.out.push_str("<br>\n"),
            Node::RawMarkup { value } => self.out.push_str(value),
            Node::Table { rows } => self.table(rows),
            Node::Other { kind, children } => {
                trace!(kind = %kind, "rendering unknown node transparently");
                self.nodes(children);
            }
        }
    }

    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn wrap(&mut self, tag: &str, children: &[Node], after: &str) {
        self.out.push_str(&format!("<{tag}>"));
        self.nodes(children);
        self.out.push_str(&format!("</{tag}>{after}"));
    }

    fn image(&mut self, url: &str, alt: &str) {
        let src = match self.media.get(url) {
            Some(media) => media.data_uri(),
            None => escape(url),
        };
        self.out
            .push_str(&format!("<img src=\"{src}\" alt=\"{}\">", escape(alt)));
    }

    // A lone paragraph renders tight, like a list written without blank lines.
    fn list_item(&mut self, children: &[Node]) {
        self.out.push_str("<li>");
        match children {
            [Node::Paragraph { children: inline }] => self.nodes(inline),
            _ => {
                self.out.push('\n');
                self.nodes(children);
            }
        }
        self.out.push_str("</li>\n");
    }

    fn table(&mut self, rows: &[TableRow]) {
        let (head, body): (Vec<&TableRow>, Vec<&TableRow>) = rows.iter().partition(|r| r.header);
        self.out.push_str("<table>\n");
        if !head.is_empty() {
            self.out.push_str("<thead>\n");
            for row in head {
                self.row(row, "th");
            }
            self.out.push_str("</thead>\n");
        }
        if !body.is_empty() {
            self.out.push_str("<tbody>\n");
            for row in body {
                self.row(row, "td");
            }
            self.out.push_str("</tbody>\n");
        }
        self.out.push_str("</table>\n");
    }

    fn row(&mut self, row: &TableRow, cell_tag: &str) {
        self.out.push_str("<tr>");
        for cell in &row.cells {
            self.wrap(cell_tag, cell, "");
        }
        self.out.push_str("</tr>\n");
    }
}

/// Escape `& < > " '`
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
