// SPDX-License-Identifier: AGPL-3.0-or-later
//! Markdown format handler using comrak
//!
//! Parsing maps comrak's tree onto [`Node`]; serialization is the inverse for
//! the known node set and escapes text so that a second parse/serialize pass
//! is stable.

use crate::ast::{Node, TableRow};
use crate::traits::{ParseConfig, Parser, RenderConfig, Serializer};
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, Options};
use tracing::trace;

const HARD_BREAK: &str = "\\\n";

/// Markdown format handler using comrak (CommonMark + tables)
pub struct MarkdownHandler;

impl MarkdownHandler {
    pub fn new() -> Self {
        Self
    }

    fn comrak_options(config: &ParseConfig) -> Options<'static> {
        let mut options = Options::default();
        options.extension.table = config.tables;
        options.extension.autolink = config.autolink;
        options
    }
}

impl Default for MarkdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse markup with the default dialect
pub fn parse_markdown(input: &str) -> Node {
    MarkdownHandler::new().parse(input, &ParseConfig::default())
}

/// Serialize a tree with the default markers
pub fn serialize_markdown(doc: &Node) -> String {
    MarkdownHandler::new().serialize(doc, &RenderConfig::default())
}

impl Parser for MarkdownHandler {
    fn parse(&self, input: &str, config: &ParseConfig) -> Node {
        let arena = Arena::new();
        let options = Self::comrak_options(config);
        let root = parse_document(&arena, input, &options);

        Node::root(parse_children(root))
    }
}

fn parse_children<'a>(node: &'a AstNode<'a>) -> Vec<Node> {
    let nodes = node.children().filter_map(parse_node).collect();
    merge_text(nodes)
}

/// Join adjacent text runs; comrak splits text around soft breaks and
/// unmatched delimiters.
fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Node::Text { value } = &node {
            if let Some(Node::Text { value: prev }) = merged.last_mut() {
                prev.push_str(value);
                continue;
            }
        }
        merged.push(node);
    }
    merged
}

fn parse_node<'a>(node: &'a AstNode<'a>) -> Option<Node> {
    let data = node.data.borrow();

    let parsed = match &data.value {
        NodeValue::Document => Node::root(parse_children(node)),

        NodeValue::FrontMatter(_) => return None,

        NodeValue::Paragraph => Node::paragraph(parse_children(node)),

        NodeValue::Heading(heading) => Node::heading(heading.level, parse_children(node)),

        NodeValue::CodeBlock(code) => Node::Code {
            value: code
                .literal
                .strip_suffix('\n')
                .unwrap_or(&code.literal)
                .to_string(),
            language: code.info.split_whitespace().next().map(str::to_string),
        },

        NodeValue::BlockQuote => Node::Blockquote {
            children: parse_children(node),
        },

        NodeValue::List(list) => Node::List {
            ordered: list.list_type == ListType::Ordered,
            items: node
                .children()
                .map(|item| Node::ListItem {
                    children: parse_children(item),
                })
                .collect(),
        },

        NodeValue::ThematicBreak => Node::ThematicBreak,

        NodeValue::Table(_) => Node::Table {
            rows: node
                .children()
                .filter_map(|row| match row.data.borrow().value {
                    NodeValue::TableRow(header) => Some(TableRow {
                        header,
                        cells: row.children().map(parse_children).collect(),
                    }),
                    _ => None,
                })
                .collect(),
        },

        NodeValue::HtmlBlock(html) => Node::RawMarkup {
            value: html.literal.trim_end().to_string(),
        },

        NodeValue::Text(text) => Node::text(text.clone()),

        NodeValue::SoftBreak => Node::text(" "),

        NodeValue::LineBreak => Node::LineBreak,

        NodeValue::Code(code) => Node::InlineCode {
            value: code.literal.clone(),
        },

        NodeValue::Emph => Node::Emphasis {
            children: parse_children(node),
        },

        NodeValue::Strong => Node::Strong {
            children: parse_children(node),
        },

        NodeValue::Link(link) => Node::Link {
            url: link.url.clone(),
            children: parse_children(node),
        },

        NodeValue::Image(image) => {
            let mut alt = String::new();
            collect_text(node, &mut alt);
            Node::Image {
                url: image.url.clone(),
                alt: Some(alt).filter(|a| !a.is_empty()),
            }
        }

        NodeValue::HtmlInline(html) => Node::RawMarkup {
            value: html.clone(),
        },

        other => {
            let kind = node_kind(other).to_string();
            trace!(kind = %kind, "keeping unrecognized markdown node as transparent");
            Node::Other {
                kind,
                children: parse_children(node),
            }
        }
    };

    Some(parsed)
}

/// Name of a comrak node the tree has no variant for
fn node_kind(value: &NodeValue) -> &'static str {
    match value {
        NodeValue::Strikethrough { .. } => "strikethrough",
        NodeValue::Superscript { .. } => "superscript",
        NodeValue::Underline { .. } => "underline",
        NodeValue::SpoileredText { .. } => "spoilered_text",
        NodeValue::FootnoteDefinition { .. } => "footnote_definition",
        NodeValue::FootnoteReference { .. } => "footnote_reference",
        NodeValue::TaskItem { .. } => "task_item",
        NodeValue::DescriptionList { .. } => "description_list",
        NodeValue::DescriptionItem { .. } => "description_item",
        NodeValue::DescriptionTerm { .. } => "description_term",
        NodeValue::DescriptionDetails { .. } => "description_details",
        NodeValue::Math { .. } => "math",
        NodeValue::MultilineBlockQuote { .. } => "multiline_block_quote",
        NodeValue::WikiLink { .. } => "wikilink",
        NodeValue::Item { .. } => "item",
        NodeValue::TableRow { .. } => "table_row",
        NodeValue::TableCell { .. } => "table_cell",
        _ => "unknown",
    }
}

fn collect_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(text) => out.push_str(text),
            NodeValue::Code(code) => out.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => collect_text(child, out),
        }
    }
}

impl Serializer for MarkdownHandler {
    fn serialize(&self, doc: &Node, config: &RenderConfig) -> String {
        let mut output = render_block(doc, config);
        if !output.is_empty() {
            output.push('\n');
        }
        output
    }
}

fn render_blocks(blocks: &[Node], config: &RenderConfig) -> String {
    blocks
        .iter()
        .map(|block| render_block(block, config))
        .filter(|rendered| !rendered.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Like [`render_blocks`], but a sublist directly follows its lead paragraph
/// so that tight lists stay tight.
fn render_item_blocks(blocks: &[Node], config: &RenderConfig) -> String {
    let mut output = String::new();
    let mut previous: Option<&Node> = None;
    for block in blocks {
        let rendered = render_block(block, config);
        if rendered.is_empty() {
            continue;
        }
        if let Some(previous) = previous {
            let tight = matches!(previous, Node::Paragraph { .. })
                && matches!(block, Node::List { .. });
            output.push_str(if tight { "\n" } else { "\n\n" });
        }
        output.push_str(&rendered);
        previous = Some(block);
    }
    output
}

fn render_block(block: &Node, config: &RenderConfig) -> String {
    match block {
        Node::Root { children } | Node::Other { children, .. } => render_blocks(children, config),

        // Every line after a hard break starts a line of its own.
        Node::Paragraph { children } => render_inlines(children, config)
            .split(HARD_BREAK)
            .map(escape_line_start)
            .collect::<Vec<_>>()
            .join(HARD_BREAK),

        // ATX headings are single-line; breaks from setext headings become spaces.
        Node::Heading { depth, children } => {
            let text = render_inlines(children, config)
                .replace(HARD_BREAK, " ")
                .replace('\n', " ");
            format!(
                "{} {}",
                "#".repeat(*depth as usize),
                escape_closing_sequence(text.trim())
            )
        }

        Node::Code { value, language } => {
            let fence = "`".repeat(longest_run(value, '`').max(2) + 1);
            format!(
                "{fence}{}\n{value}\n{fence}",
                language.as_deref().unwrap_or("")
            )
        }

        Node::Blockquote { children } => prefix_lines(&render_blocks(children, config), "> ", ">"),

        Node::List { ordered, items } => {
            let mut output = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let marker = if *ordered {
                    format!("{}. ", i + 1)
                } else {
                    format!("{} ", config.bullet)
                };
                let content = match item {
                    Node::ListItem { children } => render_item_blocks(children, config),
                    other => render_block(other, config),
                };
                output.push(list_item(&marker, &content));
            }
            output.join("\n")
        }

        Node::ListItem { children } => render_blocks(children, config),

        Node::ThematicBreak => "---".to_string(),

        Node::RawMarkup { value } => value.clone(),

        Node::Table { rows } => render_table(rows, config),

        inline => render_inline(inline, config),
    }
}

fn render_table(rows: &[TableRow], config: &RenderConfig) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let columns = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0).max(1);
    let render_row = |row: &TableRow| {
        let mut line = String::from("|");
        for i in 0..columns {
            let cell = row
                .cells
                .get(i)
                .map(|cell| render_inlines(cell, config).replace('|', "\\|"))
                .unwrap_or_default();
            line.push(' ');
            line.push_str(cell.trim());
            line.push_str(" |");
        }
        line
    };

    let mut lines = vec![render_row(first), format!("|{}", " --- |".repeat(columns))];
    lines.extend(rows.iter().skip(1).map(render_row));
    lines.join("\n")
}

fn render_inlines(nodes: &[Node], config: &RenderConfig) -> String {
    nodes.iter().map(|node| render_inline(node, config)).collect()
}

fn render_inline(node: &Node, config: &RenderConfig) -> String {
    match node {
        Node::Text { value } => escape_text(value),

        Node::Strong { children } => format!("**{}**", render_inlines(children, config)),

        Node::Emphasis { children } => {
            let marker = config.emphasis;
            format!("{marker}{}{marker}", render_inlines(children, config))
        }

        Node::InlineCode { value } => {
            let fence = "`".repeat(longest_run(value, '`') + 1);
            let pad = value.starts_with('`')
                || value.ends_with('`')
                || (value.starts_with(' ') && value.ends_with(' ') && !value.trim().is_empty());
            if pad {
                format!("{fence} {value} {fence}")
            } else {
                format!("{fence}{value}{fence}")
            }
        }

        Node::Link { url, children } => {
            format!("[{}]({})", render_inlines(children, config), destination(url))
        }

        Node::Image { url, alt } => format!(
            "![{}]({})",
            escape_text(alt.as_deref().unwrap_or("")),
            destination(url)
        ),

        Node::LineBreak => HARD_BREAK.to_string(),

        Node::RawMarkup { value } => value.clone(),

        other => render_inlines(other.children(), config),
    }
}

fn list_item(marker: &str, content: &str) -> String {
    let indent = " ".repeat(marker.len());
    let mut lines = content.lines();
    let mut output = format!("{marker}{}", lines.next().unwrap_or(""));
    for line in lines {
        output.push('\n');
        if !line.is_empty() {
            output.push_str(&indent);
            output.push_str(line);
        }
    }
    output.trim_end().to_string()
}

fn prefix_lines(content: &str, prefix: &str, empty: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                empty.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn destination(url: &str) -> String {
    let needs_brackets = url.is_empty() || url.contains([' ', '(', ')', '<', '>']);
    if needs_brackets {
        format!("<{}>", url.replace('<', "\\<").replace('>', "\\>"))
    } else {
        url.to_string()
    }
}

fn escape_text(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' => {
                output.push('\\');
                output.push(c);
            }
            '&' if looks_like_entity(&text[i + 1..]) => output.push_str("\\&"),
            _ => output.push(c),
        }
    }
    output
}

fn looks_like_entity(rest: &str) -> bool {
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '#')
        .collect();
    !name.is_empty() && rest[name.len()..].starts_with(';')
}

/// A trailing `#` run would be read back as the heading's closing sequence
fn escape_closing_sequence(text: &str) -> String {
    let content = text.trim_end_matches('#');
    if content.len() == text.len() {
        return text.to_string();
    }
    format!("{content}\\{}", &text[content.len()..])
}

/// Escape text that would otherwise open a block construct at line start
fn escape_line_start(paragraph: &str) -> String {
    let trimmed = paragraph.trim_start();
    if trimmed.starts_with(['#', '>', '-', '+', '=', '~', '|']) {
        return format!("\\{trimmed}");
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && trimmed[digits..].starts_with(['.', ')']) {
        return format!("{}\\{}", &trimmed[..digits], &trimmed[digits..]);
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_kind_names_unhandled_nodes() {
        assert_eq!(node_kind(&NodeValue::Strikethrough), "strikethrough");
        assert_eq!(node_kind(&NodeValue::Paragraph), "unknown");
    }

    #[test]
    fn test_parse_heading() {
        let doc = parse_markdown("# Hello World");

        assert_eq!(
            doc,
            Node::root(vec![Node::heading(1, vec![Node::text("Hello World")])])
        );
    }

    #[test]
    fn test_parse_paragraph() {
        let doc = parse_markdown("Hello **world**.");

        assert_eq!(
            doc,
            Node::root(vec![Node::paragraph(vec![
                Node::text("Hello "),
                Node::Strong {
                    children: vec![Node::text("world")]
                },
                Node::text("."),
            ])])
        );
    }

    #[test]
    fn test_parse_deep_heading_clamps() {
        let doc = parse_markdown("##### Deep");
        assert!(matches!(doc.children()[0], Node::Heading { depth: 3, .. }));
    }

    #[test]
    fn test_parse_windows_image_path() {
        let doc = parse_markdown("![alt](C:\\img\\a.png)");
        assert_eq!(
            doc.children()[0],
            Node::paragraph(vec![Node::Image {
                url: "C:\\img\\a.png".to_string(),
                alt: Some("alt".to_string()),
            }])
        );
    }

    #[test]
    fn test_parse_code_block_language() {
        let doc = parse_markdown("```rust ignore\nfn main() {}\n```");
        assert_eq!(
            doc.children()[0],
            Node::Code {
                value: "fn main() {}".to_string(),
                language: Some("rust".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_table() {
        let doc = parse_markdown("| a | b |\n| --- | --- |\n| 1 | 2 |");
        let Node::Table { rows } = &doc.children()[0] else {
            panic!("Expected table");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows[0].header);
        assert_eq!(rows[1].cells[1], vec![Node::text("2")]);
    }

    #[test]
    fn test_soft_breaks_merge_into_text() {
        let doc = parse_markdown("one\ntwo");
        assert_eq!(
            doc.children()[0],
            Node::paragraph(vec![Node::text("one two")])
        );
    }

    #[test]
    fn test_malformed_input_still_parses() {
        let doc = parse_markdown("**unclosed [link](\n> ```\n|||");
        assert!(!doc.children().is_empty());
    }

    #[test]
    fn test_serialize_document() {
        let doc = parse_markdown("# Title\n\nHello **world**.\n\n- one\n- two\n\n> quoted\n");
        assert_eq!(
            serialize_markdown(&doc),
            "# Title\n\nHello **world**.\n\n- one\n- two\n\n> quoted\n"
        );
    }

    #[test]
    fn test_serialize_escapes_literal_markup() {
        let doc = Node::root(vec![Node::paragraph(vec![Node::text(
            "# not a heading *nor* [a link]",
        )])]);
        let markup = serialize_markdown(&doc);
        assert_eq!(markup, "\\# not a heading \\*nor\\* \\[a link\\]\n");
        assert_eq!(parse_markdown(&markup), doc);
    }

    #[test]
    fn test_serialize_ordered_list_marker_is_escaped() {
        let doc = Node::root(vec![Node::paragraph(vec![Node::text("2024. A year")])]);
        assert_eq!(parse_markdown(&serialize_markdown(&doc)), doc);
    }

    #[test]
    fn test_serialize_nested_list() {
        let input = "- outer\n  - inner\n- last\n";
        let doc = parse_markdown(input);
        assert_eq!(serialize_markdown(&doc), input);
    }

    #[test]
    fn test_serialize_code_with_backticks() {
        let doc = Node::root(vec![Node::Code {
            value: "```\nnested\n```".to_string(),
            language: None,
        }]);
        assert_eq!(parse_markdown(&serialize_markdown(&doc)), doc);
    }

    #[test]
    fn test_serialize_destination_with_spaces() {
        let doc = Node::root(vec![Node::paragraph(vec![Node::Image {
            url: "/home/u/my shot.png".to_string(),
            alt: None,
        }])]);
        let markup = serialize_markdown(&doc);
        assert_eq!(markup, "![](</home/u/my shot.png>)\n");
        assert_eq!(parse_markdown(&markup), doc);
    }

    #[test]
    fn test_serialize_table() {
        let input = "| a | b |\n| --- | --- |\n| 1 | 2 |\n";
        assert_eq!(serialize_markdown(&parse_markdown(input)), input);
    }

    #[test]
    fn test_serialize_unknown_node_is_transparent() {
        let doc = Node::root(vec![Node::Other {
            kind: "custom".to_string(),
            children: vec![Node::paragraph(vec![Node::text("inside")])],
        }]);
        assert_eq!(serialize_markdown(&doc), "inside\n");
    }
}
