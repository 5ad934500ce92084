// SPDX-License-Identifier: AGPL-3.0-or-later
//! Word-processor (.docx) rendering
//!
//! Headings use native heading styles, inline formatting becomes styled runs,
//! list items become level-0 bullet paragraphs (nested lists are flattened),
//! and code blocks are single-cell bordered tables in a monospace font.
//! Pictures are embedded at the configured fixed size. An image that failed to
//! load, or whose bytes cannot be decoded, is dropped.

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::media::MediaMap;
use docx_rs::{
    AbstractNumbering, AlignmentType, BreakType, Docx, Hyperlink, HyperlinkType, IndentLevel,
    Level, LevelJc, LevelText, NumberFormat, Numbering, NumberingId, Paragraph, Pic, Run,
    RunFonts, Start, Style, StyleType, Table, TableCell, TableRow,
};
use duplex_core::ast::MAX_HEADING_DEPTH;
use duplex_core::Node;
use std::io::Cursor;
use tracing::{trace, warn};

const BULLET_NUMBERING: usize = 1;
const MONOSPACE_FONT: &str = "Courier New";
const LINK_COLOR: &str = "0563C1";
const QUOTE_STYLE: &str = "Quote";
/// Usable page width in twips (A4/Letter with default margins)
const TABLE_WIDTH: usize = 9000;

pub struct DocxRenderer<'a> {
    config: &'a ExportConfig,
}

impl<'a> DocxRenderer<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Render and pack the document
    pub fn render(&self, doc: &Node, media: &MediaMap) -> Result<Vec<u8>> {
        let mut writer = DocxWriter {
            blocks: Vec::new(),
            media,
            picture_size: self.config.image_size_emu(),
        };
        writer.block(doc, None);

        let docx = writer
            .blocks
            .into_iter()
            .fold(base_document(), |docx, block| match block {
                Block::Paragraph(p) => docx.add_paragraph(p),
                Block::Table(t) => docx.add_table(t),
            });

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| ExportError::Packaging(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

fn base_document() -> Docx {
    let bullet = Level::new(
        0,
        Start::new(1),
        NumberFormat::new("bullet"),
        LevelText::new("•"),
        LevelJc::new("left"),
    );
    Docx::new()
        .add_style(heading_style(1, 32))
        .add_style(heading_style(2, 28))
        .add_style(heading_style(3, 24))
        .add_style(Style::new(QUOTE_STYLE, StyleType::Paragraph).name("Quote").italic())
        .add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING).add_level(bullet))
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
}

fn heading_style(depth: u8, half_points: usize) -> Style {
    Style::new(format!("Heading{depth}"), StyleType::Paragraph)
        .name(format!("Heading {depth}"))
        .size(half_points)
        .bold()
}

enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

enum Inline {
    Run(Run),
    Link(Hyperlink),
}

#[derive(Debug, Clone, Copy, Default)]
struct RunStyle {
    bold: bool,
    italic: bool,
    code: bool,
    link: bool,
}

impl RunStyle {
    fn run(self, text: &str) -> Run {
        let mut run = Run::new().add_text(text);
        if self.bold {
            run = run.bold();
        }
        if self.italic {
            run = run.italic();
        }
        if self.code {
            run = run.fonts(monospace());
        }
        if self.link {
            run = run.color(LINK_COLOR).underline("single");
        }
        run
    }
}

fn monospace() -> RunFonts {
    RunFonts::new().ascii(MONOSPACE_FONT).hi_ansi(MONOSPACE_FONT)
}

struct DocxWriter<'a> {
    blocks: Vec<Block>,
    media: &'a MediaMap,
    picture_size: (u32, u32),
}

impl DocxWriter<'_> {
    fn block(&mut self, node: &Node, style: Option<&str>) {
        match node {
            Node::Root { children } | Node::Other { children, .. } => {
                for child in children {
                    self.block(child, style);
                }
            }
            Node::Heading { depth, children } => {
                let depth = (*depth).clamp(1, MAX_HEADING_DEPTH);
                let base = Paragraph::new().style(&format!("Heading{depth}"));
                self.paragraph(base, children, RunStyle::default());
            }
            Node::Paragraph { children } => {
                self.paragraph(styled(style), children, RunStyle::default());
            }
            Node::Code { value, .. } => self.code_block(value),
            Node::List { items, .. } => {
                for item in items {
                    self.list_item(item.children(), style);
                }
            }
            Node::ListItem { children } => self.list_item(children, style),
            Node::Blockquote { children } => {
                for child in children {
                    self.block(child, Some(QUOTE_STYLE));
                }
            }
            Node::ThematicBreak => {
                let rule = Paragraph::new()
                    .align(AlignmentType::Center)
                    .add_run(Run::new().add_text("* * *"));
                self.blocks.push(Block::Paragraph(rule));
            }
            Node::Table { rows } => self.table(rows),
            Node::RawMarkup { .. } => trace!("skipping raw markup block"),
            Node::LineBreak => {}
            // Inline content reaching block level gets its own paragraph.
            inline => {
                self.paragraph(
                    styled(style),
                    std::slice::from_ref(inline),
                    RunStyle::default(),
                );
            }
        }
    }

    fn list_item(&mut self, children: &[Node], style: Option<&str>) {
        for child in children {
            match child {
                Node::Paragraph { children } => {
                    let base = styled(style)
                        .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0));
                    self.paragraph(base, children, RunStyle::default());
                }
                Node::List { items, .. } => {
                    for item in items {
                        self.list_item(item.children(), style);
                    }
                }
                other => self.block(other, style),
            }
        }
    }

    /// Push a paragraph unless every inline child was dropped
    fn paragraph(&mut self, base: Paragraph, children: &[Node], run_style: RunStyle) {
        let mut items = Vec::new();
        self.inlines(children, run_style, &mut items);
        if items.is_empty() {
            return;
        }
        self.blocks.push(Block::Paragraph(fill(base, items)));
    }

    fn inlines(&self, nodes: &[Node], style: RunStyle, out: &mut Vec<Inline>) {
        for node in nodes {
            self.inline(node, style, out);
        }
    }

    fn inline(&self, node: &Node, style: RunStyle, out: &mut Vec<Inline>) {
        match node {
            Node::Text { value } => out.push(Inline::Run(style.run(value))),
            Node::Strong { children } => {
                self.inlines(children, RunStyle { bold: true, ..style }, out);
            }
            Node::Emphasis { children } => {
                self.inlines(children, RunStyle { italic: true, ..style }, out);
            }
            Node::InlineCode { value } => {
                out.push(Inline::Run(RunStyle { code: true, ..style }.run(value)));
            }
            Node::Link { url, children } => {
                let mut runs = Vec::new();
                self.inlines(children, RunStyle { link: true, ..style }, &mut runs);
                let link = runs
                    .into_iter()
                    .fold(Hyperlink::new(url, HyperlinkType::External), |link, item| {
                        match item {
                            Inline::Run(run) => link.add_run(run),
                            Inline::Link(_) => link,
                        }
                    });
                out.push(Inline::Link(link));
            }
            Node::Image { url, .. } => {
                if let Some(run) = self.picture(url) {
                    out.push(Inline::Run(run));
                }
            }
            Node::LineBreak => out.push(Inline::Run(Run::new().add_break(BreakType::TextWrapping))),
            Node::RawMarkup { .. } => trace!("dropping inline raw markup"),
            other => self.inlines(other.children(), style, out),
        }
    }

    fn picture(&self, url: &str) -> Option<Run> {
        let media = self.media.get(url)?;
        let decoded = match image::load_from_memory(&media.bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(reference = url, error = %err, "image cannot be embedded, dropping");
                return None;
            }
        };

        let mut png = Vec::new();
        if let Err(err) = decoded.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
            warn!(reference = url, error = %err, "image re-encoding failed, dropping");
            return None;
        }

        let (width, height) = self.picture_size;
        let pic = Pic::new_with_dimensions(png, decoded.width(), decoded.height()).size(width, height);
        Some(Run::new().add_image(pic))
    }

    fn code_block(&mut self, code: &str) {
        let mut run = Run::new().fonts(monospace());
        for (i, line) in code.split('\n').enumerate() {
            if i > 0 {
                run = run.add_break(BreakType::TextWrapping);
            }
            run = run.add_text(line);
        }
        let cell = TableCell::new().add_paragraph(Paragraph::new().add_run(run));
        let table = Table::new(vec![TableRow::new(vec![cell])]).set_grid(vec![TABLE_WIDTH]);
        self.blocks.push(Block::Table(table));
    }

    fn table(&mut self, rows: &[duplex_core::TableRow]) {
        let columns = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
        if columns == 0 {
            return;
        }

        let rows = rows
            .iter()
            .map(|row| {
                let style = RunStyle {
                    bold: row.header,
                    ..RunStyle::default()
                };
                let cells = (0..columns)
                    .map(|i| {
                        let mut items = Vec::new();
                        if let Some(cell) = row.cells.get(i) {
                            self.inlines(cell, style, &mut items);
                        }
                        TableCell::new().add_paragraph(fill(Paragraph::new(), items))
                    })
                    .collect();
                TableRow::new(cells)
            })
            .collect();

        let table = Table::new(rows).set_grid(vec![TABLE_WIDTH / columns; columns]);
        self.blocks.push(Block::Table(table));
    }
}

fn styled(style: Option<&str>) -> Paragraph {
    match style {
        Some(style) => Paragraph::new().style(style),
        None => Paragraph::new(),
    }
}

fn fill(paragraph: Paragraph, items: Vec<Inline>) -> Paragraph {
    items.into_iter().fold(paragraph, |p, item| match item {
        Inline::Run(run) => p.add_run(run),
        Inline::Link(link) => p.add_hyperlink(link),
    })
}
