// SPDX-License-Identifier: AGPL-3.0-or-later
use async_trait::async_trait;
use duplex_core::{Document, Node};
use duplex_export::{
    export_document, export_markup, AssetError, AssetLoader, AssetResolver, DocxRenderer,
    ExportConfig, ExportFormat, MediaMap,
};
use std::collections::HashMap;
use std::io::{Cursor, Read};

/// Loader serving fixed bytes per reference
#[derive(Default)]
struct MapLoader {
    assets: HashMap<String, Vec<u8>>,
}

impl MapLoader {
    fn with(mut self, reference: &str, bytes: Vec<u8>) -> Self {
        self.assets.insert(reference.to_string(), bytes);
        self
    }
}

#[async_trait]
impl AssetLoader for MapLoader {
    async fn load_bytes(&self, reference: &str) -> Result<Vec<u8>, AssetError> {
        self.assets
            .get(reference)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(reference.to_string()))
    }
}

fn png_bytes() -> Vec<u8> {
    png_sized(2, 2)
}

fn png_sized(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

fn document_xml(docx: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found"))
}

const SAMPLE: &str = "# Title\n\nHello **world**.\n\n![alt](C:\\img\\a.png)";

#[tokio::test]
async fn html_export_inlines_readable_image() {
    let loader = MapLoader::default().with("C:\\img\\a.png", png_bytes());
    let artifact = export_markup(SAMPLE, ExportFormat::Html, &loader, &ExportConfig::default())
        .await
        .unwrap();
    let html = String::from_utf8(artifact.bytes).unwrap();

    assert!(html.contains("<h1>Title</h1>"));
    assert!(html.contains("<p>Hello <strong>world</strong>.</p>"));
    assert!(html.contains("<img src=\"data:image/png;base64,"));
    assert!(html.contains("<title>Title</title>"));
    assert_eq!(artifact.file_name, "Title.html");
}

#[tokio::test]
async fn html_export_keeps_original_src_for_unreachable_image() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");
    let markup = format!("Before\n\n![gone]({})\n\nAfter\n", missing.display());

    let config = ExportConfig::default();
    let resolver = AssetResolver::new(&config).unwrap();
    let artifact = export_markup(&markup, ExportFormat::Html, &resolver, &config)
        .await
        .unwrap();
    let html = String::from_utf8(artifact.bytes).unwrap();

    assert!(html.contains(&format!("<img src=\"{}\" alt=\"gone\">", missing.display())));
    assert!(position(&html, "Before") < position(&html, "After"));
    assert_eq!(artifact.file_name, "Untitled.html");
}

#[tokio::test]
async fn html_export_reads_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.jpg");
    std::fs::write(&path, b"not really a jpeg").unwrap();
    let markup = format!("![shot](file://{})\n", path.display());

    let config = ExportConfig::default();
    let resolver = AssetResolver::new(&config).unwrap();
    let artifact = export_markup(&markup, ExportFormat::Html, &resolver, &config)
        .await
        .unwrap();
    let html = String::from_utf8(artifact.bytes).unwrap();

    assert!(html.contains("<img src=\"data:image/jpeg;base64,bm90IHJlYWxseSBhIGpwZWc=\""));
}

#[tokio::test]
async fn html_export_fetches_remote_image() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/logo.gif")
        .with_status(200)
        .with_header("content-type", "image/gif")
        .with_body("GIF")
        .create_async()
        .await;
    let missing = server
        .mock("GET", "/gone.png")
        .with_status(404)
        .create_async()
        .await;

    let markup = format!(
        "![logo]({url}/logo.gif) ![gone]({url}/gone.png)\n",
        url = server.url()
    );
    let config = ExportConfig::default();
    let resolver = AssetResolver::new(&config).unwrap();
    let artifact = export_markup(&markup, ExportFormat::Html, &resolver, &config)
        .await
        .unwrap();
    let html = String::from_utf8(artifact.bytes).unwrap();

    mock.assert_async().await;
    missing.assert_async().await;
    assert!(html.contains("<img src=\"data:image/gif;base64,R0lG\" alt=\"logo\">"));
    assert!(html.contains(&format!("<img src=\"{}/gone.png\" alt=\"gone\">", server.url())));
}

#[tokio::test]
async fn docx_export_drops_unreachable_image_and_keeps_order() {
    let markup = "# Report\n\nfirst paragraph\n\n![gone](/nowhere/a.png)\n\nclosing paragraph\n";
    let artifact = export_markup(
        markup,
        ExportFormat::Docx,
        &MapLoader::default(),
        &ExportConfig::default(),
    )
    .await
    .unwrap();
    let xml = document_xml(&artifact.bytes);

    assert!(!xml.contains("<w:drawing"));
    assert!(position(&xml, "Report") < position(&xml, "first paragraph"));
    assert!(position(&xml, "first paragraph") < position(&xml, "closing paragraph"));
    assert_eq!(artifact.file_name, "Report.docx");
}

#[tokio::test]
async fn docx_export_embeds_readable_image() {
    let markup = "alpha ![pic](/img/a.png) omega\n";
    let loader = MapLoader::default().with("/img/a.png", png_bytes());
    let artifact = export_markup(markup, ExportFormat::Docx, &loader, &ExportConfig::default())
        .await
        .unwrap();
    let xml = document_xml(&artifact.bytes);

    let drawing = position(&xml, "<w:drawing");
    assert!(position(&xml, "alpha") < drawing);
    assert!(drawing < position(&xml, "omega"));
}

#[tokio::test]
async fn docx_picture_extent_follows_config_not_source_size() {
    let markup = "![wide](/img/wide.png)\n";
    let loader = MapLoader::default().with("/img/wide.png", png_sized(7, 3));

    let artifact = export_markup(markup, ExportFormat::Docx, &loader, &ExportConfig::default())
        .await
        .unwrap();
    let xml = document_xml(&artifact.bytes);
    assert!(xml.contains("cx=\"4572000\""));
    assert!(xml.contains("cy=\"3048000\""));
    assert!(!xml.contains("cx=\"66675\""));

    let config = ExportConfig {
        image_width_px: 100,
        image_height_px: 50,
        ..ExportConfig::default()
    };
    let artifact = export_markup(markup, ExportFormat::Docx, &loader, &config)
        .await
        .unwrap();
    let xml = document_xml(&artifact.bytes);
    assert!(xml.contains("cx=\"952500\""));
    assert!(xml.contains("cy=\"476250\""));
    assert!(!xml.contains("cx=\"4572000\""));
}

#[test]
fn docx_heading_depth_is_clamped_to_styles() {
    let doc = Node::Root {
        children: vec![Node::Heading {
            depth: 6,
            children: vec![Node::Text {
                value: "deep".to_string(),
            }],
        }],
    };
    let bytes = DocxRenderer::new(&ExportConfig::default())
        .render(&doc, &MediaMap::new())
        .unwrap();
    let xml = document_xml(&bytes);

    assert!(xml.contains("Heading3"));
    assert!(!xml.contains("Heading6"));
}

#[tokio::test]
async fn docx_export_maps_structure() {
    let markup = "\
## Section

Some *styled* `code` and a [link](https://example.com).

- apple
  - banana
- cherry

```
let x = 1;
```
";
    let artifact = export_markup(
        markup,
        ExportFormat::Docx,
        &MapLoader::default(),
        &ExportConfig::default(),
    )
    .await
    .unwrap();
    let xml = document_xml(&artifact.bytes);

    assert!(xml.contains("Heading2"));
    assert!(xml.contains("w:hyperlink"));
    assert!(xml.contains("w:numId"));
    assert!(xml.contains("w:tbl"));
    assert!(xml.contains("Courier New"));
    assert!(position(&xml, "apple") < position(&xml, "banana"));
    assert!(position(&xml, "banana") < position(&xml, "cherry"));
    assert!(position(&xml, "cherry") < position(&xml, "let x = 1;"));
}

#[tokio::test]
async fn export_document_prefers_document_title() {
    let document = Document::new("# Heading\n\nbody\n").with_title("Meeting: notes");
    let artifact = export_document(
        &document,
        ExportFormat::Html,
        &MapLoader::default(),
        &ExportConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(artifact.file_name, "Meeting_notes.html");
    let html = String::from_utf8(artifact.bytes).unwrap();
    assert!(html.contains("<title>Meeting: notes</title>"));
}

#[tokio::test]
async fn artifact_is_written_under_its_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        title: Some("Out put".to_string()),
        ..ExportConfig::default()
    };
    let artifact = export_markup("text\n", ExportFormat::Html, &MapLoader::default(), &config)
        .await
        .unwrap();

    let path = artifact.write_to_dir(dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("Out_put.html"));
    assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);
}

#[tokio::test]
async fn config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.toml");
    std::fs::write(&path, "stylesheet = \"h1 { color: teal; }\"\n").unwrap();

    let config = ExportConfig::load(&path).await.unwrap();
    assert_eq!(config.stylesheet.as_deref(), Some("h1 { color: teal; }"));
    assert_eq!(config.image_width_px, ExportConfig::default().image_width_px);
}
