use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Parse failed: {0}")]
    ParseFailed(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Html,
    Csv,
    Json,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Unknown or missing extensions are read as plain text.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::PlainText)
    }
}

/// Strict UTF-8 decode; a leading byte-order mark is dropped.
pub fn decode_utf8(data: &[u8]) -> DecodeResult<&str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    std::str::from_utf8(data).map_err(|e| DecodeError::Encoding(e.to_string()))
}

#[async_trait::async_trait]
pub trait Parser: Send + Sync {
    fn supported_formats(&self) -> &[DocumentFormat];

    fn can_parse(&self, format: DocumentFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    /// Extract the readable text of one document.
    async fn parse_bytes(&self, data: &[u8], format: DocumentFormat) -> DecodeResult<String>;
}

pub struct PlainTextParser;

impl PlainTextParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for PlainTextParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Parser for PlainTextParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[
            DocumentFormat::PlainText,
            DocumentFormat::Markdown,
            DocumentFormat::Csv,
        ]
    }

    async fn parse_bytes(&self, data: &[u8], format: DocumentFormat) -> DecodeResult<String> {
        let text = decode_utf8(data)?;

        if format == DocumentFormat::Markdown {
            Ok(strip_markdown_headings(text))
        } else {
            Ok(text.to_string())
        }
    }
}

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("valid regex"));

fn strip_markdown_headings(text: &str) -> String {
    MARKDOWN_HEADING.replace_all(text, "").into_owned()
}

static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")
        .expect("valid regex")
});
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:p|div|br|li|ul|ol|tr|table|section|article|header|footer|h[1-6])\b[^>]*>")
        .expect("valid regex")
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Tag-stripping HTML reader. Block-level elements become line breaks so
/// paragraphs survive into chunking.
pub struct HtmlParser;

impl HtmlParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn extract_text(html: &str) -> String {
        let text = SCRIPT_OR_STYLE.replace_all(html, " ");
        let text = BLOCK_TAG.replace_all(&text, "\n\n");
        let text = ANY_TAG.replace_all(&text, "");
        decode_entities(&text)
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[async_trait::async_trait]
impl Parser for HtmlParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Html]
    }

    async fn parse_bytes(&self, data: &[u8], _format: DocumentFormat) -> DecodeResult<String> {
        let html = decode_utf8(data)?;
        Ok(Self::extract_text(html))
    }
}

/// Collects every string value of a JSON document, one per line, in document
/// order.
pub struct JsonParser;

impl JsonParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_strings(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

#[async_trait::async_trait]
impl Parser for JsonParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Json]
    }

    async fn parse_bytes(&self, data: &[u8], _format: DocumentFormat) -> DecodeResult<String> {
        let text = decode_utf8(data)?;
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| DecodeError::ParseFailed(e.to_string()))?;

        let mut strings = Vec::new();
        collect_strings(&value, &mut strings);
        Ok(strings.join("\n\n"))
    }
}

pub struct CompositeParser {
    parsers: Vec<Box<dyn Parser>>,
}

impl CompositeParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser: Box<dyn Parser>) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn add_parser(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    fn find_parser(&self, format: DocumentFormat) -> Option<&dyn Parser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(format))
            .map(AsRef::as_ref)
    }
}

impl Default for CompositeParser {
    fn default() -> Self {
        Self::new()
            .with_parser(Box::new(PlainTextParser::new()))
            .with_parser(Box::new(HtmlParser::new()))
            .with_parser(Box::new(JsonParser::new()))
    }
}

#[async_trait::async_trait]
impl Parser for CompositeParser {
    fn supported_formats(&self) -> &[DocumentFormat] {
        &[
            DocumentFormat::PlainText,
            DocumentFormat::Markdown,
            DocumentFormat::Html,
            DocumentFormat::Csv,
            DocumentFormat::Json,
        ]
    }

    fn can_parse(&self, format: DocumentFormat) -> bool {
        self.find_parser(format).is_some()
    }

    async fn parse_bytes(&self, data: &[u8], format: DocumentFormat) -> DecodeResult<String> {
        let parser = self
            .find_parser(format)
            .ok_or_else(|| DecodeError::UnsupportedFormat(format!("{format:?}")))?;

        parser.parse_bytes(data, format).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_parser() {
        let parser = PlainTextParser::new();
        let text = parser
            .parse_bytes(b"Hello, world!", DocumentFormat::PlainText)
            .await
            .unwrap();

        assert_eq!(text, "Hello, world!");
    }

    #[tokio::test]
    async fn test_markdown_headings_stripped() {
        let parser = PlainTextParser::new();
        let data = b"# Title\n\nIntro\n\n## Section 1\n\n#hashtag stays";

        let text = parser.parse_bytes(data, DocumentFormat::Markdown).await.unwrap();

        assert_eq!(text, "Title\n\nIntro\n\nSection 1\n\n#hashtag stays");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decode_error() {
        let parser = PlainTextParser::new();
        let err = parser
            .parse_bytes(&[0x66, 0xff, 0xfe, 0x6f], DocumentFormat::PlainText)
            .await
            .unwrap_err();

        assert!(matches!(err, DecodeError::Encoding(_)));
    }

    #[test]
    fn test_bom_is_stripped() {
        assert_eq!(decode_utf8(b"\xEF\xBB\xBFabc").unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_html_parser() {
        let parser = HtmlParser::new();
        let html = b"<html><head><style>p{color:red}</style></head>\
            <body><h1>Report</h1><p>Fish &amp; Chips</p><script>alert(1)</script></body></html>";

        let text = parser.parse_bytes(html, DocumentFormat::Html).await.unwrap();

        assert!(text.contains("Report"));
        assert!(text.contains("Fish & Chips"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("color"));
    }

    #[tokio::test]
    async fn test_json_parser_collects_strings() {
        let parser = JsonParser::new();
        let text = parser
            .parse_bytes(br#"{"title": "Plan", "body": ["One", 2, "Three"]}"#, DocumentFormat::Json)
            .await
            .unwrap();

        assert!(text.contains("Plan"));
        assert!(text.contains("One\n\nThree"));
    }

    #[tokio::test]
    async fn test_composite_dispatch() {
        let parser = CompositeParser::default();
        assert!(parser.can_parse(DocumentFormat::Html));

        let text = parser
            .parse_bytes(b"<p>hi</p>", DocumentFormat::Html)
            .await
            .unwrap();
        assert_eq!(text.trim(), "hi");

        let empty = CompositeParser::new();
        let err = empty
            .parse_bytes(b"x", DocumentFormat::PlainText)
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("HTM"), Some(DocumentFormat::Html));
        assert_eq!(DocumentFormat::from_extension("md"), Some(DocumentFormat::Markdown));
        assert_eq!(DocumentFormat::from_extension("pdf"), None);
        assert_eq!(
            DocumentFormat::from_path(Path::new("no_extension")),
            DocumentFormat::PlainText
        );
    }
}
