use std::sync::Arc;

use super::parser::{CompositeParser, DecodeResult, Parser};
use super::report::Warning;
use super::stage::Stage;
use crate::source::RawFile;

/// Separator placed between documents and between paragraphs.
pub const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    /// Files that were read and decoded, including ones with no text.
    pub documents: usize,
    pub warnings: Vec<Warning>,
}

/// Reads every raw file through a [`Parser`] and folds the results into one
/// cleaned text blob. Unreadable files are skipped with a warning.
#[derive(Clone)]
pub struct TextNormalizer {
    parser: Arc<dyn Parser>,
}

impl TextNormalizer {
    #[must_use]
    pub fn new(parser: Arc<dyn Parser>) -> Self {
        Self { parser }
    }

    pub async fn normalize(&self, files: &[RawFile]) -> NormalizedText {
        let mut output = NormalizedText::default();
        let mut parts = Vec::new();

        for file in files {
            match self.read_one(file).await {
                Ok(text) => {
                    output.documents += 1;
                    let cleaned = clean_text(&text);
                    if !cleaned.is_empty() {
                        parts.push(cleaned);
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file.display_name(), error = %e, "skipping unreadable document");
                    output
                        .warnings
                        .push(Warning::new(Stage::Parse, file.display_name(), &e));
                }
            }
        }

        output.text = parts.join(PARAGRAPH_BREAK);
        output
    }

    async fn read_one(&self, file: &RawFile) -> DecodeResult<String> {
        let data = file.load().await?;
        self.parser.parse_bytes(&data, file.format()).await
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(CompositeParser::default()))
    }
}

/// Whitespace canonicalization. Every rule maps its own output to itself, so
/// `clean_text(&clean_text(s)) == clean_text(s)`.
///
/// - CRLF and lone CR become LF; other control characters become spaces
/// - runs of horizontal whitespace collapse to one space, lines are trimmed
/// - runs of blank lines collapse to a single blank line
/// - leading and trailing blank lines are dropped
#[must_use]
pub fn clean_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut pending_break = false;

    for line in unified.lines() {
        let collapsed = line
            .split(|c: char| c.is_whitespace() || (c.is_control() && c != '\n'))
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if collapsed.is_empty() {
            pending_break = !out.is_empty();
            continue;
        }

        if !out.is_empty() {
            out.push_str(if pending_break { PARAGRAPH_BREAK } else { "\n" });
        }
        pending_break = false;
        out.push_str(&collapsed);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_file(name: &str, content: &str) -> RawFile {
        RawFile::from_bytes(name, content.as_bytes().to_vec())
    }

    #[test]
    fn test_clean_text_rules() {
        let raw = "\r\n\n  Alice   works\tat Acme.  \r\n\r\n\r\n\nAcme is\u{0b}in Canada.\n\n";
        assert_eq!(
            clean_text(raw),
            "Alice works at Acme.\n\nAcme is in Canada."
        );
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let samples = [
            "",
            "   ",
            "single line",
            "a\nb\n\n\n\nc",
            "  indented\n\n\n  paragraph  \r\n next",
            "tabs\t\tand\u{a0}nbsp",
        ];

        for sample in samples {
            let once = clean_text(sample);
            assert_eq!(clean_text(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[tokio::test]
    async fn test_zero_files_produce_empty_text() {
        let output = TextNormalizer::default().normalize(&[]).await;

        assert!(output.text.is_empty());
        assert_eq!(output.documents, 0);
        assert!(output.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_documents_joined_by_blank_line() {
        let files = vec![
            text_file("a.txt", "First document."),
            text_file("b.md", "# Second\nbody"),
        ];

        let output = TextNormalizer::default().normalize(&files).await;

        assert_eq!(output.text, "First document.\n\nSecond\nbody");
        assert_eq!(output.documents, 2);
    }

    #[tokio::test]
    async fn test_one_bad_file_does_not_abort_batch() {
        let files = vec![
            text_file("a.txt", "Alpha."),
            RawFile::from_bytes("broken.txt", vec![0xc3, 0x28, 0xa0]),
            text_file("c.txt", "Gamma."),
        ];

        let output = TextNormalizer::default().normalize(&files).await;

        assert_eq!(output.text, "Alpha.\n\nGamma.");
        assert_eq!(output.documents, 2);
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].item, "broken.txt");
        assert_eq!(output.warnings[0].stage, Stage::Parse);
    }

    #[tokio::test]
    async fn test_normalizing_twice_is_identical() {
        let files = vec![
            text_file("a.txt", "  Messy\r\n\r\n\r\ntext  here "),
            text_file("b.html", "<p>Hello</p><p>World</p>"),
        ];
        let normalizer = TextNormalizer::default();

        let first = normalizer.normalize(&files).await;
        let second = normalizer.normalize(&files).await;

        assert_eq!(first.text, second.text);
        assert_eq!(clean_text(&first.text), first.text);
    }
}
