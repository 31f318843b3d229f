use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::normalizer::PARAGRAPH_BREAK;
use crate::error::ValidationError;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("valid regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Pack whole paragraphs up to `max_chars`.
    #[default]
    Paragraph,
    /// One chunk per sentence.
    Sentence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub max_chars: usize,
    pub strategy: ChunkStrategy,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 1200,
            strategy: ChunkStrategy::Paragraph,
        }
    }
}

/// Deterministic splitter from normalized text to ordered chunks.
///
/// Splits only ever happen at whitespace, so joining the chunks with
/// [`PARAGRAPH_BREAK`] gives back the input modulo whitespace. `max_chars` is
/// a soft cap: a single word longer than it is emitted as its own chunk.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    #[must_use]
    pub const fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let max = self.config.max_chars.max(1);
        let mut packer = Packer::new(max);

        for paragraph in split_paragraphs(text) {
            if self.config.strategy == ChunkStrategy::Paragraph && char_len(paragraph) <= max {
                packer.push(paragraph, PARAGRAPH_BREAK);
                continue;
            }

            packer.flush();
            for sentence in split_sentences(paragraph) {
                if char_len(sentence) <= max {
                    packer.push(sentence, " ");
                } else {
                    packer.flush();
                    for word in sentence.split_whitespace() {
                        packer.push(word, " ");
                    }
                    packer.flush();
                }

                if self.config.strategy == ChunkStrategy::Sentence {
                    packer.flush();
                }
            }
            packer.flush();
        }

        packer.finish()
    }

    #[must_use]
    pub fn join(chunks: &[String]) -> String {
        chunks.join(PARAGRAPH_BREAK)
    }

    /// Check user-supplied chunks. Whitespace-only items are dropped and each
    /// one is reported with its 1-based position; the rest are kept verbatim.
    #[must_use]
    pub fn validate(items: Vec<String>) -> (Vec<String>, Vec<ValidationError>) {
        let mut accepted = Vec::with_capacity(items.len());
        let mut rejected = Vec::new();

        for (i, item) in items.into_iter().enumerate() {
            if item.trim().is_empty() {
                rejected.push(ValidationError::EmptyChunk { index: i + 1 });
            } else {
                accepted.push(item);
            }
        }

        (accepted, rejected)
    }

    /// Split an edited text blob back into chunks on blank lines.
    #[must_use]
    pub fn split_override(blob: &str) -> Vec<String> {
        let unified = blob.replace("\r\n", "\n");
        split_paragraphs(&unified).map(String::from).collect()
    }
}

fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

/// Split after `.`, `!` or `?` when followed by whitespace. Pieces are
/// trimmed; concatenating them loses only whitespace.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

struct Packer {
    max: usize,
    current: String,
    current_len: usize,
    chunks: Vec<String>,
}

impl Packer {
    const fn new(max: usize) -> Self {
        Self {
            max,
            current: String::new(),
            current_len: 0,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str, separator: &str) {
        let len = char_len(piece);
        let sep_len = char_len(separator);

        if !self.current.is_empty() && self.current_len + sep_len + len > self.max {
            self.flush();
        }
        if !self.current.is_empty() {
            self.current.push_str(separator);
            self.current_len += sep_len;
        }
        self.current.push_str(piece);
        self.current_len += len;
    }

    fn flush(&mut self) {
        if !self.current.trim().is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
        }
        self.current.clear();
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}
