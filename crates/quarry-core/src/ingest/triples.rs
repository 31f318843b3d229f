use std::cmp::Reverse;

use super::chunker::split_sentences;
use super::extractor::{ExtractionStrategy, RuleBasedEntityExtractor};
use crate::entity::EntitySet;
use crate::error::ServiceError;
use crate::triple::{Triple, TripleBatch};

/// Longest run of connecting words still read as a predicate.
const MAX_PREDICATE_WORDS: usize = 4;

/// Relation capability. `entities` may be empty; implementations then find
/// their own mentions.
#[async_trait::async_trait]
pub trait TripleExtractor: Send + Sync {
    fn strategy(&self) -> ExtractionStrategy;

    async fn extract_triples(
        &self,
        text: &str,
        entities: &EntitySet,
    ) -> Result<TripleBatch, ServiceError>;

    /// Run per chunk, keeping chunk order in the result. Rejections keep
    /// their chunk.
    async fn extract_chunks(
        &self,
        chunks: &[String],
        entities: &EntitySet,
    ) -> Result<TripleBatch, ServiceError> {
        let mut batch = TripleBatch::new();
        for (i, chunk) in chunks.iter().enumerate() {
            batch.merge(self.extract_triples(chunk, entities).await?.within_chunk(i + 1));
        }
        Ok(batch)
    }
}

/// Links consecutive entity mentions inside a sentence when a short run of
/// plain words sits between them: "Alice works at Acme." gives
/// `Alice|worksAt|Acme`.
#[derive(Default)]
pub struct RuleBasedTripleExtractor {
    mentions: RuleBasedEntityExtractor,
}

impl RuleBasedTripleExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn extract(&self, text: &str, entities: &EntitySet) -> TripleBatch {
        let found;
        let entities = if entities.is_empty() {
            found = self.mentions.find(text);
            &found
        } else {
            entities
        };

        let mut batch = TripleBatch::new();
        if entities.is_empty() {
            return batch;
        }

        for sentence in split_sentences(text) {
            let mentions = locate_mentions(sentence, entities);
            for pair in mentions.windows(2) {
                let (first, second) = (&pair[0], &pair[1]);
                let Some(predicate) = predicate_between(&sentence[first.end..second.start]) else {
                    continue;
                };
                if let Ok(triple) = Triple::new(first.name, &predicate, second.name) {
                    batch.accepted.push(triple);
                }
            }
        }

        batch
    }
}

#[async_trait::async_trait]
impl TripleExtractor for RuleBasedTripleExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::RuleBased
    }

    async fn extract_triples(
        &self,
        text: &str,
        entities: &EntitySet,
    ) -> Result<TripleBatch, ServiceError> {
        Ok(self.extract(text, entities))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mention<'a> {
    name: &'a str,
    start: usize,
    end: usize,
}

/// Word-bounded, non-overlapping occurrences in text order. Where two names
/// overlap the longer one wins.
fn locate_mentions<'a>(sentence: &str, entities: &'a EntitySet) -> Vec<Mention<'a>> {
    let mut candidates: Vec<Mention<'a>> = entities
        .iter()
        .flat_map(|name| {
            sentence
                .match_indices(name)
                .filter(|(start, _)| is_word_bounded(sentence, *start, start + name.len()))
                .map(move |(start, _)| Mention {
                    name,
                    start,
                    end: start + name.len(),
                })
                .collect::<Vec<_>>()
        })
        .collect();

    candidates.sort_by_key(|m| (m.start, Reverse(m.end)));

    let mut mentions: Vec<Mention<'a>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if mentions.last().is_none_or(|last| candidate.start >= last.end) {
            mentions.push(candidate);
        }
    }
    mentions
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// camelCase the connecting words, or `None` if the gap is empty, too long, or
/// crosses clause punctuation.
fn predicate_between(gap: &str) -> Option<String> {
    if gap.contains([',', ';', ':', '(', ')', '"']) {
        return None;
    }

    let words: Vec<&str> = gap
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() || words.len() > MAX_PREDICATE_WORDS {
        return None;
    }

    let mut predicate = String::new();
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            predicate.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                predicate.extend(first.to_uppercase());
                predicate.push_str(chars.as_str());
            }
        }
    }

    Some(predicate)
}
