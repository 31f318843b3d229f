use regex::Regex;

use crate::entity::{EntityBatch, EntitySet};
use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    RuleBased,
    Remote,
}

/// Named-entity capability. Empty input yields an empty batch, never an
/// error. Unusable items go to [`EntityBatch::rejected`] rather than failing
/// the call.
#[async_trait::async_trait]
pub trait EntityExtractor: Send + Sync {
    fn strategy(&self) -> ExtractionStrategy;

    async fn extract_entities(&self, text: &str) -> Result<EntityBatch, ServiceError>;

    /// Run per chunk and union the results. Rejections keep their chunk.
    async fn extract_chunks(&self, chunks: &[String]) -> Result<EntityBatch, ServiceError> {
        let mut batch = EntityBatch::new();
        for (i, chunk) in chunks.iter().enumerate() {
            batch.merge(self.extract_entities(chunk).await?.within_chunk(i + 1));
        }
        Ok(batch)
    }
}

pub struct ExtractionPattern {
    pub label: &'static str,
    pub regex: Regex,
}

impl ExtractionPattern {
    pub fn new(label: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label,
            regex: Regex::new(pattern)?,
        })
    }
}

const PROPER_NOUN: &str = r"\b\p{Lu}[\p{L}\p{N}&'’-]*(?:[ \t]+(?:(?:of|for|de|the)[ \t]+){0,2}\p{Lu}[\p{L}\p{N}&'’-]*)*";
const EMAIL: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

/// Capitalized words that start sentences far more often than they name
/// anything.
const STOPWORDS: &[&str] = &[
    "A", "An", "And", "As", "At", "But", "By", "For", "From", "He", "Her", "His", "I", "If",
    "In", "It", "Its", "Our", "She", "So", "That", "The", "Their", "These", "They", "This",
    "Those", "To", "We", "What", "When", "Where", "Which", "While", "Who", "With", "You",
];

/// Regex-driven entity finder: capitalized proper-noun phrases and e-mail
/// addresses.
pub struct RuleBasedEntityExtractor {
    patterns: Vec<ExtractionPattern>,
}

impl RuleBasedEntityExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: ExtractionPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    #[must_use]
    pub fn with_default_patterns() -> Self {
        let mut extractor = Self::new();

        for (label, pattern) in [("proper_noun", PROPER_NOUN), ("email", EMAIL)] {
            match ExtractionPattern::new(label, pattern) {
                Ok(p) => extractor.patterns.push(p),
                Err(e) => tracing::error!(label, error = %e, "invalid built-in pattern"),
            }
        }

        extractor
    }

    /// Synchronous core shared with the triple extractor.
    #[must_use]
    pub fn find(&self, text: &str) -> EntitySet {
        let mut entities = EntitySet::new();

        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                if let Some(name) = clean_mention(m.as_str()) {
                    entities.insert(name);
                }
            }
        }

        entities
    }
}

impl Default for RuleBasedEntityExtractor {
    fn default() -> Self {
        Self::with_default_patterns()
    }
}

#[async_trait::async_trait]
impl EntityExtractor for RuleBasedEntityExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::RuleBased
    }

    async fn extract_entities(&self, text: &str) -> Result<EntityBatch, ServiceError> {
        Ok(self.find(text).into())
    }
}

/// Drop leading stopwords and a trailing possessive; `None` if nothing is left.
fn clean_mention(raw: &str) -> Option<&str> {
    let mut mention = raw.trim();

    loop {
        let (first, rest) = mention.split_once([' ', '\t']).unwrap_or((mention, ""));
        if !STOPWORDS.contains(&first) {
            break;
        }
        mention = rest.trim_start();
        if mention.is_empty() {
            return None;
        }
    }

    let mention = mention
        .strip_suffix("'s")
        .or_else(|| mention.strip_suffix("’s"))
        .unwrap_or(mention)
        .trim_end_matches(['-', '\'', '’', '&']);

    (!mention.is_empty()).then_some(mention)
}
