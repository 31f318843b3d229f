use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Deduplicated set of entity mentions.
///
/// Backed by an ordered set so that merging per-chunk results is commutative
/// and the presented order (lexicographic) never depends on processing order.
/// Blank names are never stored; surrounding whitespace is trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySet(BTreeSet<String>);

/// Similarity at or above which two entity names are flagged as possible
/// duplicates.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.85;

/// Two entities that look like spellings of the same thing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearDuplicate {
    pub first: String,
    pub second: String,
    pub similarity: f64,
}

impl EntitySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the name was blank or already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.0.insert(name.to_string())
    }

    pub fn union(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name.trim())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Pairs whose case-insensitive normalized Levenshtein similarity is at
    /// least `threshold`. Advisory only: nothing is merged.
    #[must_use]
    pub fn near_duplicates(&self, threshold: f64) -> Vec<NearDuplicate> {
        let names: Vec<&String> = self.0.iter().collect();
        let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let mut pairs = Vec::new();

        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                let similarity = strsim::normalized_levenshtein(&lowered[i], &lowered[j]);
                if similarity >= threshold {
                    pairs.push(NearDuplicate {
                        first: names[i].clone(),
                        second: names[j].clone(),
                        similarity,
                    });
                }
            }
        }

        pairs
    }
}

/// An entity item that was dropped, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntity {
    /// 1-based chunk the item came from when extraction ran per chunk.
    pub chunk: Option<usize>,
    /// 1-based position in the list it arrived in.
    pub index: usize,
    pub raw: String,
    pub error: ValidationError,
}

impl RejectedEntity {
    /// Label used in stage warnings: `entity 2` or `chunk 3, entity 2`.
    #[must_use]
    pub fn item(&self) -> String {
        match self.chunk {
            Some(chunk) => format!("chunk {chunk}, entity {}", self.index),
            None => format!("entity {}", self.index),
        }
    }
}

/// Entities found in one pass plus the items that could not be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityBatch {
    pub entities: EntitySet,
    pub rejected: Vec<RejectedEntity>,
}

impl EntityBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&mut self, index: usize, raw: impl Into<String>, error: ValidationError) {
        self.rejected.push(RejectedEntity {
            chunk: None,
            index,
            raw: raw.into(),
            error,
        });
    }

    /// Build a batch from user-supplied names. Blank items are reported by
    /// their 1-based position and skipped.
    pub fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = Self::new();

        for (i, item) in items.into_iter().enumerate() {
            let name = item.as_ref();
            if name.trim().is_empty() {
                batch.reject(i + 1, name, ValidationError::BlankEntity { index: i + 1 });
            } else {
                batch.entities.insert(name);
            }
        }

        batch
    }

    /// Comma-separated form used by the entity editor. A blank list is an
    /// empty batch, not a rejection.
    #[must_use]
    pub fn parse_list(input: &str) -> Self {
        if input.trim().is_empty() {
            return Self::new();
        }
        Self::from_items(input.split(','))
    }

    /// Interpret a model's `entities` array. Items must be non-blank strings.
    #[must_use]
    pub fn from_json_items(items: &[serde_json::Value]) -> Self {
        let mut batch = Self::new();

        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(name) if !name.trim().is_empty() => {
                    batch.entities.insert(name);
                }
                Some(name) => {
                    batch.reject(i + 1, name, ValidationError::BlankEntity { index: i + 1 });
                }
                None => batch.reject(
                    i + 1,
                    item.to_string(),
                    ValidationError::InvalidEntity { index: i + 1 },
                ),
            }
        }

        batch
    }

    /// Attribute every rejection to `chunk` (1-based).
    #[must_use]
    pub fn within_chunk(mut self, chunk: usize) -> Self {
        for rejected in &mut self.rejected {
            rejected.chunk = Some(chunk);
        }
        self
    }

    pub fn merge(&mut self, other: Self) {
        self.entities.union(other.entities);
        self.rejected.extend(other.rejected);
    }
}

impl From<EntitySet> for EntityBatch {
    fn from(entities: EntitySet) -> Self {
        Self {
            entities,
            rejected: Vec::new(),
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for EntitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

impl<S: AsRef<str>> Extend<S> for EntitySet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name.as_ref());
        }
    }
}
