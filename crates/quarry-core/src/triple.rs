use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripleConfig {
    /// Field separator for the flat `subject|predicate|object` form.
    pub delimiter: char,
    /// Drop exact repeats when a triple batch is written to the document.
    pub dedupe: bool,
}

impl Default for TripleConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            dedupe: false,
        }
    }
}

/// A `subject -predicate-> object` statement. All three fields are non-empty
/// once constructed through [`Triple::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Result<Self, ValidationError> {
        let fields = [
            ("subject", subject.trim()),
            ("predicate", predicate.trim()),
            ("object", object.trim()),
        ];

        if let Some((field, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(ValidationError::EmptyTripleField { field: *field });
        }

        Ok(Self {
            subject: fields[0].1.to_string(),
            predicate: fields[1].1.to_string(),
            object: fields[2].1.to_string(),
        })
    }

    /// Render in the flat delimited form accepted by [`parse_delimited`].
    #[must_use]
    pub fn to_delimited(&self, delimiter: char) -> String {
        format!(
            "{}{delimiter}{}{delimiter}{}",
            self.subject, self.predicate, self.object
        )
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// A record that failed validation, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// 1-based chunk the record came from when extraction ran per chunk.
    pub chunk: Option<usize>,
    /// 1-based line number (delimited input) or position (JSON or list input).
    pub line: usize,
    pub raw: String,
    pub error: ValidationError,
}

impl RejectedRecord {
    /// Label used in stage warnings: `line 2` or `chunk 3, record 2`.
    #[must_use]
    pub fn item(&self) -> String {
        match self.chunk {
            Some(chunk) => format!("chunk {chunk}, record {}", self.line),
            None => format!("line {}", self.line),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleBatch {
    pub accepted: Vec<Triple>,
    pub rejected: Vec<RejectedRecord>,
}

impl TripleBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&mut self, line: usize, raw: impl Into<String>, error: ValidationError) {
        self.rejected.push(RejectedRecord {
            chunk: None,
            line,
            raw: raw.into(),
            error,
        });
    }

    pub fn merge(&mut self, other: Self) {
        self.accepted.extend(other.accepted);
        self.rejected.extend(other.rejected);
    }

    /// Attribute every rejection to `chunk` (1-based).
    #[must_use]
    pub fn within_chunk(mut self, chunk: usize) -> Self {
        for record in &mut self.rejected {
            record.chunk = Some(chunk);
        }
        self
    }

    /// Re-check triples that were built without [`Triple::new`], such as
    /// deserialized or hand-assembled ones. Fields are trimmed; a triple with
    /// an empty field is rejected by its 1-based position.
    #[must_use]
    pub fn from_triples(triples: Vec<Triple>) -> Self {
        let mut batch = Self::new();

        for (i, triple) in triples.into_iter().enumerate() {
            match Triple::new(&triple.subject, &triple.predicate, &triple.object) {
                Ok(valid) => batch.accepted.push(valid),
                Err(e) => batch.reject(i + 1, triple.to_string(), e),
            }
        }

        batch
    }

    /// Interpret a model response: an array of `{subject, predicate, object}`
    /// objects, or a single such object.
    #[must_use]
    pub fn from_json_value(value: &serde_json::Value) -> Self {
        let mut batch = Self::new();

        let items: Vec<&serde_json::Value> = match value {
            serde_json::Value::Array(items) => items.iter().collect(),
            serde_json::Value::Object(_) => vec![value],
            other => {
                batch.reject(1, other.to_string(), ValidationError::MalformedTriple { found: 0 });
                return batch;
            }
        };

        for (i, item) in items.into_iter().enumerate() {
            let Some(object) = item.as_object() else {
                batch.reject(i + 1, item.to_string(), ValidationError::MalformedTriple { found: 0 });
                continue;
            };

            let triple = Triple::new(
                str_field(object, "subject"),
                str_field(object, "predicate"),
                str_field(object, "object"),
            );

            match triple {
                Ok(triple) => batch.accepted.push(triple),
                Err(e) => batch.reject(i + 1, item.to_string(), e),
            }
        }

        batch
    }
}

fn str_field<'a>(object: &'a serde_json::Map<String, serde_json::Value>, key: &str) -> &'a str {
    object
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or("")
}

/// Parse one `subject|predicate|object` record per line. Blank lines are
/// skipped; every other line that does not yield three non-empty fields is
/// rejected on its own.
#[must_use]
pub fn parse_delimited(input: &str, delimiter: char) -> TripleBatch {
    let mut batch = TripleBatch::new();

    for (i, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).collect();
        let result = match fields.as_slice() {
            [subject, predicate, object] => Triple::new(subject, predicate, object),
            _ => Err(ValidationError::MalformedTriple {
                found: fields.len(),
            }),
        };

        match result {
            Ok(triple) => batch.accepted.push(triple),
            Err(e) => batch.reject(i + 1, line, e),
        }
    }

    batch
}

pub fn parse_json(input: &str) -> Result<TripleBatch, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    Ok(TripleBatch::from_json_value(&value))
}

/// Drop exact repeats, keeping the first occurrence of each triple.
pub fn dedupe(triples: &mut Vec<Triple>) {
    let mut seen = HashSet::new();
    triples.retain(|t| seen.insert(t.clone()));
}
