use serde::Serialize;

use super::stage::Stage;

/// Whether a stage's output was computed or supplied by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Automatic,
    Override,
}

/// A recovered item-level problem: a skipped file, a rejected chunk or record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub stage: Stage,
    pub item: String,
    pub message: String,
}

impl Warning {
    pub fn new(stage: Stage, item: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            stage,
            item: item.into(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.item, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub provenance: Provenance,
    /// Items written to the document (files read, chunks, entities, triples).
    pub accepted: usize,
    pub warnings: Vec<Warning>,
}

impl StageReport {
    #[must_use]
    pub const fn new(stage: Stage, provenance: Provenance) -> Self {
        Self {
            stage,
            provenance,
            accepted: 0,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_accepted(mut self, accepted: usize) -> Self {
        self.accepted = accepted;
        self
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = warnings;
        self
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
