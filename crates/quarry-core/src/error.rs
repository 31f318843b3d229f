use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ingest::{DecodeError, Stage};

/// Item-level rejection. Recovered locally: the offending item is dropped and
/// reported as a warning while the rest of the batch proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("chunk {index} is empty")]
    EmptyChunk { index: usize },

    #[error("entity {index} is blank")]
    BlankEntity { index: usize },

    #[error("entity {index} is not a string")]
    InvalidEntity { index: usize },

    #[error("expected 3 fields (subject, predicate, object), found {found}")]
    MalformedTriple { found: usize },

    #[error("triple field `{field}` is missing or empty")]
    EmptyTripleField { field: &'static str },

    #[error("year {0:?} is not a plausible four-digit year")]
    ImplausibleYear(String),
}

/// Failure of an external capability (parser, NER, triple model, remote
/// service). The session survives; the caller may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: Stage, timeout: Duration },

    #[error("{stage} failed: {message}")]
    Failed { stage: Stage, message: String },

    #[error("{stage} returned an invalid response: {message}")]
    InvalidResponse { stage: Stage, message: String },
}

impl ServiceError {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Timeout { stage, .. }
            | Self::Failed { stage, .. }
            | Self::InvalidResponse { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Discarded stale {stage} result")]
    StaleResult { stage: Stage },

    #[error("A {0} extraction is already in flight")]
    Busy(Stage),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
