use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntitySet;
use crate::source::RawFile;
use crate::triple::Triple;

/// Descriptive tags for a document batch. An empty string means "not set";
/// the export always carries all three keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub institution: String,
    #[serde(rename = "docType", default)]
    pub doc_type: String,
    #[serde(default)]
    pub year: String,
}

impl Metadata {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.institution.is_empty() && self.doc_type.is_empty() && self.year.is_empty()
    }
}

/// The per-session aggregate every stage reads from and writes to.
///
/// Fields are only mutated through [`crate::PipelineOrchestrator`], which keeps
/// the chunk and entity invariants; collaborators get read access.
#[derive(Debug, Clone)]
pub struct WorkingDocument {
    id: Uuid,
    created_at: DateTime<Utc>,
    pub(crate) raw_files: Vec<RawFile>,
    pub(crate) normalized_text: String,
    pub(crate) metadata: Metadata,
    pub(crate) chunks: Vec<String>,
    pub(crate) entities: EntitySet,
    pub(crate) triples: Vec<Triple>,
}

impl WorkingDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::with_files(Vec::new())
    }

    #[must_use]
    pub fn with_files(raw_files: Vec<RawFile>) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            raw_files,
            normalized_text: String::new(),
            metadata: Metadata::default(),
            chunks: Vec::new(),
            entities: EntitySet::new(),
            triples: Vec::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn raw_files(&self) -> &[RawFile] {
        &self.raw_files
    }

    #[must_use]
    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[must_use]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    #[must_use]
    pub const fn entities(&self) -> &EntitySet {
        &self.entities
    }

    #[must_use]
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }
}

impl Default for WorkingDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_empty() {
        let doc = WorkingDocument::new();

        assert!(doc.raw_files().is_empty());
        assert!(doc.normalized_text().is_empty());
        assert!(doc.metadata().is_empty());
        assert!(doc.chunks().is_empty());
        assert!(doc.entities().is_empty());
        assert!(doc.triples().is_empty());
    }

    #[test]
    fn test_each_session_gets_its_own_id() {
        assert_ne!(WorkingDocument::new().id(), WorkingDocument::new().id());
    }

    #[test]
    fn test_metadata_wire_names() {
        let metadata = Metadata {
            institution: "SFU".into(),
            doc_type: "Strategic Plan".into(),
            year: "2025".into(),
        };

        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"institution":"SFU","docType":"Strategic Plan","year":"2025"}"#
        );

        let partial: Metadata = serde_json::from_str(r#"{"year":"2024"}"#).unwrap();
        assert_eq!(partial.year, "2024");
        assert!(partial.institution.is_empty());
    }
}
