use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::{Metadata, WorkingDocument};
use crate::error::Result;
use crate::triple::Triple;

/// The exported artifact. Field order here is the key order on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub chunks: Vec<String>,
    pub metadata: Metadata,
    pub entities: Vec<String>,
    pub triples: Vec<Triple>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Pretty,
    Compact,
}

impl ExportRecord {
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        let json = match format {
            ExportFormat::Pretty => serde_json::to_string_pretty(self)?,
            ExportFormat::Compact => serde_json::to_string(self)?,
        };
        Ok(json)
    }

    /// Write the whole record or nothing: the JSON goes to a sibling temp file
    /// which is then renamed over `path`.
    pub async fn write_to(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let json = self.render(format)?;
        let tmp = temp_path(path);

        tokio::fs::write(&tmp, json.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::info!(path = %path.display(), "export written");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "export".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

pub struct Exporter;

impl Exporter {
    /// Copy the exported fields out of the document in one pass.
    #[must_use]
    pub fn snapshot(document: &WorkingDocument) -> ExportRecord {
        ExportRecord {
            chunks: document.chunks().to_vec(),
            metadata: document.metadata().clone(),
            entities: document.entities().to_vec(),
            triples: document.triples().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntitySet;

    fn sample_document() -> WorkingDocument {
        let mut doc = WorkingDocument::new();
        doc.chunks = vec!["Alice works at Acme.".into(), "Acme is in Canada.".into()];
        doc.metadata.institution = "SFU".into();
        doc.entities = ["Canada", "Alice", "Acme"].into_iter().collect::<EntitySet>();
        doc.triples = vec![Triple::new("Alice", "worksAt", "Acme").unwrap()];
        doc
    }

    #[test]
    fn test_key_order_and_empty_metadata() {
        let record = Exporter::snapshot(&sample_document());
        let json = record.render(ExportFormat::Compact).unwrap();

        assert_eq!(
            json,
            r#"{"chunks":["Alice works at Acme.","Acme is in Canada."],"metadata":{"institution":"SFU","docType":"","year":""},"entities":["Acme","Alice","Canada"],"triples":[{"subject":"Alice","predicate":"worksAt","object":"Acme"}]}"#
        );
    }

    #[test]
    fn test_two_exports_are_byte_identical() {
        let doc = sample_document();

        let first = Exporter::snapshot(&doc).render(ExportFormat::Pretty).unwrap();
        let second = Exporter::snapshot(&doc).render(ExportFormat::Pretty).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("{\n  \"chunks\": ["));
    }

    #[test]
    fn test_empty_document_exports_every_key() {
        let json = Exporter::snapshot(&WorkingDocument::new())
            .render(ExportFormat::Compact)
            .unwrap();

        assert_eq!(
            json,
            r#"{"chunks":[],"metadata":{"institution":"","docType":"","year":""},"entities":[],"triples":[]}"#
        );
    }

    #[tokio::test]
    async fn test_write_to_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, "stale").unwrap();

        let record = Exporter::snapshot(&sample_document());
        record.write_to(&path, ExportFormat::Pretty).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: ExportRecord = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, record);
        assert!(!dir.path().join(".export.json.tmp").exists());
    }
}
