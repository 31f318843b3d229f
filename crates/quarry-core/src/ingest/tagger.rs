use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::report::Warning;
use super::stage::Stage;
use crate::document::Metadata;
use crate::error::ValidationError;
use crate::source::RawFile;

/// Partial metadata edit. `None` leaves a field alone; `Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(rename = "docType", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl MetadataUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    #[must_use]
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.institution.is_none() && self.doc_type.is_none() && self.year.is_none()
    }

    /// Keep only the fields that are still unset in `current`.
    #[must_use]
    pub fn only_missing(self, current: &Metadata) -> Self {
        Self {
            institution: self.institution.filter(|_| current.institution.is_empty()),
            doc_type: self.doc_type.filter(|_| current.doc_type.is_empty()),
            year: self.year.filter(|_| current.year.is_empty()),
        }
    }
}

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)").expect("valid regex"));

const DOC_TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("strategic", "Strategic Plan"),
    ("financial", "Financial Statement"),
    ("mandate", "Government Mandate Letter"),
    ("course", "Courses List"),
];

pub struct MetadataTagger;

impl MetadataTagger {
    /// Merge `update` into `metadata` without touching fields the update does
    /// not name. An implausible year is stored anyway and reported.
    pub fn merge(metadata: &mut Metadata, update: MetadataUpdate) -> Vec<Warning> {
        let mut warnings = Vec::new();

        if let Some(institution) = update.institution {
            metadata.institution = institution.trim().to_string();
        }
        if let Some(doc_type) = update.doc_type {
            metadata.doc_type = doc_type.trim().to_string();
        }
        if let Some(year) = update.year {
            let year = year.trim().to_string();
            if !year.is_empty() && !Self::is_plausible_year(&year) {
                let error = ValidationError::ImplausibleYear(year.clone());
                tracing::warn!(%year, "storing implausible year");
                warnings.push(Warning::new(Stage::Tag, "year", &error));
            }
            metadata.year = year;
        }

        warnings
    }

    #[must_use]
    pub fn is_plausible_year(year: &str) -> bool {
        year.len() == 4
            && year.bytes().all(|b| b.is_ascii_digit())
            && matches!(year.as_bytes()[0], b'1' | b'2')
    }

    /// Guess tags from file names and folder layout, falling back to the text
    /// for the year.
    #[must_use]
    pub fn suggest(files: &[RawFile], text: &str) -> MetadataUpdate {
        let mut update = MetadataUpdate::new();

        update.institution = files
            .first()
            .and_then(RawFile::parent_name)
            .filter(|name| !name.is_empty() && !name.starts_with('.'))
            .map(String::from);

        update.doc_type = files
            .iter()
            .filter_map(RawFile::file_name)
            .find_map(Self::classify_document_type)
            .map(String::from);

        update.year = files
            .iter()
            .filter_map(RawFile::file_name)
            .find_map(find_year)
            .or_else(|| find_year(text))
            .map(String::from);

        update
    }

    #[must_use]
    pub fn classify_document_type(file_name: &str) -> Option<&'static str> {
        let name = file_name.to_lowercase();
        DOC_TYPE_KEYWORDS
            .iter()
            .find(|(keyword, _)| name.contains(keyword))
            .map(|(_, label)| *label)
    }
}

fn find_year(text: &str) -> Option<&str> {
    YEAR_TOKEN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut metadata = Metadata {
            institution: "UBC".into(),
            doc_type: "Strategic Plan".into(),
            year: String::new(),
        };

        let warnings = MetadataTagger::merge(&mut metadata, MetadataUpdate::new().with_year("2025"));

        assert!(warnings.is_empty());
        assert_eq!(metadata.institution, "UBC");
        assert_eq!(metadata.doc_type, "Strategic Plan");
        assert_eq!(metadata.year, "2025");
    }

    #[test]
    fn test_implausible_year_warns_but_is_stored() {
        let mut metadata = Metadata::default();

        let warnings = MetadataTagger::merge(&mut metadata, MetadataUpdate::new().with_year("25"));

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].stage, Stage::Tag);
        assert_eq!(metadata.year, "25");
    }

    #[test]
    fn test_explicit_empty_clears_field() {
        let mut metadata = Metadata {
            institution: "SFU".into(),
            ..Metadata::default()
        };

        let warnings =
            MetadataTagger::merge(&mut metadata, MetadataUpdate::new().with_institution(" "));

        assert!(warnings.is_empty());
        assert!(metadata.institution.is_empty());
    }

    #[test]
    fn test_plausible_years() {
        assert!(MetadataTagger::is_plausible_year("1999"));
        assert!(MetadataTagger::is_plausible_year("2025"));
        assert!(!MetadataTagger::is_plausible_year("0999"));
        assert!(!MetadataTagger::is_plausible_year("20251"));
        assert!(!MetadataTagger::is_plausible_year("20x5"));
    }

    #[test]
    fn test_classify_document_type() {
        assert_eq!(
            MetadataTagger::classify_document_type("SFU_Strategic_Plan.pdf"),
            Some("Strategic Plan")
        );
        assert_eq!(
            MetadataTagger::classify_document_type("2023-financial-report.txt"),
            Some("Financial Statement")
        );
        assert_eq!(MetadataTagger::classify_document_type("notes.txt"), None);
    }

    #[test]
    fn test_suggest_from_layout() {
        let files = vec![
            RawFile::from_path("corpus/UBC/mandate_letter_2024.txt"),
            RawFile::from_path("corpus/UBC/other.txt"),
        ];

        let update = MetadataTagger::suggest(&files, "Published 1998.");

        assert_eq!(update.institution.as_deref(), Some("UBC"));
        assert_eq!(update.doc_type.as_deref(), Some("Government Mandate Letter"));
        assert_eq!(update.year.as_deref(), Some("2024"));
    }

    #[test]
    fn test_suggest_year_from_text() {
        let files = vec![RawFile::from_bytes("plan.txt", Vec::new())];

        let update = MetadataTagger::suggest(&files, "Fiscal year 2019/20 results");

        assert_eq!(update.institution, None);
        assert_eq!(update.year.as_deref(), Some("2019"));
    }

    #[test]
    fn test_only_missing() {
        let current = Metadata {
            institution: "SFU".into(),
            ..Metadata::default()
        };
        let update = MetadataUpdate::new()
            .with_institution("UBC")
            .with_year("2024")
            .only_missing(&current);

        assert_eq!(update.institution, None);
        assert_eq!(update.year.as_deref(), Some("2024"));
    }
}
