use serde::{Deserialize, Serialize};

/// One step of the ingestion wizard, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Parse,
    Tag,
    Chunk,
    ExtractEntities,
    ExtractTriples,
    Export,
}

impl Stage {
    pub const ALL: [Self; 7] = [
        Self::Upload,
        Self::Parse,
        Self::Tag,
        Self::Chunk,
        Self::ExtractEntities,
        Self::ExtractTriples,
        Self::Export,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Upload => Some(Self::Parse),
            Self::Parse => Some(Self::Tag),
            Self::Tag => Some(Self::Chunk),
            Self::Chunk => Some(Self::ExtractEntities),
            Self::ExtractEntities => Some(Self::ExtractTriples),
            Self::ExtractTriples => Some(Self::Export),
            Self::Export => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Upload => None,
            Self::Parse => Some(Self::Upload),
            Self::Tag => Some(Self::Parse),
            Self::Chunk => Some(Self::Tag),
            Self::ExtractEntities => Some(Self::Chunk),
            Self::ExtractTriples => Some(Self::ExtractEntities),
            Self::Export => Some(Self::ExtractTriples),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Parse => "parse",
            Self::Tag => "tag",
            Self::Chunk => "chunk",
            Self::ExtractEntities => "extract_entities",
            Self::ExtractTriples => "extract_triples",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::Upload.next(), Some(Stage::Parse));
        assert_eq!(Stage::Export.next(), None);
        assert_eq!(Stage::Upload.previous(), None);
        assert_eq!(Stage::Export.previous(), Some(Stage::ExtractTriples));

        for pair in Stage::ALL.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_stage_round_trip_names() {
        assert_eq!("extract_entities".parse::<Stage>(), Ok(Stage::ExtractEntities));
        assert!("nonsense".parse::<Stage>().is_err());
        assert_eq!(Stage::Chunk.to_string(), "chunk");
        assert_eq!(Stage::Export.index(), 6);
    }
}
