use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::ingest::ChunkerConfig;
use crate::network::InsightConfig;
use crate::triple::TripleConfig;

pub const ENV_INSIGHT_URL: &str = "QUARRY_INSIGHT_URL";
pub const ENV_EXTRACTION_URL: &str = "QUARRY_EXTRACTION_URL";
pub const ENV_CHUNK_MAX_CHARS: &str = "QUARRY_CHUNK_MAX_CHARS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Where entity and triple extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionBackend {
    /// Built-in deterministic rules
    #[default]
    Rules,
    /// HTTP model service at `extraction.endpoint`
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub backend: ExtractionBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Upper bound on one extraction call, in seconds
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: ExtractionBackend::Rules,
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkerConfig,
    pub extraction: ExtractionConfig,
    pub triples: TripleConfig,
    pub insight: InsightConfig,
}

impl Config {
    /// `$XDG_CONFIG_HOME/quarry/config.toml` or the platform equivalent.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quarry").join("config.toml"))
    }

    /// Read `path` (or the default location if it exists), then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };

        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `QUARRY_*` overrides from `lookup`. Setting an extraction URL
    /// also switches the backend to remote.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_INSIGHT_URL) {
            self.insight.endpoint = url;
        }

        if let Some(url) = lookup(ENV_EXTRACTION_URL) {
            self.extraction.endpoint = Some(url);
            self.extraction.backend = ExtractionBackend::Remote;
        }

        if let Some(raw) = lookup(ENV_CHUNK_MAX_CHARS) {
            self.chunking.max_chars = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("chunking.max_chars", format!("{raw:?} is not a number")))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_chars == 0 {
            return Err(ConfigError::invalid("chunking.max_chars", "must be greater than 0"));
        }

        if self.triples.delimiter.is_whitespace() {
            return Err(ConfigError::invalid("triples.delimiter", "must not be whitespace"));
        }

        if self.extraction.timeout_secs == 0 {
            return Err(ConfigError::invalid("extraction.timeout_secs", "must be greater than 0"));
        }

        check_url("insight.endpoint", &self.insight.endpoint)?;

        match (&self.extraction.endpoint, self.extraction.backend) {
            (Some(endpoint), _) => {
                check_url("extraction.endpoint", endpoint)?;
            }
            (None, ExtractionBackend::Remote) => {
                return Err(ConfigError::invalid(
                    "extraction.endpoint",
                    "required when backend = \"remote\"",
                ));
            }
            (None, ExtractionBackend::Rules) => {}
        }

        Ok(())
    }
}

fn check_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::invalid(key, format!("{value:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(key, format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}
