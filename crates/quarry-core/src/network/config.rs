use serde::{Deserialize, Serialize};

pub const DEFAULT_INSIGHT_ENDPOINT: &str = "http://localhost:8000/query";

/// Connection settings for the question-answering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Full URL the question is POSTed to
    pub endpoint: String,
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u32,
    /// Request timeout in seconds
    pub request_timeout_seconds: u32,
    /// User agent (crate name and version when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INSIGHT_ENDPOINT.to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 60,
            user_agent: None,
        }
    }
}

impl InsightConfig {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| concat!("quarry/", env!("CARGO_PKG_VERSION")).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_local_service() {
        let config = InsightConfig::default();
        assert_eq!(config.endpoint, "http://localhost:8000/query");
        assert!(config.user_agent().starts_with("quarry/"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: InsightConfig = toml::from_str("request_timeout_seconds = 5").unwrap();
        assert_eq!(config.request_timeout_seconds, 5);
        assert_eq!(config.endpoint, DEFAULT_INSIGHT_ENDPOINT);
    }
}
