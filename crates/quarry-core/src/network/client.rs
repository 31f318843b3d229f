use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::config::InsightConfig;

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("Failed to fetch insights")]
    Status(StatusCode),
    #[error("Failed to fetch insights: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid insight endpoint: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type InsightResult<T> = Result<T, InsightError>;

/// Answer from the insight service, kept exactly as returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl QueryResult {
    /// Sources for display: repeats removed, first occurrence order kept.
    #[must_use]
    pub fn unique_sources(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.sources
            .iter()
            .map(String::as_str)
            .filter(|s| seen.insert(*s))
            .collect()
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
}

/// Thin request/response client for the question-answering service. One
/// attempt per question, no retry.
pub struct InsightClient {
    endpoint: Url,
    inner: Client,
}

impl InsightClient {
    pub fn new(config: &InsightConfig) -> InsightResult<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self { endpoint, inner })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn ask(&self, question: &str) -> InsightResult<QueryResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(InsightError::EmptyQuestion);
        }

        tracing::debug!(endpoint = %self.endpoint, "sending insight query");

        let response = self
            .inner
            .post(self.endpoint.clone())
            .json(&QueryRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "insight service returned an error");
            return Err(InsightError::Status(status));
        }

        Ok(response.json::<QueryResult>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test_server::respond_once;

    #[test]
    fn test_unique_sources_keep_first_occurrence() {
        let result = QueryResult {
            answer: "Yes".into(),
            sources: vec!["docA".into(), "docB".into(), "docA".into()],
        };

        assert_eq!(result.unique_sources(), vec!["docA", "docB"]);
        assert_eq!(result.sources.len(), 3);
    }

    #[tokio::test]
    async fn test_ask_posts_question_and_decodes_answer() {
        let (url, request) = respond_once(
            200,
            r#"{"answer":"Three goals.","sources":["plan.txt","plan.txt","budget.txt"]}"#,
        )
        .await;
        let client = InsightClient::new(&InsightConfig::default().with_endpoint(url)).unwrap();

        let result = client.ask("  What are the goals?  ").await.unwrap();

        assert_eq!(result.answer, "Three goals.");
        assert_eq!(result.unique_sources(), vec!["plan.txt", "budget.txt"]);
        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /query"));
        assert!(raw.ends_with(r#"{"question":"What are the goals?"}"#));
    }

    #[tokio::test]
    async fn test_non_success_is_generic_failure() {
        let (url, _request) = respond_once(500, r#"{"detail":"boom"}"#).await;
        let client = InsightClient::new(&InsightConfig::default().with_endpoint(url)).unwrap();

        let err = client.ask("anything").await.unwrap_err();

        assert!(matches!(err, InsightError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        assert_eq!(err.to_string(), "Failed to fetch insights");
    }

    #[tokio::test]
    async fn test_blank_question_is_not_sent() {
        let client = InsightClient::new(&InsightConfig::default()).unwrap();
        assert!(matches!(client.ask("   ").await, Err(InsightError::EmptyQuestion)));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let config = InsightConfig::default().with_endpoint("not a url");
        assert!(matches!(InsightClient::new(&config), Err(InsightError::UrlParse(_))));
    }
}
