use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::entity::{EntityBatch, EntitySet};
use crate::error::ServiceError;
use crate::ingest::{EntityExtractor, ExtractionStrategy, Stage, TripleExtractor};
use crate::triple::TripleBatch;

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    task: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entities: Vec<&'a str>,
}

/// Model back-end reached over HTTP. One POST per chunk:
/// `{"task": "entities" | "triples", "text": ...}` answered by
/// `{"entities": [...]}` or `{"triples": [...]}`.
pub struct RemoteExtractor {
    endpoint: Url,
    inner: Client,
}

impl RemoteExtractor {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { endpoint, inner })
    }

    async fn call(
        &self,
        stage: Stage,
        request: &ExtractionRequest<'_>,
    ) -> Result<serde_json::Value, ServiceError> {
        let failed = |message: String| ServiceError::Failed { stage, message };

        let response = self
            .inner
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ServiceError::InvalidResponse {
            stage,
            message: e.to_string(),
        })
    }
}

fn take_field(
    mut value: serde_json::Value,
    key: &str,
    stage: Stage,
) -> Result<serde_json::Value, ServiceError> {
    value
        .get_mut(key)
        .map(serde_json::Value::take)
        .ok_or_else(|| ServiceError::InvalidResponse {
            stage,
            message: format!("missing `{key}` field"),
        })
}

#[async_trait::async_trait]
impl EntityExtractor for RemoteExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Remote
    }

    async fn extract_entities(&self, text: &str) -> Result<EntityBatch, ServiceError> {
        if text.trim().is_empty() {
            return Ok(EntityBatch::new());
        }

        let stage = Stage::ExtractEntities;
        let request = ExtractionRequest {
            task: "entities",
            text,
            entities: Vec::new(),
        };
        let response = self.call(stage, &request).await?;

        let serde_json::Value::Array(items) = take_field(response, "entities", stage)? else {
            return Err(ServiceError::InvalidResponse {
                stage,
                message: "`entities` is not an array".into(),
            });
        };

        let batch = EntityBatch::from_json_items(&items);
        if !batch.rejected.is_empty() {
            tracing::warn!(
                rejected = batch.rejected.len(),
                "remote extractor returned unusable entities"
            );
        }
        Ok(batch)
    }
}

#[async_trait::async_trait]
impl TripleExtractor for RemoteExtractor {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Remote
    }

    async fn extract_triples(
        &self,
        text: &str,
        entities: &EntitySet,
    ) -> Result<TripleBatch, ServiceError> {
        if text.trim().is_empty() {
            return Ok(TripleBatch::new());
        }

        let stage = Stage::ExtractTriples;
        let request = ExtractionRequest {
            task: "triples",
            text,
            entities: entities.iter().collect(),
        };
        let response = self.call(stage, &request).await?;

        Ok(TripleBatch::from_json_value(&take_field(response, "triples", stage)?))
    }
}
