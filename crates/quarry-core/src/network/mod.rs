mod client;
mod config;
mod remote;

pub use client::{InsightClient, InsightError, InsightResult, QueryResult};
pub use config::{InsightConfig, DEFAULT_INSIGHT_ENDPOINT};
pub use remote::RemoteExtractor;
