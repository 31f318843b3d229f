pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod export;
pub mod ingest;
pub mod network;
pub mod source;
pub mod triple;

pub use config::{Config, ConfigError, ExtractionBackend, ExtractionConfig};
pub use document::{Metadata, WorkingDocument};
pub use entity::{
    EntityBatch, EntitySet, NearDuplicate, RejectedEntity, NEAR_DUPLICATE_THRESHOLD,
};
pub use error::{Error, Result, ServiceError, ValidationError};
pub use export::{ExportFormat, ExportRecord, Exporter};
pub use ingest::{
    ChunkStrategy, Chunker, ChunkerConfig, MetadataTagger, MetadataUpdate, PipelineOrchestrator,
    Provenance, Stage, StageReport, Warning,
};
pub use network::{InsightClient, InsightConfig, InsightError, QueryResult, RemoteExtractor};
pub use source::RawFile;
pub use triple::{RejectedRecord, Triple, TripleBatch, TripleConfig};
