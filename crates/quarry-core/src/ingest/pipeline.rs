use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use super::chunker::{Chunker, ChunkerConfig};
use super::extractor::{EntityExtractor, RuleBasedEntityExtractor};
use super::normalizer::{NormalizedText, TextNormalizer};
use super::report::{Provenance, StageReport, Warning};
use super::stage::Stage;
use super::tagger::{MetadataTagger, MetadataUpdate};
use super::triples::{RuleBasedTripleExtractor, TripleExtractor};
use crate::config::{Config, ConfigError, ExtractionBackend};
use crate::document::WorkingDocument;
use crate::entity::{EntityBatch, EntitySet};
use crate::error::{Error, Result, ServiceError, ValidationError};
use crate::export::{ExportRecord, Exporter};
use crate::network::RemoteExtractor;
use crate::source::RawFile;
use crate::triple::{self, Triple, TripleBatch, TripleConfig};

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifies the context an extraction was started in. A result is only
/// applied if its ticket still matches the orchestrator's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTicket {
    document_id: Uuid,
    stage: Stage,
    generation: u64,
}

impl StageTicket {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn document_id(&self) -> Uuid {
        self.document_id
    }
}

#[derive(Debug)]
pub enum StageOutput {
    Text(NormalizedText),
    Entities(EntityBatch),
    Triples(TripleBatch),
}

enum JobInput {
    Parse {
        files: Vec<RawFile>,
        normalizer: TextNormalizer,
    },
    Entities {
        chunks: Vec<String>,
        extractor: Arc<dyn EntityExtractor>,
    },
    Triples {
        chunks: Vec<String>,
        entities: EntitySet,
        extractor: Arc<dyn TripleExtractor>,
    },
}

/// An extraction detached from the orchestrator: it owns a snapshot of its
/// input and can be awaited or spawned without holding `&mut` on the session.
pub struct StageJob {
    ticket: StageTicket,
    input: JobInput,
    timeout: Duration,
}

impl StageJob {
    #[must_use]
    pub const fn ticket(&self) -> StageTicket {
        self.ticket
    }

    pub async fn run(self) -> CompletedJob {
        let Self {
            ticket,
            input,
            timeout,
        } = self;

        let work = async move {
            match input {
                JobInput::Parse { files, normalizer } => {
                    Ok(StageOutput::Text(normalizer.normalize(&files).await))
                }
                JobInput::Entities { chunks, extractor } => extractor
                    .extract_chunks(&chunks)
                    .await
                    .map(StageOutput::Entities),
                JobInput::Triples {
                    chunks,
                    entities,
                    extractor,
                } => extractor
                    .extract_chunks(&chunks, &entities)
                    .await
                    .map(StageOutput::Triples),
            }
        };

        let result = tokio::time::timeout(timeout, work)
            .await
            .unwrap_or_else(|_| {
                Err(ServiceError::Timeout {
                    stage: ticket.stage,
                    timeout,
                })
            });

        CompletedJob { ticket, result }
    }
}

#[derive(Debug)]
pub struct CompletedJob {
    ticket: StageTicket,
    result: std::result::Result<StageOutput, ServiceError>,
}

impl CompletedJob {
    #[must_use]
    pub const fn ticket(&self) -> StageTicket {
        self.ticket
    }

    #[must_use]
    pub const fn result(&self) -> &std::result::Result<StageOutput, ServiceError> {
        &self.result
    }
}

/// When each field was last written, on a per-session logical clock.
#[derive(Debug, Clone, Default)]
struct Lineage {
    clock: u64,
    written: [Option<u64>; Stage::ALL.len()],
}

impl Lineage {
    fn touch(&mut self, stage: Stage) {
        self.clock += 1;
        self.written[stage.index()] = Some(self.clock);
    }

    const fn written(&self, stage: Stage) -> Option<u64> {
        self.written[stage.index()]
    }
}

const fn inputs_of(stage: Stage) -> &'static [Stage] {
    match stage {
        Stage::Upload | Stage::Tag => &[],
        Stage::Parse => &[Stage::Upload],
        Stage::Chunk => &[Stage::Parse],
        Stage::ExtractEntities => &[Stage::Chunk],
        Stage::ExtractTriples => &[Stage::Chunk, Stage::ExtractEntities],
        Stage::Export => &[
            Stage::Tag,
            Stage::Chunk,
            Stage::ExtractEntities,
            Stage::ExtractTriples,
        ],
    }
}

/// Drives one [`WorkingDocument`] through the seven stages.
///
/// Navigation is permissive: any stage can be visited in any order and
/// nothing downstream is recomputed or cleared when an earlier field changes.
/// [`is_stale`](Self::is_stale) reports such drift without acting on it.
///
/// At most one extraction is in flight. Navigation, overrides and new loads
/// bump a generation counter; a [`CompletedJob`] whose ticket no longer
/// matches is rejected by [`apply`](Self::apply) and the document is left as
/// it was.
pub struct PipelineOrchestrator {
    document: WorkingDocument,
    stage: Stage,
    generation: u64,
    in_flight: Option<StageTicket>,
    lineage: Lineage,
    normalizer: TextNormalizer,
    chunker: Chunker,
    entity_extractor: Arc<dyn EntityExtractor>,
    triple_extractor: Arc<dyn TripleExtractor>,
    triple_config: TripleConfig,
    timeout: Duration,
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            document: WorkingDocument::new(),
            stage: Stage::Upload,
            generation: 0,
            in_flight: None,
            lineage: Lineage::default(),
            normalizer: TextNormalizer::default(),
            chunker: Chunker::default(),
            entity_extractor: Arc::new(RuleBasedEntityExtractor::with_default_patterns()),
            triple_extractor: Arc::new(RuleBasedTripleExtractor::new()),
            triple_config: TripleConfig::default(),
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.extraction.timeout_secs);
        let mut orchestrator = Self::new()
            .with_chunker(config.chunking.clone())
            .with_triple_config(config.triples.clone())
            .with_timeout(timeout);

        if config.extraction.backend == ExtractionBackend::Remote {
            let endpoint = config.extraction.endpoint.as_deref().ok_or_else(|| {
                ConfigError::invalid("extraction.endpoint", "required when backend = \"remote\"")
            })?;
            let url = Url::parse(endpoint)
                .map_err(|e| ConfigError::invalid("extraction.endpoint", e.to_string()))?;
            let remote = Arc::new(
                RemoteExtractor::new(url, timeout)
                    .map_err(|e| ConfigError::invalid("extraction.endpoint", e.to_string()))?,
            );

            tracing::info!(endpoint, "using remote extraction backend");
            orchestrator = orchestrator
                .with_entity_extractor(Arc::clone(&remote) as Arc<dyn EntityExtractor>)
                .with_triple_extractor(remote);
        }

        Ok(orchestrator)
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_chunker(mut self, config: ChunkerConfig) -> Self {
        self.chunker = Chunker::new(config);
        self
    }

    #[must_use]
    pub fn with_entity_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.entity_extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_triple_extractor(mut self, extractor: Arc<dyn TripleExtractor>) -> Self {
        self.triple_extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_triple_config(mut self, config: TripleConfig) -> Self {
        self.triple_config = config;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub const fn document(&self) -> &WorkingDocument {
        &self.document
    }

    #[must_use]
    pub const fn in_flight(&self) -> Option<StageTicket> {
        self.in_flight
    }

    #[must_use]
    pub const fn triple_config(&self) -> &TripleConfig {
        &self.triple_config
    }

    // Navigation

    /// Move to the next stage. Never blocks on missing data; no-op at export.
    pub fn advance(&mut self) -> Stage {
        if let Some(next) = self.stage.next() {
            self.move_to(next);
        }
        self.stage
    }

    /// Move to the previous stage; no-op at upload.
    pub fn retreat(&mut self) -> Stage {
        if let Some(previous) = self.stage.previous() {
            self.move_to(previous);
        }
        self.stage
    }

    pub fn jump_to(&mut self, stage: Stage) {
        if stage != self.stage {
            self.move_to(stage);
        }
    }

    fn move_to(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "navigating");
        self.stage = stage;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        if let Some(ticket) = self.in_flight.take() {
            tracing::debug!(stage = %ticket.stage, "in-flight result will be discarded");
        }
    }

    /// Replace the document set: fresh document, back at upload.
    pub fn load_files(&mut self, files: Vec<RawFile>) {
        self.document = WorkingDocument::with_files(files);
        self.stage = Stage::Upload;
        self.lineage = Lineage::default();
        self.lineage.touch(Stage::Upload);
        self.invalidate();

        tracing::info!(
            document_id = %self.document.id(),
            files = self.document.raw_files().len(),
            "loaded document set"
        );
    }

    // Asynchronous stages

    fn begin(&mut self, stage: Stage, input: JobInput) -> Result<StageJob> {
        if let Some(ticket) = self.in_flight {
            return Err(Error::Busy(ticket.stage));
        }

        let ticket = StageTicket {
            document_id: self.document.id(),
            stage,
            generation: self.generation,
        };
        self.in_flight = Some(ticket);

        Ok(StageJob {
            ticket,
            input,
            timeout: self.timeout,
        })
    }

    pub fn begin_parse(&mut self) -> Result<StageJob> {
        let input = JobInput::Parse {
            files: self.document.raw_files.clone(),
            normalizer: self.normalizer.clone(),
        };
        self.begin(Stage::Parse, input)
    }

    pub fn begin_entities(&mut self) -> Result<StageJob> {
        let input = JobInput::Entities {
            chunks: self.document.chunks.clone(),
            extractor: Arc::clone(&self.entity_extractor),
        };
        self.begin(Stage::ExtractEntities, input)
    }

    pub fn begin_triples(&mut self) -> Result<StageJob> {
        let input = JobInput::Triples {
            chunks: self.document.chunks.clone(),
            entities: self.document.entities.clone(),
            extractor: Arc::clone(&self.triple_extractor),
        };
        self.begin(Stage::ExtractTriples, input)
    }

    /// Write a finished job's output into the document. A failed job clears
    /// the in-flight slot and returns its error; a stale one is refused with
    /// [`Error::StaleResult`] and changes nothing.
    pub fn apply(&mut self, completed: CompletedJob) -> Result<StageReport> {
        let CompletedJob { ticket, result } = completed;

        if self.in_flight != Some(ticket)
            || ticket.document_id != self.document.id()
            || ticket.generation != self.generation
        {
            tracing::debug!(
                stage = %ticket.stage,
                generation = ticket.generation,
                current = self.generation,
                "discarding stale result"
            );
            return Err(Error::StaleResult {
                stage: ticket.stage,
            });
        }
        self.in_flight = None;

        let output = result.inspect_err(|e| {
            tracing::warn!(stage = %e.stage(), error = %e, "stage failed, document unchanged");
        })?;

        let report = match output {
            StageOutput::Text(normalized) => self.store_text(normalized),
            StageOutput::Entities(batch) => self.store_entities(batch, Provenance::Automatic),
            StageOutput::Triples(batch) => self.store_triples(batch, Provenance::Automatic),
        };
        Ok(report)
    }

    /// Drop the in-flight job, if any. Returns whether there was one.
    pub fn abandon(&mut self) -> bool {
        if self.in_flight.is_none() {
            return false;
        }
        self.invalidate();
        true
    }

    async fn finish(&mut self, job: StageJob) -> Result<StageReport> {
        let completed = job.run().await;
        self.apply(completed)
    }

    pub async fn run_parse(&mut self) -> Result<StageReport> {
        let job = self.begin_parse()?;
        self.finish(job).await
    }

    pub async fn run_entities(&mut self) -> Result<StageReport> {
        let job = self.begin_entities()?;
        self.finish(job).await
    }

    pub async fn run_triples(&mut self) -> Result<StageReport> {
        let job = self.begin_triples()?;
        self.finish(job).await
    }

    /// Every stage automatically, in order, ending at export.
    pub async fn run_all(&mut self) -> Result<Vec<StageReport>> {
        self.abandon();
        let mut reports = Vec::with_capacity(5);

        self.jump_to(Stage::Parse);
        reports.push(self.run_parse().await?);

        self.jump_to(Stage::Tag);
        reports.push(self.suggest_metadata());

        self.jump_to(Stage::Chunk);
        reports.push(self.compute_chunks());

        self.jump_to(Stage::ExtractEntities);
        reports.push(self.run_entities().await?);

        self.jump_to(Stage::ExtractTriples);
        reports.push(self.run_triples().await?);

        self.jump_to(Stage::Export);
        Ok(reports)
    }

    // Synchronous stages and overrides

    pub fn accept_text_override(&mut self, text: impl Into<String>) -> StageReport {
        self.invalidate();
        self.document.normalized_text = text.into();
        self.lineage.touch(Stage::Parse);

        tracing::info!(
            chars = self.document.normalized_text.chars().count(),
            "normalized text overridden"
        );
        StageReport::new(Stage::Parse, Provenance::Override).with_accepted(1)
    }

    pub fn update_metadata(&mut self, update: MetadataUpdate) -> StageReport {
        self.invalidate();
        let fields = [&update.institution, &update.doc_type, &update.year]
            .iter()
            .filter(|f| f.is_some())
            .count();

        let warnings = MetadataTagger::merge(&mut self.document.metadata, update);
        self.lineage.touch(Stage::Tag);

        tracing::info!(fields, "metadata updated");
        StageReport::new(Stage::Tag, Provenance::Override)
            .with_accepted(fields)
            .with_warnings(warnings)
    }

    /// Fill empty metadata fields from the file layout and text. Fields the
    /// user already set are left alone.
    pub fn suggest_metadata(&mut self) -> StageReport {
        let update = MetadataTagger::suggest(
            &self.document.raw_files,
            &self.document.normalized_text,
        )
        .only_missing(&self.document.metadata);

        if update.is_empty() {
            return StageReport::new(Stage::Tag, Provenance::Automatic);
        }

        let report = self.update_metadata(update);
        StageReport {
            provenance: Provenance::Automatic,
            ..report
        }
    }

    pub fn compute_chunks(&mut self) -> StageReport {
        self.invalidate();
        self.document.chunks = self.chunker.chunk(&self.document.normalized_text);
        self.lineage.touch(Stage::Chunk);

        tracing::info!(chunks = self.document.chunks.len(), "chunking complete");
        StageReport::new(Stage::Chunk, Provenance::Automatic).with_accepted(self.document.chunks.len())
    }

    /// Replace the chunks with user-edited ones. Empty items are dropped and
    /// reported; everything else is taken as-is.
    pub fn accept_chunks_override(&mut self, items: Vec<String>) -> StageReport {
        self.invalidate();
        let (accepted, rejected) = Chunker::validate(items);
        let warnings = rejection_warnings(Stage::Chunk, &rejected);

        self.document.chunks = accepted;
        self.lineage.touch(Stage::Chunk);

        tracing::info!(
            chunks = self.document.chunks.len(),
            rejected = warnings.len(),
            "chunks overridden"
        );
        StageReport::new(Stage::Chunk, Provenance::Override)
            .with_accepted(self.document.chunks.len())
            .with_warnings(warnings)
    }

    /// Chunks edited as one blob with a blank line between chunks.
    pub fn accept_chunks_text(&mut self, blob: &str) -> StageReport {
        self.accept_chunks_override(Chunker::split_override(blob))
    }

    pub fn accept_entities_override<I, S>(&mut self, items: I) -> StageReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.invalidate();
        self.store_entities(EntityBatch::from_items(items), Provenance::Override)
    }

    /// Comma-separated entity list.
    pub fn accept_entities_text(&mut self, list: &str) -> StageReport {
        self.invalidate();
        self.store_entities(EntityBatch::parse_list(list), Provenance::Override)
    }

    /// Replace the triples with user-supplied ones. Each is re-validated;
    /// a triple with an empty field is dropped and reported by position.
    pub fn accept_triples_override(&mut self, triples: Vec<Triple>) -> StageReport {
        self.invalidate();
        self.store_triples(TripleBatch::from_triples(triples), Provenance::Override)
    }

    /// Triples in the flat delimited form, one per line.
    pub fn accept_triples_text(&mut self, input: &str) -> StageReport {
        self.invalidate();
        let batch = triple::parse_delimited(input, self.triple_config.delimiter);
        self.store_triples(batch, Provenance::Override)
    }

    fn store_text(&mut self, normalized: NormalizedText) -> StageReport {
        let NormalizedText {
            text,
            documents,
            warnings,
        } = normalized;

        self.document.normalized_text = text;
        self.lineage.touch(Stage::Parse);

        tracing::info!(documents, skipped = warnings.len(), "parse complete");
        StageReport::new(Stage::Parse, Provenance::Automatic)
            .with_accepted(documents)
            .with_warnings(warnings)
    }

    fn store_entities(&mut self, batch: EntityBatch, provenance: Provenance) -> StageReport {
        let EntityBatch { entities, rejected } = batch;

        let warnings: Vec<Warning> = rejected
            .iter()
            .map(|entity| {
                let item = entity.item();
                tracing::warn!(%item, raw = %entity.raw, error = %entity.error, "rejected entity");
                Warning::new(Stage::ExtractEntities, item, &entity.error)
            })
            .collect();

        let count = entities.len();
        self.document.entities = entities;
        self.lineage.touch(Stage::ExtractEntities);

        tracing::info!(entities = count, ?provenance, "entities stored");
        StageReport::new(Stage::ExtractEntities, provenance)
            .with_accepted(count)
            .with_warnings(warnings)
    }

    fn store_triples(&mut self, batch: TripleBatch, provenance: Provenance) -> StageReport {
        let TripleBatch {
            mut accepted,
            rejected,
        } = batch;

        let warnings: Vec<Warning> = rejected
            .iter()
            .map(|record| {
                let item = record.item();
                tracing::warn!(%item, raw = %record.raw, error = %record.error, "rejected triple record");
                Warning::new(Stage::ExtractTriples, item, &record.error)
            })
            .collect();

        if self.triple_config.dedupe {
            let before = accepted.len();
            triple::dedupe(&mut accepted);
            tracing::debug!(removed = before - accepted.len(), "dropped duplicate triples");
        }

        let count = accepted.len();
        self.document.triples = accepted;
        self.lineage.touch(Stage::ExtractTriples);

        tracing::info!(triples = count, rejected = warnings.len(), ?provenance, "triples stored");
        StageReport::new(Stage::ExtractTriples, provenance)
            .with_accepted(count)
            .with_warnings(warnings)
    }

    // Read side

    /// True when an input of `stage` was rewritten after `stage` last produced
    /// output, directly or through an intermediate stage. Stages that never
    /// produced anything are not stale.
    #[must_use]
    pub fn is_stale(&self, stage: Stage) -> bool {
        let produced = self.lineage.written(stage);
        if produced.is_none() && stage != Stage::Export {
            return false;
        }

        inputs_of(stage).iter().any(|&input| {
            let newer = matches!(
                (self.lineage.written(input), produced),
                (Some(input_at), Some(produced_at)) if input_at > produced_at
            );
            newer || self.is_stale(input)
        })
    }

    #[must_use]
    pub fn export(&self) -> ExportRecord {
        Exporter::snapshot(&self.document)
    }
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn rejection_warnings(stage: Stage, rejected: &[ValidationError]) -> Vec<Warning> {
    rejected
        .iter()
        .map(|error| {
            let item = match error {
                ValidationError::EmptyChunk { index } => format!("chunk {index}"),
                _ => stage.to_string(),
            };
            tracing::warn!(%stage, %item, %error, "rejected item");
            Warning::new(stage, item, error)
        })
        .collect()
}
