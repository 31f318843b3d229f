mod chunker;
mod extractor;
mod normalizer;
mod parser;
mod pipeline;
mod report;
mod stage;
mod tagger;
mod triples;

pub use chunker::{ChunkStrategy, Chunker, ChunkerConfig};
pub use extractor::{
    EntityExtractor, ExtractionPattern, ExtractionStrategy, RuleBasedEntityExtractor,
};
pub use normalizer::{clean_text, NormalizedText, TextNormalizer, PARAGRAPH_BREAK};
pub use parser::{
    decode_utf8, CompositeParser, DecodeError, DecodeResult, DocumentFormat, HtmlParser,
    JsonParser, Parser, PlainTextParser,
};
pub use pipeline::{
    CompletedJob, PipelineOrchestrator, StageJob, StageOutput, StageTicket,
    DEFAULT_STAGE_TIMEOUT,
};
pub use report::{Provenance, StageReport, Warning};
pub use stage::Stage;
pub use tagger::{MetadataTagger, MetadataUpdate};
pub use triples::{RuleBasedTripleExtractor, TripleExtractor};
