pub mod aggregate;
pub mod align;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod offset;
pub mod onset;
pub mod score;
pub mod types;

pub use aggregate::Aggregator;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use extractor::{extract, FingerprintCapability};
pub use offset::estimate_offset;
pub use score::score;
pub use types::{
    AggregateReport, AudioChunk, ComparisonResult, CycleEvent, Fingerprint, OffsetEstimate,
    RunSummary, SourceId, Strategy, Verdict,
};
