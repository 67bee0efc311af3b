//! Data model shared across the engine stages.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

/// Which of the two capture pipelines a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    A,
    B,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::A => write!(f, "A"),
            SourceId::B => write!(f, "B"),
        }
    }
}

/// One captured window of mono PCM audio. Owned by the cycle that captured
/// it and dropped once the cycle's comparison completes.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub source: SourceId,
    pub captured_at: SystemTime,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, source: SourceId) -> Self {
        Self {
            samples,
            sample_rate,
            source,
            captured_at: SystemTime::now(),
        }
    }

    /// Nominal duration of the chunk in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Perceptual signature of an audio segment. Either a sequence of 32-bit
/// sub-band hashes (fpcalc raw mode) or an opaque string with no decodable
/// structure. Two fingerprints are only comparable if they came from the
/// same capability with the same parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fingerprint {
    Hashes(Vec<u32>),
    Opaque(String),
}

impl Fingerprint {
    pub fn len(&self) -> usize {
        match self {
            Fingerprint::Hashes(h) => h.len(),
            Fingerprint::Opaque(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Textual rendering used by the character-similarity fallback. Hash
    /// sequences render as their comma-delimited form (the same shape the
    /// capability emitted them in).
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Fingerprint::Opaque(s) => Cow::Borrowed(s),
            Fingerprint::Hashes(h) => {
                let joined = h
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                Cow::Owned(joined)
            }
        }
    }
}

/// Estimated time lag between the two sources for one cycle.
/// Positive means source B's content occurs `offset_seconds` after the
/// matching content in source A (B lags). Never carried across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetEstimate {
    pub offset_seconds: f64,
    pub confidence: f64,
}

impl OffsetEstimate {
    /// No measurable offset, zero confidence. Used for empty or degenerate
    /// inputs.
    pub fn none() -> Self {
        Self {
            offset_seconds: 0.0,
            confidence: 0.0,
        }
    }
}

/// Which comparison strategy produced the final score for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    ExactMatch,
    HammingWindow,
    NativeCompare,
    ChunkOverlap,
    CharSimilarity,
    /// Extraction failed on at least one side; the cycle scored 0 without
    /// any fingerprint comparison taking place.
    NoFingerprint,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strategy::ExactMatch => "exact-match",
            Strategy::HammingWindow => "hamming-window",
            Strategy::NativeCompare => "native-compare",
            Strategy::ChunkOverlap => "chunk-overlap",
            Strategy::CharSimilarity => "char-similarity",
            Strategy::NoFingerprint => "no-fingerprint",
        };
        write!(f, "{}", label)
    }
}

/// Outcome of one comparison cycle. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub similarity: f64,
    pub offset: OffsetEstimate,
    pub strategy: Strategy,
    /// Source produced the same fingerprint as on the previous cycle,
    /// which usually means a frozen or looping feed. Auxiliary signal only.
    pub stalled_a: bool,
    pub stalled_b: bool,
}

/// Stabilized judgment over the aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Same,
    Similar,
    Different,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Same => write!(f, "SAME"),
            Verdict::Similar => write!(f, "SIMILAR"),
            Verdict::Different => write!(f, "DIFFERENT"),
        }
    }
}

/// Windowed aggregate over the last N cycles, available once the history
/// is full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub window: usize,
    pub mean_similarity: f64,
    pub mean_offset_seconds: f64,
    pub mean_confidence: f64,
    /// Cycles in the window at or above the SAME threshold.
    pub high_matches: usize,
    pub verdict: Verdict,
    /// Set when the window shows a large, confidently measured lag between
    /// the streams (they match, but one runs behind the other).
    pub steady_offset_seconds: Option<f64>,
}

/// All-time totals, reported once when the run stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub cycles: usize,
    pub mean_similarity: f64,
    pub mean_offset_seconds: f64,
}

/// Structured per-cycle output for an external presentation layer. The
/// engine emits these over a channel instead of printing anything itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleEvent {
    Cycle {
        index: u64,
        result: ComparisonResult,
    },
    Aggregate {
        index: u64,
        report: AggregateReport,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_duration() {
        let chunk = AudioChunk::new(vec![0.0; 32_000], 16_000, SourceId::A);
        assert!((chunk.duration_seconds() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fingerprint_as_text() {
        let fp = Fingerprint::Hashes(vec![1, 22, 333]);
        assert_eq!(fp.as_text(), "1,22,333");

        let fp = Fingerprint::Opaque("AQAAxd".to_string());
        assert_eq!(fp.as_text(), "AQAAxd");
    }

    #[test]
    fn test_fingerprint_len() {
        assert_eq!(Fingerprint::Hashes(vec![5, 5, 5]).len(), 3);
        assert!(Fingerprint::Hashes(Vec::new()).is_empty());
        assert!(Fingerprint::Opaque(String::new()).is_empty());
    }
}
