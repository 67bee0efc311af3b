//! Engine configuration.
//!
//! An immutable value handed to [`crate::Engine`] at construction. The
//! SAME/SIMILAR thresholds have no engine-side defaults on purpose: they
//! drifted between 0.35 and 0.80 over the life of this tool, so callers must
//! state the values they run with.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Verdict boundary: a cycle at or above this similarity counts as a
    /// high match.
    pub same_threshold: f64,
    /// Verdict boundary: a window whose mean similarity reaches this is
    /// SIMILAR even without enough high matches.
    pub similar_threshold: f64,

    /// Length of the fixed comparison window both buffers are truncated to.
    pub window_seconds: f64,
    /// Aggregation window size N.
    pub history_size: usize,
    /// Widest lag the offset search considers in either direction.
    pub max_offset_seconds: f64,
    /// Offsets below this are treated as noise; re-slicing would add more
    /// alignment error than it removes.
    pub small_offset_seconds: f64,
    /// Alignment only runs at all when the estimate exceeds this.
    pub align_trigger_seconds: f64,
    /// At most this much audio is handed to the fingerprint capability.
    pub max_fingerprint_seconds: f64,

    /// Bits of a 32-bit hash pair allowed to differ while still counting as
    /// a positional match (absorbs lossy re-encoding).
    pub hamming_tolerance_bits: u32,
    /// Integer index offsets searched by the sliding Hamming match
    /// (-span..=+span).
    pub hamming_search_span: i64,
    /// Minimum sliding-Hamming score accepted before falling through.
    pub hamming_accept: f64,
    /// Minimum chunk-overlap score accepted before falling through.
    pub overlap_accept: f64,

    pub fingerprint_timeout: Duration,
    pub compare_timeout: Duration,
}

impl EngineConfig {
    /// Builds a configuration with the caller's verdict thresholds and the
    /// canonical structural defaults. Fields are public; adjust after
    /// construction where a run needs something unusual.
    pub fn new(same_threshold: f64, similar_threshold: f64) -> Self {
        Self {
            same_threshold,
            similar_threshold,
            window_seconds: 20.0,
            history_size: 5,
            max_offset_seconds: 10.0,
            small_offset_seconds: 0.5,
            align_trigger_seconds: 1.0,
            max_fingerprint_seconds: 120.0,
            hamming_tolerance_bits: 16,
            hamming_search_span: 10,
            hamming_accept: 0.4,
            overlap_accept: 0.3,
            fingerprint_timeout: Duration::from_secs(30),
            compare_timeout: Duration::from_secs(10),
        }
    }
}
