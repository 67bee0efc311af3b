//! Engine error taxonomy.
//!
//! Only `CapabilityMissing` is fatal, and only at startup. Everything else
//! degrades inside a cycle: a failed extraction scores the cycle as 0, a
//! failed capture skips the cycle entirely. Nothing propagates past a cycle
//! boundary.

use crate::types::SourceId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The fingerprinting tool is not installed or not discoverable. The
    /// engine cannot produce any comparison without it.
    #[error("fingerprint capability missing: {0}")]
    CapabilityMissing(String),

    /// A fingerprint call failed or timed out. Recoverable; the extractor
    /// maps this to "no fingerprint".
    #[error("fingerprint call failed: {0}")]
    Fingerprint(String),

    /// The capability's native compare operation failed. Recoverable; the
    /// scorer falls through to the next strategy.
    #[error("native compare failed: {0}")]
    Compare(String),

    /// Capture produced no usable audio for one source. Recoverable; the
    /// cycle is skipped without touching the history.
    #[error("capture produced unusable audio for source {src}: {reason}")]
    Capture { src: SourceId, reason: String },
}
