//! Fingerprint extraction through an injected capability.
//!
//! The perceptual-hashing tool lives behind [`FingerprintCapability`] so the
//! engine never knows whether it is talking to a subprocess or a test fake.
//! Extraction failure is deliberately quiet: the caller gets `None` and
//! treats the cycle as "cannot judge", which is evidence of a degraded
//! capability, not of differing streams.

use crate::error::EngineError;
use crate::types::Fingerprint;
use std::time::Duration;

/// External perceptual-hashing facility.
pub trait FingerprintCapability: Send {
    /// Produces a fingerprint for a mono buffer, or `Ok(None)` when the
    /// capability has nothing to say about this input. `Err` is reserved
    /// for call failures (tool crashed, timed out, unparseable output).
    fn fingerprint(
        &self,
        samples: &[f32],
        sample_rate: u32,
        timeout: Duration,
    ) -> Result<Option<Fingerprint>, EngineError>;

    /// Direct comparison of two fingerprints as a percentage 0..100, for
    /// capabilities that expose one. Unavailable by default.
    fn native_compare(
        &self,
        _fp1: &Fingerprint,
        _fp2: &Fingerprint,
        _timeout: Duration,
    ) -> Option<Result<f64, EngineError>> {
        None
    }

    /// Availability check run once at startup. Returns a description of the
    /// backing tool, or [`EngineError::CapabilityMissing`].
    fn probe(&self) -> Result<String, EngineError>;
}

/// Extracts a fingerprint for at most `max_seconds` of the buffer.
///
/// Every failure mode (capability error, timeout, empty result) collapses
/// to `None` after a warning. Callers must not interpret `None` as low
/// similarity.
pub fn extract(
    capability: &dyn FingerprintCapability,
    samples: &[f32],
    sample_rate: u32,
    max_seconds: f64,
    timeout: Duration,
) -> Option<Fingerprint> {
    if samples.is_empty() {
        return None;
    }

    let analysis_len = ((max_seconds * sample_rate as f64) as usize).min(samples.len());
    match capability.fingerprint(&samples[..analysis_len], sample_rate, timeout) {
        Ok(Some(fp)) if !fp.is_empty() => Some(fp),
        Ok(_) => {
            log::warn!("fingerprint capability returned an empty result");
            None
        }
        Err(e) => {
            log::warn!("fingerprint extraction failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the analysis lengths it was called with and replies with a
    /// canned response.
    struct RecordingCapability {
        reply: Result<Option<Fingerprint>, String>,
        seen_lengths: Mutex<Vec<usize>>,
    }

    impl RecordingCapability {
        fn replying(reply: Result<Option<Fingerprint>, String>) -> Self {
            Self {
                reply,
                seen_lengths: Mutex::new(Vec::new()),
            }
        }
    }

    impl FingerprintCapability for RecordingCapability {
        fn fingerprint(
            &self,
            samples: &[f32],
            _sample_rate: u32,
            _timeout: Duration,
        ) -> Result<Option<Fingerprint>, EngineError> {
            self.seen_lengths.lock().unwrap().push(samples.len());
            self.reply
                .clone()
                .map_err(EngineError::Fingerprint)
        }

        fn probe(&self) -> Result<String, EngineError> {
            Ok("recording fake".to_string())
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn test_successful_extraction() {
        let cap = RecordingCapability::replying(Ok(Some(Fingerprint::Hashes(vec![1, 2, 3]))));
        let fp = extract(&cap, &[0.1; 16_000], 16_000, 120.0, TIMEOUT);
        assert_eq!(fp, Some(Fingerprint::Hashes(vec![1, 2, 3])));
    }

    #[test]
    fn test_empty_input_short_circuits() {
        let cap = RecordingCapability::replying(Ok(Some(Fingerprint::Hashes(vec![1]))));
        assert_eq!(extract(&cap, &[], 16_000, 120.0, TIMEOUT), None);
        assert!(cap.seen_lengths.lock().unwrap().is_empty());
    }

    #[test]
    fn test_capability_error_becomes_none() {
        let cap = RecordingCapability::replying(Err("tool exploded".to_string()));
        assert_eq!(extract(&cap, &[0.1; 100], 16_000, 120.0, TIMEOUT), None);
    }

    #[test]
    fn test_empty_fingerprint_becomes_none() {
        let cap = RecordingCapability::replying(Ok(Some(Fingerprint::Hashes(Vec::new()))));
        assert_eq!(extract(&cap, &[0.1; 100], 16_000, 120.0, TIMEOUT), None);

        let cap = RecordingCapability::replying(Ok(None));
        assert_eq!(extract(&cap, &[0.1; 100], 16_000, 120.0, TIMEOUT), None);
    }

    #[test]
    fn test_analysis_length_is_capped() {
        let cap = RecordingCapability::replying(Ok(Some(Fingerprint::Hashes(vec![1]))));
        // 4 s of audio, 2 s analysis bound.
        let _ = extract(&cap, &[0.1; 64_000], 16_000, 2.0, TIMEOUT);
        assert_eq!(*cap.seen_lengths.lock().unwrap(), vec![32_000]);

        // Bound longer than the chunk: the whole chunk goes through.
        let _ = extract(&cap, &[0.1; 8_000], 16_000, 2.0, TIMEOUT);
        assert_eq!(*cap.seen_lengths.lock().unwrap(), vec![32_000, 8_000]);
    }
}
