//! Time-offset estimation between two capture pipelines.
//!
//! Cross-correlates the onset-strength envelopes of the two buffers and
//! reads the lag of the correlation peak. Stateless: every cycle estimates
//! from its own pair of chunks only.
//!
//! Sign convention: a positive offset means source B's content occurs that
//! many seconds *after* the matching content in source A (B lags A and
//! should be trimmed from its start to line up).

use crate::onset::{hop_seconds, onset_envelope};
use crate::types::OffsetEstimate;

/// Estimates the lag between two mono buffers.
///
/// The peak search is restricted to lags within `max_offset_seconds`; the
/// confidence is the bounded peak's magnitude relative to the strongest
/// correlation anywhere on the curve, so an offset beyond the search range
/// shows up as low confidence rather than a wrong high-confidence lag.
///
/// Empty buffers and degenerate (constant) envelopes return a zero estimate
/// with zero confidence instead of an error.
pub fn estimate_offset(
    a: &[f32],
    b: &[f32],
    sample_rate: u32,
    max_offset_seconds: f64,
) -> OffsetEstimate {
    if a.is_empty() || b.is_empty() {
        return OffsetEstimate::none();
    }

    let mut env_a = onset_envelope(a, sample_rate);
    let mut env_b = onset_envelope(b, sample_rate);
    let len = env_a.len().max(env_b.len());
    if len == 0 {
        return OffsetEstimate::none();
    }

    // Zero-pad the shorter envelope, then bring both to zero mean and unit
    // variance so the correlation magnitudes are comparable across cycles.
    env_a.resize(len, 0.0);
    env_b.resize(len, 0.0);
    normalize(&mut env_a);
    normalize(&mut env_b);

    // Full cross-correlation in "same" mode: one value per lag, centered.
    let half = (len / 2) as i64;
    let lag_range = -half..=(len as i64 - 1 - half);

    let hop = hop_seconds(sample_rate);
    let max_lag = (max_offset_seconds / hop).floor() as i64;

    let mut global_peak = 0.0f64;
    let mut bounded_peak = 0.0f64;
    let mut bounded_lag = 0i64;

    for lag in lag_range {
        let mut sum = 0.0f64;
        for t in 0..len as i64 {
            let u = t + lag;
            if u < 0 || u >= len as i64 {
                continue;
            }
            sum += env_a[t as usize] as f64 * env_b[u as usize] as f64;
        }
        let magnitude = sum.abs();
        if magnitude > global_peak {
            global_peak = magnitude;
        }
        if lag.abs() <= max_lag && magnitude > bounded_peak {
            bounded_peak = magnitude;
            bounded_lag = lag;
        }
    }

    if global_peak <= f64::EPSILON {
        return OffsetEstimate::none();
    }

    OffsetEstimate {
        offset_seconds: bounded_lag as f64 * hop,
        confidence: (bounded_peak / global_peak).clamp(0.0, 1.0),
    }
}

/// Zero-mean unit-variance normalization in place. A constant signal has
/// nothing to correlate on, so it is zeroed out instead of divided by a
/// vanishing deviation.
fn normalize(signal: &mut [f32]) {
    let n = signal.len() as f32;
    let mean = signal.iter().sum::<f32>() / n;
    let variance = signal.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std_dev = variance.sqrt();
    if std_dev < 1e-9 {
        signal.fill(0.0);
        return;
    }
    for v in signal.iter_mut() {
        *v = (*v - mean) / std_dev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{HOP_SIZE, SAMPLE_RATE};

    fn click_track(duration_seconds: f64) -> Vec<f32> {
        let len = (duration_seconds * SAMPLE_RATE as f64) as usize;
        let mut samples = vec![0.0f32; len];
        // Irregular click spacing so the correlation peak is unambiguous.
        for &sec in &[0.3, 1.1, 2.0, 3.7, 4.3, 6.1, 7.9, 9.2, 10.6, 11.5] {
            let pos = (sec * SAMPLE_RATE as f64) as usize;
            for i in pos..(pos + 64).min(len) {
                samples[i] = 0.9;
            }
        }
        samples
    }

    /// Copy of `base` delayed by whole hops, same length.
    fn delayed_by_hops(base: &[f32], hops: usize) -> Vec<f32> {
        let shift = hops * HOP_SIZE;
        let mut delayed = vec![0.0f32; base.len()];
        delayed[shift..].copy_from_slice(&base[..base.len() - shift]);
        delayed
    }

    #[test]
    fn test_empty_buffers() {
        let est = estimate_offset(&[], &[0.1; 16_000], SAMPLE_RATE, 10.0);
        assert_eq!(est.offset_seconds, 0.0);
        assert_eq!(est.confidence, 0.0);

        let est = estimate_offset(&[0.1; 16_000], &[], SAMPLE_RATE, 10.0);
        assert_eq!(est.offset_seconds, 0.0);
        assert_eq!(est.confidence, 0.0);
    }

    #[test]
    fn test_degenerate_constant_signal() {
        // Constant DC has a flat spectrum over time: zero flux everywhere.
        let a = vec![0.3f32; HOP_SIZE * 100];
        let b = vec![0.3f32; HOP_SIZE * 100];
        let est = estimate_offset(&a, &b, SAMPLE_RATE, 10.0);
        assert_eq!(est.offset_seconds, 0.0);
        assert_eq!(est.confidence, 0.0);
    }

    #[test]
    fn test_identical_signals_zero_offset() {
        let a = click_track(12.0);
        let est = estimate_offset(&a, &a, SAMPLE_RATE, 10.0);
        assert!(
            est.offset_seconds.abs() < hop_seconds(SAMPLE_RATE) + 1e-9,
            "identical inputs must correlate at zero lag, got {}",
            est.offset_seconds
        );
        assert!(est.confidence > 0.9);
    }

    #[test]
    fn test_delayed_copy_positive_offset() {
        let a = click_track(12.0);
        // 64 hops = 2.048 s of delay on B.
        let b = delayed_by_hops(&a, 64);
        let est = estimate_offset(&a, &b, SAMPLE_RATE, 10.0);

        let expected = 64.0 * hop_seconds(SAMPLE_RATE);
        assert!(
            (est.offset_seconds - expected).abs() <= hop_seconds(SAMPLE_RATE),
            "expected ~{expected}, got {}",
            est.offset_seconds
        );
        assert!(est.confidence > 0.0);
    }

    #[test]
    fn test_leading_copy_negative_offset() {
        let b = click_track(12.0);
        // A delayed instead: B leads, offset must come out negative.
        let a = delayed_by_hops(&b, 64);
        let est = estimate_offset(&a, &b, SAMPLE_RATE, 10.0);

        let expected = -64.0 * hop_seconds(SAMPLE_RATE);
        assert!(
            (est.offset_seconds - expected).abs() <= hop_seconds(SAMPLE_RATE),
            "expected ~{expected}, got {}",
            est.offset_seconds
        );
    }

    #[test]
    fn test_peak_outside_search_range_lowers_confidence() {
        let a = click_track(12.0);
        let b = delayed_by_hops(&a, 64); // true lag ≈ 2.05 s
        let est = estimate_offset(&a, &b, SAMPLE_RATE, 1.0);
        assert!(
            est.confidence < 1.0,
            "true peak lies outside the 1 s search range"
        );
    }
}
