//! Fingerprint comparison: an ordered chain of fallback strategies.
//!
//! The first strategy that yields a usable result wins; later ones run only
//! when an earlier one is inapplicable or under its own acceptance floor.
//! Scores from different strategies are never blended.
//!
//! 1. Exact match: identical fingerprints score 1.0 outright.
//! 2. Sliding-window Hamming match: integer hash sequences, tolerant of
//!    bit flips from lossy re-encoding and of small frame misalignment.
//! 3. Native compare: the capability's own comparison, when it has one.
//! 4. Chunk overlap: string fingerprints, literal substring evidence.
//! 5. Character similarity: total fallback, always produces a value.

use crate::config::EngineConfig;
use crate::constants::NEUTRAL_FILLER;
use crate::extractor::FingerprintCapability;
use crate::types::{Fingerprint, Strategy};

/// Compares two fingerprints. Returns a similarity in [0, 1] and the label
/// of the strategy that produced it.
pub fn score(
    fp1: &Fingerprint,
    fp2: &Fingerprint,
    capability: &dyn FingerprintCapability,
    config: &EngineConfig,
) -> (f64, Strategy) {
    if fp1 == fp2 {
        return (1.0, Strategy::ExactMatch);
    }

    if let (Fingerprint::Hashes(x), Fingerprint::Hashes(y)) = (fp1, fp2) {
        if let Some(s) = hamming_window_score(
            x,
            y,
            config.hamming_search_span,
            config.hamming_tolerance_bits,
        ) {
            if s >= config.hamming_accept {
                return (s, Strategy::HammingWindow);
            }
            log::debug!("hamming score {s:.3} under acceptance floor, falling through");
        }
    }

    if let Some(outcome) = capability.native_compare(fp1, fp2, config.compare_timeout) {
        match outcome {
            Ok(percent) => return ((percent / 100.0).clamp(0.0, 1.0), Strategy::NativeCompare),
            Err(e) => log::debug!("native compare unusable, falling through: {e}"),
        }
    }

    if let (Fingerprint::Opaque(s1), Fingerprint::Opaque(s2)) = (fp1, fp2) {
        if let Some(s) = chunk_overlap_score(s1, s2) {
            if s >= config.overlap_accept {
                return (s, Strategy::ChunkOverlap);
            }
            log::debug!("chunk overlap {s:.3} under acceptance floor, falling through");
        }
    }

    (
        char_similarity(&fp1.as_text(), &fp2.as_text()),
        Strategy::CharSimilarity,
    )
}

/// Best fraction of positionally matching hashes over small integer index
/// offsets between the two sequences. A position matches when the two
/// 32-bit hashes differ in at most `tolerance_bits` bits.
fn hamming_window_score(x: &[u32], y: &[u32], span: i64, tolerance_bits: u32) -> Option<f64> {
    if x.is_empty() || y.is_empty() {
        return None;
    }

    let mut best = 0.0f64;
    for shift in -span..=span {
        let mut matches = 0usize;
        let mut overlap = 0usize;
        for (i, &xv) in x.iter().enumerate() {
            let j = i as i64 + shift;
            if j < 0 || j >= y.len() as i64 {
                continue;
            }
            overlap += 1;
            if (xv ^ y[j as usize]).count_ones() <= tolerance_bits {
                matches += 1;
            }
        }
        if overlap > 0 {
            best = best.max(matches as f64 / overlap as f64);
        }
    }
    Some(best)
}

/// Fraction of the shorter fingerprint's chunks found in the longer one.
///
/// The shorter string is partitioned into fixed-size chunks (length/8, at
/// least 20 characters); each chunk is slid over the longer string with an
/// overlapping half-chunk stride and counts as found when some window
/// matches it in at least 80% of positions. Inapplicable (`None`) when the
/// shorter string cannot produce a single full chunk.
fn chunk_overlap_score(s1: &str, s2: &str) -> Option<f64> {
    let (short, long) = if s1.len() <= s2.len() {
        (s1.as_bytes(), s2.as_bytes())
    } else {
        (s2.as_bytes(), s1.as_bytes())
    };
    let chunk_len = (short.len() / 8).max(20);
    if chunk_len > short.len() || chunk_len > long.len() {
        return None;
    }

    let stride = (chunk_len / 2).max(1);
    let mut total = 0usize;
    let mut found = 0usize;

    let mut pos = 0;
    while pos + chunk_len <= short.len() {
        total += 1;
        let chunk = &short[pos..pos + chunk_len];

        let mut offset = 0;
        while offset + chunk_len <= long.len() {
            let window = &long[offset..offset + chunk_len];
            let equal = chunk.iter().zip(window).filter(|(a, b)| a == b).count();
            // >= 80% positional match, integer arithmetic
            if equal * 5 >= chunk_len * 4 {
                found += 1;
                break;
            }
            offset += stride;
        }
        pos += chunk_len;
    }

    if total == 0 {
        return None;
    }
    Some(found as f64 / total as f64)
}

/// Fraction of identical character positions after padding the shorter
/// rendering with a neutral filler. Total: always produces a value, and
/// padded positions can never match real content.
fn char_similarity(a: &str, b: &str) -> f64 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 1.0;
    }
    let ab = a.as_bytes();
    let bb = b.as_bytes();
    let mut same = 0usize;
    for i in 0..len {
        let ca = ab.get(i).copied().unwrap_or(NEUTRAL_FILLER);
        let cb = bb.get(i).copied().unwrap_or(NEUTRAL_FILLER);
        if ca == cb {
            same += 1;
        }
    }
    same as f64 / len as f64
}
