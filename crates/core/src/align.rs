//! Buffer alignment ahead of fingerprint comparison.
//!
//! Re-slices one of the two buffers so a fixed-length comparison window is
//! time-aligned. Convention: the *lagging* stream loses its head. A
//! positive offset (B lags A) trims B's start, a negative offset trims A's
//! start. The reference side is always read from its own start; its tail is
//! never sliced.

/// Applies the alignment policy and truncates both sides to the comparison
/// window.
///
/// Offsets below `small_offset_seconds` are noise: re-slicing for them adds
/// more alignment error than the offset itself, so both buffers pass
/// through unchanged apart from the window truncation.
///
/// An oversized offset can leave the trimmed side empty; callers fall back
/// to the un-aligned buffers in that case rather than aborting the cycle.
pub fn align(
    a: &[f32],
    b: &[f32],
    sample_rate: u32,
    offset_seconds: f64,
    window_seconds: f64,
    small_offset_seconds: f64,
) -> (Vec<f32>, Vec<f32>) {
    let window = (window_seconds * sample_rate as f64) as usize;

    if offset_seconds.abs() < small_offset_seconds {
        return (window_of(a, window), window_of(b, window));
    }

    let skip = (offset_seconds.abs() * sample_rate as f64) as usize;
    if offset_seconds > 0.0 {
        // B runs behind A: drop B's stale head.
        let b_trimmed = b.get(skip..).unwrap_or(&[]);
        (window_of(a, window), window_of(b_trimmed, window))
    } else {
        // B runs ahead of A: A is the laggard, drop its head instead.
        let a_trimmed = a.get(skip..).unwrap_or(&[]);
        (window_of(a_trimmed, window), window_of(b, window))
    }
}

fn window_of(samples: &[f32], window: usize) -> Vec<f32> {
    samples[..samples.len().min(window)].to_vec()
}
