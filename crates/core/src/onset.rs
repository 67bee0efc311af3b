//! Onset-strength envelope extraction.
//!
//! Reduces a PCM buffer to a lower-rate signal whose peaks track transient
//! energy bursts. Each envelope frame covers one [`HOP_SIZE`] hop (32 ms at
//! 16 kHz) and carries the frame's spectral flux: the summed positive
//! difference between its magnitude spectrum and the previous frame's.
//! Transients survive re-encoding and bitrate changes far better than raw
//! sample energy, which is what makes this envelope a usable basis for
//! cross-correlating two independently captured streams.

use crate::constants::HOP_SIZE;
use spectrum_analyzer::scaling::divide_by_N_sqrt;
use spectrum_analyzer::{samples_fft_to_spectrum, FrequencyLimit};

/// Computes the onset-strength envelope of a mono buffer.
///
/// Returns one value per full hop; a trailing partial frame is dropped. The
/// first frame has no predecessor and contributes 0.
pub fn onset_envelope(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let mut hann = [0.0f32; HOP_SIZE];
    for (i, coeff) in hann.iter_mut().enumerate() {
        *coeff = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / HOP_SIZE as f32).cos());
    }

    let mut envelope = Vec::with_capacity(samples.len() / HOP_SIZE);
    let mut windowed = [0.0f32; HOP_SIZE];
    let mut prev_spectrum: Vec<f32> = Vec::new();

    for frame in samples.chunks_exact(HOP_SIZE) {
        for (i, sample) in frame.iter().enumerate() {
            windowed[i] = sample * hann[i];
        }

        let spectrum = samples_fft_to_spectrum(
            &windowed,
            sample_rate,
            FrequencyLimit::All,
            Some(&divide_by_N_sqrt),
        );

        let Ok(spectrum) = spectrum else {
            // Non-finite samples upset the FFT; treat the frame as silent.
            envelope.push(0.0);
            continue;
        };

        let magnitudes: Vec<f32> = spectrum.data().iter().map(|(_, v)| v.val()).collect();

        let flux = if prev_spectrum.len() == magnitudes.len() {
            magnitudes
                .iter()
                .zip(&prev_spectrum)
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum()
        } else {
            0.0
        };
        envelope.push(flux);
        prev_spectrum = magnitudes;
    }

    envelope
}

/// Seconds spanned by one envelope frame.
pub fn hop_seconds(sample_rate: u32) -> f64 {
    HOP_SIZE as f64 / sample_rate as f64
}
