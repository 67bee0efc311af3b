//! Shared constants for the similarity engine.

/// Sample rate every capture is normalized to before it reaches the engine.
pub const SAMPLE_RATE: u32 = 16_000;

/// Hop between onset-envelope frames, in samples (32 ms at 16 kHz).
/// Must be a power of two for the FFT.
pub const HOP_SIZE: usize = 512;

/// Padding character for the character-similarity fallback. Chosen outside
/// the alphabet fpcalc emits so padded positions can never count as a match.
pub const NEUTRAL_FILLER: u8 = b'~';
