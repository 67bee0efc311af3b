//! Chromaprint fingerprinting through the `fpcalc` binary.
//!
//! Implements the engine's capability trait on top of a subprocess: the
//! buffer is written to a transient WAV in the work directory, fpcalc runs
//! over it, and its `KEY=VALUE` stdout is parsed back. Raw mode yields the
//! integer sub-band hash sequence; plain mode yields the compressed opaque
//! string. fpcalc has no pairwise compare operation, so `native_compare`
//! stays at the trait's "unavailable" default.

use crate::exec::{run_with_timeout, tail_of};
use simulcheck_core::{EngineError, Fingerprint, FingerprintCapability};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

pub struct FpcalcCapability {
    binary: String,
    work_dir: PathBuf,
    raw: bool,
}

impl FpcalcCapability {
    pub fn new(binary: impl Into<String>, work_dir: impl Into<PathBuf>, raw: bool) -> Self {
        Self {
            binary: binary.into(),
            work_dir: work_dir.into(),
            raw,
        }
    }

    /// Writes the buffer as a 16-bit WAV for fpcalc to read. Overwritten on
    /// every call; never part of any durable state.
    fn write_wav(&self, samples: &[f32], sample_rate: u32) -> Result<PathBuf, EngineError> {
        std::fs::create_dir_all(&self.work_dir)
            .map_err(|e| EngineError::Fingerprint(format!("work dir: {e}")))?;
        let path = self.work_dir.join("fingerprint_input.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| EngineError::Fingerprint(format!("wav create: {e}")))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| EngineError::Fingerprint(format!("wav write: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| EngineError::Fingerprint(format!("wav finalize: {e}")))?;
        Ok(path)
    }
}

impl FingerprintCapability for FpcalcCapability {
    fn fingerprint(
        &self,
        samples: &[f32],
        sample_rate: u32,
        timeout: Duration,
    ) -> Result<Option<Fingerprint>, EngineError> {
        if samples.is_empty() {
            return Ok(None);
        }

        let wav = self.write_wav(samples, sample_rate)?;

        let mut cmd = Command::new(&self.binary);
        if self.raw {
            cmd.arg("-raw");
        }
        cmd.arg(&wav);

        let output = run_with_timeout(cmd, timeout, "fpcalc")
            .map_err(|e| EngineError::Fingerprint(e.to_string()))?;
        if !output.status.success() {
            return Err(EngineError::Fingerprint(tail_of(&output.stderr, 200)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_fpcalc_output(&stdout, self.raw)
            .map(Some)
            .ok_or_else(|| {
                EngineError::Fingerprint("no usable FINGERPRINT line in fpcalc output".to_string())
            })
    }

    fn probe(&self) -> Result<String, EngineError> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .output()
            .map_err(|e| EngineError::CapabilityMissing(format!("{}: {e}", self.binary)))?;
        if !output.status.success() {
            return Err(EngineError::CapabilityMissing(format!(
                "{} exited with {}",
                self.binary, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Parses fpcalc's `KEY=VALUE` stdout. The `DURATION=` line is ignored;
/// only `FINGERPRINT=` matters.
fn parse_fpcalc_output(text: &str, raw: bool) -> Option<Fingerprint> {
    let value = text
        .lines()
        .find_map(|line| line.trim().strip_prefix("FINGERPRINT="))?;
    if value.is_empty() {
        return None;
    }

    if raw {
        let hashes: Option<Vec<u32>> = value
            .split(',')
            .map(|v| v.trim().parse::<u32>().ok())
            .collect();
        hashes.map(Fingerprint::Hashes)
    } else {
        Some(Fingerprint::Opaque(value.to_string()))
    }
}
