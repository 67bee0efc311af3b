//! Stream capture through yt-dlp and ffmpeg.
//!
//! A capture resolves to one ffmpeg invocation that strips video, downmixes
//! to mono at the engine sample rate and writes a fixed-duration WAV into
//! the work directory. The WAV is transient: each cycle overwrites it.

use crate::exec::{run_with_timeout, tail_of};
use anyhow::{anyhow, bail, Context, Result};
use simulcheck_core::constants::SAMPLE_RATE;
use simulcheck_core::{AudioChunk, EngineError, SourceId};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

/// Smallest file we accept as a real capture. Anything under this is a
/// failed recording, not quiet audio.
const MIN_CAPTURE_BYTES: u64 = 1000;

/// yt-dlp format preference for live streams: the HLS ladder first, then
/// whatever is best.
const YTDLP_FORMATS: &str = "95/94/93/92/91/best";

/// One resolvable capture target.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    pub url: String,
    /// Extra HTTP headers for CDN-fronted streams that refuse anonymous
    /// clients (e.g. "Referer: ... User-Agent: ...").
    pub headers: Option<String>,
    pub source: SourceId,
    pub out_path: PathBuf,
}

/// Resolves a playable URL for a YouTube live video via yt-dlp.
pub fn resolve_youtube_url(video_id: &str, timeout: Duration) -> Result<String> {
    let mut cmd = Command::new("yt-dlp");
    cmd.args(["-f", YTDLP_FORMATS, "-g"])
        .arg(format!("https://www.youtube.com/watch?v={video_id}"));

    let output = run_with_timeout(cmd, timeout, "yt-dlp")?;
    if !output.status.success() {
        bail!("yt-dlp failed: {}", tail_of(&output.stderr, 200));
    }
    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        bail!("yt-dlp returned an empty URL");
    }
    Ok(url)
}

/// Records `duration_seconds` of mono 16 kHz audio from the source.
pub fn capture(
    source: &CaptureSource,
    duration_seconds: u32,
    timeout: Duration,
) -> Result<AudioChunk> {
    if let Some(parent) = source.out_path.parent() {
        fs::create_dir_all(parent).context("failed to create capture directory")?;
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y");
    if let Some(headers) = &source.headers {
        cmd.args(["-headers", headers]);
    }
    cmd.args(["-i", &source.url])
        .args(["-t", &duration_seconds.to_string()])
        .arg("-vn")
        .args(["-ac", "1"])
        .args(["-ar", &SAMPLE_RATE.to_string()])
        .arg(&source.out_path);

    let output = run_with_timeout(cmd, timeout, "ffmpeg")?;
    if !output.status.success() {
        bail!(
            "source {} capture failed: {}",
            source.source,
            tail_of(&output.stderr, 200)
        );
    }

    // A tool exit of 0 with a near-empty file still means the capture
    // failed; surface it loudly instead of fingerprinting noise.
    let size = fs::metadata(&source.out_path).map(|m| m.len()).unwrap_or(0);
    if size < MIN_CAPTURE_BYTES {
        return Err(EngineError::Capture {
            src: source.source,
            reason: format!("output file has {size} bytes"),
        }
        .into());
    }

    chunk_from_wav(&source.out_path, source.source)
}

/// Reads a captured WAV back as a mono chunk at the engine sample rate.
pub fn chunk_from_wav(path: &Path, source: SourceId) -> Result<AudioChunk> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        bail!("expected mono capture, got {} channels", spec.channels);
    }
    if spec.sample_rate != SAMPLE_RATE {
        bail!(
            "expected {SAMPLE_RATE} Hz capture, got {} Hz",
            spec.sample_rate
        );
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
    };

    Ok(AudioChunk::new(samples, SAMPLE_RATE, source))
}

/// Captures both sources concurrently and waits for both to finish. The
/// comparison stages must never start with one side still recording.
pub fn capture_pair(
    a: CaptureSource,
    b: CaptureSource,
    duration_seconds: u32,
    timeout: Duration,
) -> (Result<AudioChunk>, Result<AudioChunk>) {
    let handle_a = thread::spawn(move || capture(&a, duration_seconds, timeout));
    let handle_b = thread::spawn(move || capture(&b, duration_seconds, timeout));

    let result_a = handle_a
        .join()
        .unwrap_or_else(|_| Err(anyhow!("capture thread for source A panicked")));
    let result_b = handle_b
        .join()
        .unwrap_or_else(|_| Err(anyhow!("capture thread for source B panicked")));
    (result_a, result_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(name: &str, spec: hound::WavSpec, samples: &[i16]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn mono_spec(sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_chunk_from_wav_roundtrip() {
        let samples: Vec<i16> = vec![0, i16::MAX / 2, -i16::MAX / 2, 0];
        let path = write_test_wav("simulcheck_roundtrip.wav", mono_spec(SAMPLE_RATE), &samples);

        let chunk = chunk_from_wav(&path, SourceId::A).unwrap();
        assert_eq!(chunk.samples.len(), 4);
        assert_eq!(chunk.sample_rate, SAMPLE_RATE);
        assert!((chunk.samples[1] - 0.5).abs() < 0.01);
        assert!((chunk.samples[2] + 0.5).abs() < 0.01);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_chunk_from_wav_rejects_wrong_rate() {
        let path = write_test_wav("simulcheck_wrong_rate.wav", mono_spec(44_100), &[0, 0, 0]);
        let err = chunk_from_wav(&path, SourceId::B).unwrap_err();
        assert!(err.to_string().contains("44100"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_chunk_from_wav_rejects_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            ..mono_spec(SAMPLE_RATE)
        };
        let path = write_test_wav("simulcheck_stereo.wav", spec, &[0, 0, 0, 0]);
        let err = chunk_from_wav(&path, SourceId::B).unwrap_err();
        assert!(err.to_string().contains("channels"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(chunk_from_wav(Path::new("/nonexistent/missing.wav"), SourceId::A).is_err());
    }
}
