use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use simulcheck_core::{Engine, FingerprintCapability, SourceId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod capture;
mod chromaprint;
mod config;
mod exec;
mod report;

use capture::CaptureSource;
use chromaprint::FpcalcCapability;
use config::AppConfig;

#[derive(Parser)]
#[command(name = "simulcheck")]
#[command(about = "Checks whether two live audio streams carry the same broadcast", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Continuously compare the two sources (press Ctrl+C to stop)
    Run {
        /// YouTube video ID for source A
        #[arg(long)]
        youtube: Option<String>,
        /// Direct stream URL for source B
        #[arg(long)]
        stream: Option<String>,
        /// Seconds of audio captured per cycle
        #[arg(long)]
        chunk_seconds: Option<u32>,
        /// Number of cycles in the aggregation window
        #[arg(long)]
        window: Option<usize>,
    },
    /// Capture one window from each source, compare once, print JSON
    Once {
        #[arg(long)]
        youtube: Option<String>,
        #[arg(long)]
        stream: Option<String>,
        #[arg(long)]
        chunk_seconds: Option<u32>,
    },
    /// Check that ffmpeg, yt-dlp and fpcalc are available
    Probe,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            youtube,
            stream,
            chunk_seconds,
            window,
        } => {
            let mut cfg = AppConfig::load();
            apply_overrides(&mut cfg, youtube, stream, chunk_seconds);
            if let Some(w) = window {
                cfg.history_size = w;
            }
            cfg.save();
            run_loop(cfg)
        }
        Commands::Once {
            youtube,
            stream,
            chunk_seconds,
        } => {
            let mut cfg = AppConfig::load();
            apply_overrides(&mut cfg, youtube, stream, chunk_seconds);
            run_once(cfg)
        }
        Commands::Probe => probe(),
    }
}

fn apply_overrides(
    cfg: &mut AppConfig,
    youtube: Option<String>,
    stream: Option<String>,
    chunk_seconds: Option<u32>,
) {
    if let Some(v) = youtube {
        cfg.youtube_id = v;
    }
    if let Some(v) = stream {
        cfg.stream_url = v;
    }
    if let Some(v) = chunk_seconds {
        cfg.chunk_seconds = v;
    }
}

fn build_engine(cfg: &AppConfig) -> Result<Engine> {
    let capability = FpcalcCapability::new(
        &cfg.fpcalc_binary,
        cfg.resolved_work_dir().join("fingerprint"),
        cfg.raw_fingerprints,
    );
    let engine = Engine::new(cfg.engine_config(), Box::new(capability));

    // The one fatal condition: no fingerprinting tool, no comparisons.
    let tool = engine
        .probe_capability()
        .map_err(|e| anyhow!("{e}\nInstall chromaprint (fpcalc) and retry."))?;
    log::info!("fingerprint capability: {tool}");
    Ok(engine)
}

/// Resolves both capture targets. The YouTube URL is resolved once up
/// front; captures then reuse it every cycle.
fn resolve_sources(cfg: &AppConfig) -> Result<(CaptureSource, CaptureSource)> {
    if cfg.youtube_id.is_empty() || cfg.stream_url.is_empty() {
        bail!("both --youtube and --stream are required (or set them in the config file)");
    }

    println!("Resolving YouTube stream...");
    let youtube_url = capture::resolve_youtube_url(&cfg.youtube_id, Duration::from_secs(30))
        .context("failed to resolve YouTube stream")?;
    println!("✓ YouTube URL resolved");

    let work_dir = cfg.resolved_work_dir();
    Ok((
        CaptureSource {
            url: youtube_url,
            headers: None,
            source: SourceId::A,
            out_path: work_dir.join("source_a.wav"),
        },
        CaptureSource {
            url: cfg.stream_url.clone(),
            headers: cfg.stream_headers.clone(),
            source: SourceId::B,
            out_path: work_dir.join("source_b.wav"),
        },
    ))
}

fn run_loop(cfg: AppConfig) -> Result<()> {
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let mut engine = build_engine(&cfg)?.with_events(events_tx);
    let (source_a, source_b) = resolve_sources(&cfg)?;

    report::print_banner(&cfg);

    // Graceful shutdown: finish the cycle in flight, then stop.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nStopping after the current cycle...");
        r.store(false, Ordering::Relaxed);
    })?;

    let capture_timeout = Duration::from_secs(cfg.capture_timeout_seconds);
    while running.load(Ordering::Relaxed) {
        let (result_a, result_b) = capture::capture_pair(
            source_a.clone(),
            source_b.clone(),
            cfg.chunk_seconds,
            capture_timeout,
        );

        match (result_a, result_b) {
            (Ok(chunk_a), Ok(chunk_b)) => {
                let _ = engine.run_cycle(&chunk_a, &chunk_b);
                for event in events_rx.try_iter() {
                    report::print_event(&event, cfg.same_threshold, cfg.similar_threshold);
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                // Recoverable: skip the cycle, keep the history untouched.
                log::warn!("capture failed, skipping cycle: {e:#}");
                println!("✗ capture failed, skipping cycle");
            }
        }

        sleep_interruptible(&running, Duration::from_secs(cfg.sleep_between_seconds));
    }

    if let Some(summary) = engine.summary() {
        report::print_summary(&summary);
    }
    println!("simulcheck stopped.");
    Ok(())
}

fn run_once(cfg: AppConfig) -> Result<()> {
    let mut engine = build_engine(&cfg)?;
    let (source_a, source_b) = resolve_sources(&cfg)?;

    let capture_timeout = Duration::from_secs(cfg.capture_timeout_seconds);
    let (result_a, result_b) =
        capture::capture_pair(source_a, source_b, cfg.chunk_seconds, capture_timeout);
    let chunk_a = result_a.context("source A capture failed")?;
    let chunk_b = result_b.context("source B capture failed")?;

    let result = engine.run_cycle(&chunk_a, &chunk_b);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn probe() -> Result<()> {
    let cfg = AppConfig::load();
    let mut missing = 0;

    let capability = FpcalcCapability::new(
        &cfg.fpcalc_binary,
        cfg.resolved_work_dir().join("fingerprint"),
        cfg.raw_fingerprints,
    );
    match capability.probe() {
        Ok(desc) => println!("✓ fpcalc: {desc}"),
        Err(e) => {
            println!("✗ fpcalc: {e}");
            missing += 1;
        }
    }

    for (tool, version_arg) in [("ffmpeg", "-version"), ("yt-dlp", "--version")] {
        match std::process::Command::new(tool).arg(version_arg).output() {
            Ok(output) if output.status.success() => {
                let first_line = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string();
                println!("✓ {tool}: {first_line}");
            }
            Ok(output) => {
                println!("✗ {tool}: exited with {}", output.status);
                missing += 1;
            }
            Err(e) => {
                println!("✗ {tool}: {e}");
                missing += 1;
            }
        }
    }

    if missing > 0 {
        bail!("{missing} required tool(s) missing");
    }
    Ok(())
}

/// Sleeps in short steps so Ctrl+C is honored between cycles without
/// waiting out the full interval.
fn sleep_interruptible(running: &AtomicBool, total: Duration) {
    let mut remaining = total;
    while running.load(Ordering::Relaxed) && remaining > Duration::ZERO {
        let step = remaining.min(Duration::from_millis(100));
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
