//! Console presentation of engine events.
//!
//! The engine emits structured events and never prints; everything the user
//! sees on stdout is formatted here.

use crate::config::AppConfig;
use simulcheck_core::{AggregateReport, ComparisonResult, CycleEvent, RunSummary, Verdict};

const RULE: &str =
    "───────────────────────────────────────────────────────────────────────────";

pub fn print_banner(config: &AppConfig) {
    println!("{RULE}");
    println!("simulcheck: live audio stream comparison");
    println!("{RULE}");
    println!("Source A (YouTube ID): {}", config.youtube_id);
    println!("Source B (stream URL): {}", config.stream_url);
    println!(
        "Chunk: {}s | Window: {} cycles | Thresholds: same={:.2} similar={:.2}",
        config.chunk_seconds, config.history_size, config.same_threshold, config.similar_threshold
    );
    println!("{RULE}");
}

pub fn print_event(event: &CycleEvent, same_threshold: f64, similar_threshold: f64) {
    match event {
        CycleEvent::Cycle { index, result } => print_cycle(*index, result, same_threshold, similar_threshold),
        CycleEvent::Aggregate { report, .. } => print_aggregate(report),
    }
}

fn print_cycle(index: u64, result: &ComparisonResult, same_threshold: f64, similar_threshold: f64) {
    println!(
        "Cycle {index}: similarity {:.3} ({}) | offset {:+.2}s (confidence {:.2})",
        result.similarity, result.strategy, result.offset.offset_seconds, result.offset.confidence
    );
    println!(
        "  {}",
        cycle_verdict_line(result.similarity, same_threshold, similar_threshold)
    );
    if result.stalled_a {
        println!("  ⚠ source A fingerprint unchanged, feed may be frozen");
    }
    if result.stalled_b {
        println!("  ⚠ source B fingerprint unchanged, feed may be frozen");
    }
}

fn print_aggregate(report: &AggregateReport) {
    println!("{RULE}");
    println!(
        "Aggregate (last {} cycles): mean similarity {:.3} | mean offset {:+.2}s (confidence {:.2}) | {}/{} high",
        report.window,
        report.mean_similarity,
        report.mean_offset_seconds,
        report.mean_confidence,
        report.high_matches,
        report.window
    );
    match report.verdict {
        Verdict::Same => println!("VERDICT: ✓ SAME AUDIO STREAM"),
        Verdict::Similar => println!("VERDICT: ~ SIMILAR AUDIO (compression/delay)"),
        Verdict::Different => println!("VERDICT: ✗ DIFFERENT AUDIO STREAMS"),
    }
    if let Some(offset) = report.steady_offset_seconds {
        println!(
            "  note: streams run ~{:.1}s apart (corrected automatically each cycle)",
            offset.abs()
        );
    }
    println!("{RULE}");
}

pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("Final statistics ({} cycles):", summary.cycles);
    println!("  Average similarity: {:.3}", summary.mean_similarity);
    println!("  Average offset: {:+.2}s", summary.mean_offset_seconds);
}

/// Instantaneous single-cycle judgment, before hysteresis.
fn cycle_verdict_line(similarity: f64, same_threshold: f64, similar_threshold: f64) -> &'static str {
    if similarity >= same_threshold {
        "verdict: same audio"
    } else if similarity >= similar_threshold {
        "verdict: similar audio (compression/delay)"
    } else {
        "verdict: different audio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_verdict_boundaries() {
        assert_eq!(cycle_verdict_line(0.9, 0.5, 0.35), "verdict: same audio");
        assert_eq!(
            cycle_verdict_line(0.5, 0.5, 0.35),
            "verdict: same audio",
            "threshold is inclusive"
        );
        assert_eq!(
            cycle_verdict_line(0.4, 0.5, 0.35),
            "verdict: similar audio (compression/delay)"
        );
        assert_eq!(cycle_verdict_line(0.1, 0.5, 0.35), "verdict: different audio");
    }
}
