//! The per-cycle comparison engine.
//!
//! One `Engine` owns the injected fingerprint capability, the configuration
//! and the rolling history. `run_cycle` is the single entry point: it takes
//! the two chunks the capturer produced and returns the cycle's result,
//! degrading through every partial failure instead of aborting. Status goes
//! out as structured [`CycleEvent`]s over an optional channel; the engine
//! itself never prints.

use crate::aggregate::Aggregator;
use crate::align::align;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::extractor::{extract, FingerprintCapability};
use crate::offset::estimate_offset;
use crate::score::score;
use crate::types::{
    AggregateReport, AudioChunk, ComparisonResult, CycleEvent, Fingerprint, OffsetEstimate,
    RunSummary, SourceId, Strategy, Verdict,
};
use crossbeam_channel::Sender;

pub struct Engine {
    config: EngineConfig,
    capability: Box<dyn FingerprintCapability>,
    aggregator: Aggregator,
    events: Option<Sender<CycleEvent>>,
    cycle_index: u64,

    // Previous fingerprints per source, for frozen-feed detection only.
    last_fingerprint_a: Option<Fingerprint>,
    last_fingerprint_b: Option<Fingerprint>,
}

impl Engine {
    pub fn new(config: EngineConfig, capability: Box<dyn FingerprintCapability>) -> Self {
        let aggregator = Aggregator::new(&config);
        Self {
            config,
            capability,
            aggregator,
            events: None,
            cycle_index: 0,
            last_fingerprint_a: None,
            last_fingerprint_b: None,
        }
    }

    /// Attaches a channel for structured per-cycle events.
    pub fn with_events(mut self, sender: Sender<CycleEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Checks the injected capability is actually usable. Run this once at
    /// startup; a missing capability is the one fatal condition.
    pub fn probe_capability(&self) -> Result<String, EngineError> {
        self.capability.probe()
    }

    /// Runs one full comparison cycle over a pair of captured chunks.
    ///
    /// Stages: offset estimation, conditional alignment, fingerprint
    /// extraction for both sides, strategy-chain scoring, history append.
    /// Partial failures degrade (un-aligned comparison, zero similarity);
    /// nothing escapes the cycle.
    pub fn run_cycle(&mut self, chunk_a: &AudioChunk, chunk_b: &AudioChunk) -> ComparisonResult {
        self.cycle_index += 1;
        let offset = estimate_offset(
            &chunk_a.samples,
            &chunk_b.samples,
            chunk_a.sample_rate,
            self.config.max_offset_seconds,
        );
        log::debug!(
            "cycle {}: offset {:+.2}s (confidence {:.2})",
            self.cycle_index,
            offset.offset_seconds,
            offset.confidence
        );

        let (buf_a, buf_b) = self.aligned_buffers(chunk_a, chunk_b, &offset);

        let fp_a = extract(
            self.capability.as_ref(),
            &buf_a,
            chunk_a.sample_rate,
            self.config.max_fingerprint_seconds,
            self.config.fingerprint_timeout,
        );
        let fp_b = extract(
            self.capability.as_ref(),
            &buf_b,
            chunk_b.sample_rate,
            self.config.max_fingerprint_seconds,
            self.config.fingerprint_timeout,
        );

        let stalled_a = Self::is_stalled(&fp_a, &self.last_fingerprint_a);
        let stalled_b = Self::is_stalled(&fp_b, &self.last_fingerprint_b);
        if stalled_a {
            log::warn!("source {} fingerprint unchanged since last cycle", SourceId::A);
        }
        if stalled_b {
            log::warn!("source {} fingerprint unchanged since last cycle", SourceId::B);
        }
        if let Some(fp) = &fp_a {
            self.last_fingerprint_a = Some(fp.clone());
        }
        if let Some(fp) = &fp_b {
            self.last_fingerprint_b = Some(fp.clone());
        }

        let (similarity, strategy) = match (&fp_a, &fp_b) {
            (Some(f1), Some(f2)) => score(f1, f2, self.capability.as_ref(), &self.config),
            _ => {
                // Cannot judge this cycle. Record it as zero similarity:
                // evidence of degradation, not proof the streams differ.
                (0.0, Strategy::NoFingerprint)
            }
        };

        let result = ComparisonResult {
            similarity,
            offset,
            strategy,
            stalled_a,
            stalled_b,
        };
        self.aggregator.push(&result);

        if let Some(sender) = &self.events {
            let _ = sender.send(CycleEvent::Cycle {
                index: self.cycle_index,
                result: result.clone(),
            });
            if let Some(report) = self.aggregator.aggregate() {
                let _ = sender.send(CycleEvent::Aggregate {
                    index: self.cycle_index,
                    report,
                });
            }
        }

        result
    }

    /// Stabilized verdict over the history, or `None` while it is filling.
    pub fn current_verdict(&self) -> Option<Verdict> {
        self.aggregator.verdict()
    }

    pub fn aggregate(&self) -> Option<AggregateReport> {
        self.aggregator.aggregate()
    }

    /// All-time totals for the end-of-run report.
    pub fn summary(&self) -> Option<RunSummary> {
        self.aggregator.summary()
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycle_index
    }

    /// Windows and, when the estimate is both confident and large enough,
    /// time-aligns the two buffers. Any alignment that would leave a side
    /// empty falls back to the un-aligned window.
    fn aligned_buffers(
        &self,
        chunk_a: &AudioChunk,
        chunk_b: &AudioChunk,
        offset: &OffsetEstimate,
    ) -> (Vec<f32>, Vec<f32>) {
        let sample_rate = chunk_a.sample_rate;

        if offset.confidence > 0.0
            && offset.offset_seconds.abs() > self.config.align_trigger_seconds
        {
            let (aligned_a, aligned_b) = align(
                &chunk_a.samples,
                &chunk_b.samples,
                sample_rate,
                offset.offset_seconds,
                self.config.window_seconds,
                self.config.small_offset_seconds,
            );
            if !aligned_a.is_empty() && !aligned_b.is_empty() {
                return (aligned_a, aligned_b);
            }
            log::warn!(
                "alignment for offset {:+.2}s produced an empty buffer, comparing un-aligned",
                offset.offset_seconds
            );
        }

        // Un-aligned path still honors the fixed comparison window.
        align(
            &chunk_a.samples,
            &chunk_b.samples,
            sample_rate,
            0.0,
            self.config.window_seconds,
            self.config.small_offset_seconds,
        )
    }

    fn is_stalled(current: &Option<Fingerprint>, previous: &Option<Fingerprint>) -> bool {
        matches!((current, previous), (Some(c), Some(p)) if c == p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SAMPLE_RATE;
    use std::time::Duration;

    /// Deterministic capability: fingerprints are derived from buffer
    /// content, so equal audio yields equal fingerprints.
    struct DeterministicCapability {
        /// Fingerprinting fails for buffers starting with this sample value.
        fail_marker: Option<f32>,
    }

    impl DeterministicCapability {
        fn new() -> Self {
            Self { fail_marker: None }
        }

        fn failing_on(marker: f32) -> Self {
            Self {
                fail_marker: Some(marker),
            }
        }
    }

    impl FingerprintCapability for DeterministicCapability {
        fn fingerprint(
            &self,
            samples: &[f32],
            _sample_rate: u32,
            _timeout: Duration,
        ) -> Result<Option<Fingerprint>, EngineError> {
            if let Some(marker) = self.fail_marker {
                if samples.first() == Some(&marker) {
                    return Err(EngineError::Fingerprint("simulated failure".to_string()));
                }
            }
            // Quantize coarse energy per second of audio.
            let hashes: Vec<u32> = samples
                .chunks(SAMPLE_RATE as usize)
                .map(|chunk| {
                    let energy: f32 = chunk.iter().map(|s| s.abs()).sum();
                    energy as u32
                })
                .collect();
            Ok(Some(Fingerprint::Hashes(hashes)))
        }

        fn probe(&self) -> Result<String, EngineError> {
            Ok("deterministic fake".to_string())
        }
    }

    fn chunk(source: SourceId, fill: f32, seconds: usize) -> AudioChunk {
        AudioChunk::new(
            vec![fill; SAMPLE_RATE as usize * seconds],
            SAMPLE_RATE,
            source,
        )
    }

    fn engine() -> Engine {
        Engine::new(
            EngineConfig::new(0.5, 0.35),
            Box::new(DeterministicCapability::new()),
        )
    }

    #[test]
    fn test_identical_chunks_score_one() {
        let mut engine = engine();
        let a = chunk(SourceId::A, 0.25, 5);
        let b = chunk(SourceId::B, 0.25, 5);
        let result = engine.run_cycle(&a, &b);
        assert_eq!(result.similarity, 1.0);
        assert_eq!(result.strategy, Strategy::ExactMatch);
    }

    #[test]
    fn test_verdict_after_full_window() {
        let mut engine = engine();
        let a = chunk(SourceId::A, 0.25, 5);
        let b = chunk(SourceId::B, 0.25, 5);

        for _ in 0..5 {
            assert_eq!(
                engine.current_verdict(),
                None,
                "no verdict before the window fills"
            );
            engine.run_cycle(&a, &b);
        }
        assert_eq!(engine.current_verdict(), Some(Verdict::Same));
        assert_eq!(engine.cycles_run(), 5);
    }

    #[test]
    fn test_extraction_failure_scores_zero_but_counts() {
        let mut engine = Engine::new(
            EngineConfig::new(0.5, 0.35),
            Box::new(DeterministicCapability::failing_on(0.77)),
        );
        let a = chunk(SourceId::A, 0.77, 5);
        let b = chunk(SourceId::B, 0.25, 5);

        let result = engine.run_cycle(&a, &b);
        assert_eq!(result.similarity, 0.0);
        assert_eq!(result.strategy, Strategy::NoFingerprint);

        // The failed cycle is evidence: it must land in the history.
        for _ in 0..4 {
            engine.run_cycle(&a, &b);
        }
        assert_eq!(engine.current_verdict(), Some(Verdict::Different));
    }

    #[test]
    fn test_stall_flags_on_repeated_fingerprints() {
        let mut engine = engine();
        let a = chunk(SourceId::A, 0.25, 5);
        let b = chunk(SourceId::B, 0.30, 5);

        let first = engine.run_cycle(&a, &b);
        assert!(!first.stalled_a, "first cycle has no predecessor");
        assert!(!first.stalled_b);

        let second = engine.run_cycle(&a, &b);
        assert!(second.stalled_a, "identical audio again: A is frozen");
        assert!(second.stalled_b);

        // Fresh content on B clears its flag.
        let b2 = chunk(SourceId::B, 0.10, 5);
        let third = engine.run_cycle(&a, &b2);
        assert!(third.stalled_a);
        assert!(!third.stalled_b);
    }

    #[test]
    fn test_events_are_emitted() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut engine = Engine::new(
            EngineConfig::new(0.5, 0.35),
            Box::new(DeterministicCapability::new()),
        )
        .with_events(tx);

        let a = chunk(SourceId::A, 0.25, 5);
        let b = chunk(SourceId::B, 0.25, 5);
        for _ in 0..5 {
            engine.run_cycle(&a, &b);
        }

        let events: Vec<CycleEvent> = rx.try_iter().collect();
        let cycles = events
            .iter()
            .filter(|e| matches!(e, CycleEvent::Cycle { .. }))
            .count();
        let aggregates = events
            .iter()
            .filter(|e| matches!(e, CycleEvent::Aggregate { .. }))
            .count();
        assert_eq!(cycles, 5);
        assert_eq!(aggregates, 1, "aggregate only once the window is full");
    }

    #[test]
    fn test_probe_reports_capability() {
        let engine = engine();
        assert_eq!(engine.probe_capability().unwrap(), "deterministic fake");
    }
}
