//! Rolling history and verdict derivation.
//!
//! Single measurements are noisy: a buffering hiccup or a mid-window ad cut
//! can tank one cycle's similarity on streams that are in fact the same.
//! The aggregator keeps the last N results and derives the verdict from the
//! window, tolerating one weak cycle before giving up on SAME.

use crate::config::EngineConfig;
use crate::types::{AggregateReport, ComparisonResult, RunSummary, Verdict};
use std::collections::VecDeque;

/// Mean offset past this, measured at this confidence or better, is worth
/// surfacing as a steady inter-stream lag.
const STEADY_OFFSET_SECONDS: f64 = 2.0;
const STEADY_OFFSET_CONFIDENCE: f64 = 0.5;

/// Owns the bounded history of recent cycle results. Appended to by exactly
/// one writer (the cycle loop); verdicts are recomputed from scratch on
/// every read.
pub struct Aggregator {
    history: VecDeque<ComparisonResult>,
    capacity: usize,
    same_threshold: f64,
    similar_threshold: f64,

    // All-time totals for the end-of-run summary.
    total_cycles: usize,
    total_similarity: f64,
    total_offset: f64,
}

impl Aggregator {
    pub fn new(config: &EngineConfig) -> Self {
        let capacity = config.history_size.max(1);
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
            same_threshold: config.same_threshold,
            similar_threshold: config.similar_threshold,
            total_cycles: 0,
            total_similarity: 0.0,
            total_offset: 0.0,
        }
    }

    /// Appends a cycle result, evicting the oldest entry once over capacity.
    pub fn push(&mut self, result: &ComparisonResult) {
        self.history.push_back(result.clone());
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        self.total_cycles += 1;
        self.total_similarity += result.similarity;
        self.total_offset += result.offset.offset_seconds;
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Stabilized verdict, or `None` while the history is still filling.
    ///
    /// SAME tolerates a single weak cycle; a window that misses SAME but
    /// still averages above the SIMILAR threshold is SIMILAR; anything else
    /// is DIFFERENT.
    pub fn verdict(&self) -> Option<Verdict> {
        if self.history.len() < self.capacity {
            return None;
        }

        let high = self
            .history
            .iter()
            .filter(|r| r.similarity >= self.same_threshold)
            .count();
        if high >= self.capacity - 1 {
            return Some(Verdict::Same);
        }

        let mean = self.history.iter().map(|r| r.similarity).sum::<f64>()
            / self.history.len() as f64;
        if mean >= self.similar_threshold {
            Some(Verdict::Similar)
        } else {
            Some(Verdict::Different)
        }
    }

    /// Windowed aggregate for reporting, or `None` while the history is
    /// still filling.
    pub fn aggregate(&self) -> Option<AggregateReport> {
        let verdict = self.verdict()?;
        let n = self.history.len() as f64;

        let mean_similarity = self.history.iter().map(|r| r.similarity).sum::<f64>() / n;
        let mean_offset = self
            .history
            .iter()
            .map(|r| r.offset.offset_seconds)
            .sum::<f64>()
            / n;
        let mean_confidence = self
            .history
            .iter()
            .map(|r| r.offset.confidence)
            .sum::<f64>()
            / n;
        let high_matches = self
            .history
            .iter()
            .filter(|r| r.similarity >= self.same_threshold)
            .count();

        let steady_offset = (mean_offset.abs() > STEADY_OFFSET_SECONDS
            && mean_confidence > STEADY_OFFSET_CONFIDENCE)
            .then_some(mean_offset);

        Some(AggregateReport {
            window: self.history.len(),
            mean_similarity,
            mean_offset_seconds: mean_offset,
            mean_confidence,
            high_matches,
            verdict,
            steady_offset_seconds: steady_offset,
        })
    }

    /// All-time totals, or `None` if no cycle ever completed.
    pub fn summary(&self) -> Option<RunSummary> {
        if self.total_cycles == 0 {
            return None;
        }
        Some(RunSummary {
            cycles: self.total_cycles,
            mean_similarity: self.total_similarity / self.total_cycles as f64,
            mean_offset_seconds: self.total_offset / self.total_cycles as f64,
        })
    }
}
