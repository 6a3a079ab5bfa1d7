// Aggregation engine: one bulk pass from draw history to every derived table.

pub mod distribution;
pub mod predictive;
pub mod tables;

pub use distribution::{compute_distributions, Distributions, GapStats, IdealRange, SumStats};
pub use predictive::{build_predictive_index, trend_slope, PredictiveEntry, Trend};
pub use tables::{
    build_cooccurrence, repeated_combinations, CooccurrenceTable, FrequencyTable, GroupCount,
    PairTable, TrioTable,
};

use crate::config::AnalysisConfig;
use crate::draw::{DrawRecord, NUMBERS_PER_DRAW};
use serde::Serialize;
use tracing::{debug, info};

/// Everything derived from the draw history. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    /// Full history, most recent first, including incomplete records.
    pub history: Vec<DrawRecord>,
    pub frequency: FrequencyTable,
    pub pairs: PairTable,
    pub trios: TrioTable,
    pub repeated_combinations: Vec<GroupCount<NUMBERS_PER_DRAW>>,
    /// Occurrences within the most recent window of complete draws.
    pub recent_frequency: FrequencyTable,
    pub predictive_index: Vec<PredictiveEntry>,
    pub distributions: Distributions,
    pub complete_draws: usize,
}

impl Stats {
    /// Build every table from `history` (expected most recent first).
    ///
    /// Records without a complete main set stay in `history` but feed none of
    /// the tallies.
    pub fn build(history: Vec<DrawRecord>, config: &AnalysisConfig) -> Self {
        let complete: Vec<[u8; NUMBERS_PER_DRAW]> =
            history.iter().filter_map(DrawRecord::sorted_main).collect();
        let skipped = history.len() - complete.len();
        if skipped > 0 {
            debug!(skipped, "incomplete draws excluded from tallies");
        }

        let frequency = FrequencyTable::from_draws(&complete);
        let (pairs, trios) = build_cooccurrence(&complete);
        let repeated = repeated_combinations(&complete);
        let recent = &complete[..config.recent_window.min(complete.len())];
        let recent_frequency = FrequencyTable::from_draws(recent);
        let predictive_index =
            build_predictive_index(&complete, config.recent_window, &config.trend);
        let distributions =
            compute_distributions(&complete, config.gap_margin, config.top_decade_patterns);

        info!(
            draws = history.len(),
            complete = complete.len(),
            pairs = pairs.len(),
            trios = trios.len(),
            "aggregate tables built"
        );

        Stats {
            history,
            frequency,
            pairs,
            trios,
            repeated_combinations: repeated,
            recent_frequency,
            predictive_index,
            distributions,
            complete_draws: complete.len(),
        }
    }

    pub fn find_draw(&self, draw_id: &str) -> Option<&DrawRecord> {
        self.history.iter().find(|d| d.draw_id == draw_id)
    }

    pub fn latest_draw(&self) -> Option<&DrawRecord> {
        self.history.first()
    }

    pub fn predictive_entry(&self, number: u8) -> Option<&PredictiveEntry> {
        self.predictive_index.iter().find(|e| e.number == number)
    }
}
