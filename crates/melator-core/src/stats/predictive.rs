// Predictive index: cold streak, recent frequency and presence trend per
// number, folded into one integer composite score.

use crate::config::TrendConfig;
use crate::draw::{all_numbers, NUMBERS_PER_DRAW};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Ascending,
    Descending,
    Stable,
}

impl Trend {
    pub fn classify(slope: f64, config: &TrendConfig) -> Self {
        if slope > config.ascending_threshold {
            Trend::Ascending
        } else if slope < config.descending_threshold {
            Trend::Descending
        } else {
            Trend::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Ascending => "Ascending",
            Trend::Descending => "Descending",
            Trend::Stable => "Stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictiveEntry {
    pub number: u8,
    /// Draws since the number last appeared (0 = in the latest draw).
    pub cold_streak: usize,
    pub recent_frequency: u32,
    pub trend_slope: f64,
    pub trend: Trend,
    pub composite_score: i64,
}

/// Ordinary least-squares slope of `values` against their indices.
///
/// Returns 0.0 with fewer than two points or a degenerate denominator.
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let denominator = n_f * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denominator
}

pub fn composite_score(
    recent_frequency: u32,
    slope: f64,
    cold_streak: usize,
    config: &TrendConfig,
) -> i64 {
    let raw = config.recent_frequency_weight * recent_frequency as f64
        + config.slope_weight * slope
        + config.cold_streak_weight * cold_streak as f64;
    (10.0 * raw).round() as i64
}

/// Build the index for every number from complete draws ordered most recent
/// first. Only the first `recent_window` draws feed frequency and trend.
pub fn build_predictive_index(
    draws: &[[u8; NUMBERS_PER_DRAW]],
    recent_window: usize,
    config: &TrendConfig,
) -> Vec<PredictiveEntry> {
    let recent = &draws[..recent_window.min(draws.len())];

    all_numbers()
        .map(|number| {
            let cold_streak = draws
                .iter()
                .position(|d| d.contains(&number))
                .unwrap_or(draws.len());

            // oldest to newest
            let presence: Vec<f64> = recent
                .iter()
                .rev()
                .map(|d| if d.contains(&number) { 1.0 } else { 0.0 })
                .collect();
            let recent_frequency = presence.iter().filter(|&&p| p > 0.0).count() as u32;
            let slope = trend_slope(&presence);

            PredictiveEntry {
                number,
                cold_streak,
                recent_frequency,
                trend_slope: slope,
                trend: Trend::classify(slope, config),
                composite_score: composite_score(recent_frequency, slope, cold_streak, config),
            }
        })
        .collect()
}
