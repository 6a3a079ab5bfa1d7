// Combination analyzer: scores a 6-number combination against the historical
// distributions and tallies recommendations over larger tickets.

use crate::combinations::k_combinations;
use crate::config::ScoringConfig;
use crate::draw::{
    average_gap, decade_signature, high_low_key, is_valid_number, number_sum, parity_key,
    NUMBERS_PER_DRAW,
};
use crate::stats::{Distributions, IdealRange};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Largest ticket the multi-combination analysis accepts.
pub const MAX_TICKET_SIZE: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("invalid combination: {0}")]
    InvalidCombination(String),
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SumVerdict {
    Ideal,
    Acceptable,
    Atypical,
}

/// How often a pattern shows up historically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrequencyVerdict {
    VeryCommon,
    Common,
    Uncommon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapVerdict {
    Ideal,
    Atypical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Recommendation {
    Strong,
    Balanced,
    Risky,
}

impl fmt::Display for SumVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SumVerdict::Ideal => "Ideal",
            SumVerdict::Acceptable => "Acceptable",
            SumVerdict::Atypical => "Atypical",
        })
    }
}

impl fmt::Display for FrequencyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrequencyVerdict::VeryCommon => "Very Common",
            FrequencyVerdict::Common => "Common",
            FrequencyVerdict::Uncommon => "Uncommon",
        })
    }
}

impl fmt::Display for GapVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GapVerdict::Ideal => "Ideal",
            GapVerdict::Atypical => "Atypical",
        })
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::Strong => "Statistically Strong",
            Recommendation::Balanced => "Balanced",
            Recommendation::Risky => "Risky (Atypical)",
        })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumAnalysis {
    pub value: u32,
    pub ideal_range: IdealRange,
    pub verdict: SumVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub key: String,
    pub percent: f64,
    pub verdict: FrequencyVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeAnalysis {
    pub signature: String,
    pub verdict: FrequencyVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapAnalysis {
    pub value: f64,
    pub ideal_range: IdealRange,
    pub verdict: GapVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub numbers: [u8; NUMBERS_PER_DRAW],
    pub sum: SumAnalysis,
    pub parity: PatternAnalysis,
    pub high_low: PatternAnalysis,
    pub decade: DecadeAnalysis,
    pub gap: GapAnalysis,
    pub score: u32,
    pub recommendation: Recommendation,
}

/// Recommendation counts over every 6-number sub-combination of a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationTally {
    pub strong: usize,
    pub balanced: usize,
    pub risky: usize,
}

impl RecommendationTally {
    pub fn record(&mut self, recommendation: Recommendation) {
        match recommendation {
            Recommendation::Strong => self.strong += 1,
            Recommendation::Balanced => self.balanced += 1,
            Recommendation::Risky => self.risky += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.strong + self.balanced + self.risky
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

fn frequency_verdict(percent: f64, scoring: &ScoringConfig) -> (FrequencyVerdict, u32) {
    if percent > scoring.very_common_percent {
        (FrequencyVerdict::VeryCommon, scoring.very_common_points)
    } else if percent > scoring.common_percent {
        (FrequencyVerdict::Common, scoring.common_points)
    } else {
        (FrequencyVerdict::Uncommon, 0)
    }
}

fn recommendation_for(score: u32, scoring: &ScoringConfig) -> Recommendation {
    if score >= scoring.strong_threshold {
        Recommendation::Strong
    } else if score >= scoring.balanced_threshold {
        Recommendation::Balanced
    } else {
        Recommendation::Risky
    }
}

/// Check that `numbers` holds distinct values in 1..=56 and return them
/// sorted.
pub(crate) fn sorted_distinct(numbers: &[u8]) -> Result<Vec<u8>, AnalysisError> {
    if let Some(bad) = numbers.iter().find(|&&n| !is_valid_number(n)) {
        return Err(AnalysisError::InvalidCombination(format!(
            "number {bad} is outside 1-56"
        )));
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(AnalysisError::InvalidCombination(
            "numbers must be distinct".into(),
        ));
    }
    Ok(sorted)
}

/// Score one 6-number combination against the historical distributions.
pub fn analyze(
    combination: &[u8],
    distributions: &Distributions,
    scoring: &ScoringConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let sorted = sorted_distinct(combination)?;
    let numbers: [u8; NUMBERS_PER_DRAW] = sorted.as_slice().try_into().map_err(|_| {
        AnalysisError::InvalidCombination(format!(
            "expected {NUMBERS_PER_DRAW} numbers, got {}",
            combination.len()
        ))
    })?;

    let mut score = 0;

    let sum_value = number_sum(&numbers);
    let sum_range = distributions.sum_stats.ideal_range;
    let sum_verdict = if sum_range.contains(sum_value as f64) {
        score += scoring.sum_ideal_points;
        SumVerdict::Ideal
    } else if sum_range
        .widened(distributions.sum_stats.stddev)
        .contains(sum_value as f64)
    {
        score += scoring.sum_acceptable_points;
        SumVerdict::Acceptable
    } else {
        SumVerdict::Atypical
    };

    let parity_key = parity_key(&numbers);
    let parity_percent = distributions.parity_percent(&parity_key);
    let (parity_verdict, points) = frequency_verdict(parity_percent, scoring);
    score += points;

    let high_low_key = high_low_key(&numbers);
    let high_low_percent = distributions.high_low_percent(&high_low_key);
    let (high_low_verdict, points) = frequency_verdict(high_low_percent, scoring);
    score += points;

    let signature = decade_signature(&numbers);
    let decade_verdict = if distributions.is_common_decade_pattern(&signature) {
        score += scoring.decade_common_points;
        FrequencyVerdict::VeryCommon
    } else {
        FrequencyVerdict::Uncommon
    };

    let gap_value = average_gap(&numbers);
    let gap_range = distributions.gap_stats.ideal_range;
    let gap_verdict = if gap_range.contains(gap_value) {
        score += scoring.gap_ideal_points;
        GapVerdict::Ideal
    } else {
        GapVerdict::Atypical
    };

    Ok(AnalysisResult {
        numbers,
        sum: SumAnalysis {
            value: sum_value,
            ideal_range: sum_range,
            verdict: sum_verdict,
        },
        parity: PatternAnalysis {
            key: parity_key,
            percent: parity_percent,
            verdict: parity_verdict,
        },
        high_low: PatternAnalysis {
            key: high_low_key,
            percent: high_low_percent,
            verdict: high_low_verdict,
        },
        decade: DecadeAnalysis {
            signature,
            verdict: decade_verdict,
        },
        gap: GapAnalysis {
            value: gap_value,
            ideal_range: gap_range,
            verdict: gap_verdict,
        },
        score,
        recommendation: recommendation_for(score, scoring),
    })
}

/// Analyze every 6-number sub-combination of a 6 to 10 number ticket.
pub fn analyze_ticket(
    numbers: &[u8],
    distributions: &Distributions,
    scoring: &ScoringConfig,
) -> Result<RecommendationTally, AnalysisError> {
    if !(NUMBERS_PER_DRAW..=MAX_TICKET_SIZE).contains(&numbers.len()) {
        return Err(AnalysisError::InvalidCombination(format!(
            "a ticket holds {NUMBERS_PER_DRAW} to {MAX_TICKET_SIZE} numbers, got {}",
            numbers.len()
        )));
    }
    let sorted = sorted_distinct(numbers)?;

    let mut tally = RecommendationTally::default();
    for combo in k_combinations(&sorted, NUMBERS_PER_DRAW) {
        tally.record(analyze(&combo, distributions, scoring)?.recommendation);
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{GapStats, SumStats};
    use std::collections::BTreeMap;

    fn distributions() -> Distributions {
        let mut parity = BTreeMap::new();
        parity.insert("3P-3I".to_string(), 33.0);
        parity.insert("2P-4I".to_string(), 24.0);
        parity.insert("6P-0I".to_string(), 1.0);
        let mut high_low = BTreeMap::new();
        high_low.insert("3B-3A".to_string(), 31.0);
        high_low.insert("4B-2A".to_string(), 20.0);
        Distributions {
            sum_stats: SumStats {
                mean: 170.0,
                stddev: 30.0,
                ideal_range: IdealRange::new(140.0, 200.0),
            },
            parity_distribution: parity,
            high_low_distribution: high_low,
            gap_stats: GapStats {
                mean_gap: 8.0,
                ideal_range: IdealRange::new(6.0, 10.0),
            },
            common_decade_patterns: vec!["1-1-1-1-1-1".into(), "1-2-1-1-1-0".into()],
            sample_size: 100,
        }
    }

    #[test]
    fn low_sum_is_atypical() {
        let result = analyze(&[1, 2, 3, 4, 5, 6], &distributions(), &ScoringConfig::default())
            .unwrap();
        assert_eq!(result.sum.value, 21);
        assert_eq!(result.sum.verdict, SumVerdict::Atypical);
        assert_eq!(result.gap.verdict, GapVerdict::Atypical);
        assert_eq!(result.recommendation, Recommendation::Risky);
    }

    #[test]
    fn well_shaped_combination_is_strong() {
        // sum 171, 3 even / 3 odd, 3 low / 3 high, one per decade, gap 9.8
        let result = analyze(&[6, 14, 23, 32, 41, 55], &distributions(), &ScoringConfig::default())
            .unwrap();
        assert_eq!(result.sum.verdict, SumVerdict::Ideal);
        assert_eq!(result.parity.key, "3P-3I");
        assert_eq!(result.parity.verdict, FrequencyVerdict::VeryCommon);
        assert_eq!(result.high_low.key, "3B-3A");
        assert_eq!(result.decade.signature, "1-1-1-1-1-1");
        assert_eq!(result.decade.verdict, FrequencyVerdict::VeryCommon);
        assert_eq!(result.gap.verdict, GapVerdict::Ideal);
        assert_eq!(result.score, 3 + 2 + 2 + 2 + 2);
        assert_eq!(result.recommendation, Recommendation::Strong);
    }

    #[test]
    fn acceptable_band_and_common_verdicts() {
        // sum 216 sits outside 140-200 but inside the band widened by stddev
        let result = analyze(&[13, 15, 28, 52, 53, 55], &distributions(), &ScoringConfig::default())
            .unwrap();
        assert_eq!(result.sum.value, 216);
        assert_eq!(result.sum.verdict, SumVerdict::Acceptable);
        assert_eq!(result.parity.key, "2P-4I");
        assert_eq!(result.parity.verdict, FrequencyVerdict::Common);
        assert_eq!(result.high_low.verdict, FrequencyVerdict::VeryCommon);
    }

    #[test]
    fn input_order_does_not_matter() {
        let dist = distributions();
        let scoring = ScoringConfig::default();
        let a = analyze(&[41, 6, 55, 23, 14, 32], &dist, &scoring).unwrap();
        let b = analyze(&[6, 14, 23, 32, 41, 55], &dist, &scoring).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.numbers, [6, 14, 23, 32, 41, 55]);
    }

    #[test]
    fn rejects_malformed_combinations() {
        let dist = distributions();
        let scoring = ScoringConfig::default();
        assert!(analyze(&[1, 2, 3, 4, 5], &dist, &scoring).is_err());
        assert!(analyze(&[1, 1, 3, 4, 5, 6], &dist, &scoring).is_err());
        assert!(analyze(&[0, 2, 3, 4, 5, 6], &dist, &scoring).is_err());
        assert!(analyze(&[1, 2, 3, 4, 5, 57], &dist, &scoring).is_err());
    }

    #[test]
    fn ticket_tally_covers_every_sub_combination() {
        let dist = distributions();
        let scoring = ScoringConfig::default();
        let tally = analyze_ticket(&[6, 14, 23, 32, 41, 55, 2, 9], &dist, &scoring).unwrap();
        assert_eq!(tally.total(), 28);

        let single = analyze_ticket(&[6, 14, 23, 32, 41, 55], &dist, &scoring).unwrap();
        assert_eq!(single.strong, 1);
        assert_eq!(single.total(), 1);

        assert!(analyze_ticket(&[1, 2, 3, 4, 5], &dist, &scoring).is_err());
        let eleven: Vec<u8> = (1..=11).collect();
        assert!(analyze_ticket(&eleven, &dist, &scoring).is_err());
    }
}
