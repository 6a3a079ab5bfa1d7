// Shape distributions over complete draws: sum, parity, high/low, decade
// occupancy and average gap.

use crate::draw::{
    average_gap, decade_signature, high_low_key, number_sum, parity_key, NUMBERS_PER_DRAW,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Closed interval used for the sum and gap "ideal" bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdealRange {
    pub low: f64,
    pub high: f64,
}

impl IdealRange {
    pub fn new(low: f64, high: f64) -> Self {
        IdealRange { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// The range widened by `margin` on both sides.
    pub fn widened(&self, margin: f64) -> Self {
        IdealRange {
            low: self.low - margin,
            high: self.high + margin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SumStats {
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
    /// `[round(mean - stddev), round(mean + stddev)]`.
    pub ideal_range: IdealRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapStats {
    pub mean_gap: f64,
    /// Mean gap plus/minus the configured margin, rounded to one decimal.
    pub ideal_range: IdealRange,
}

/// Everything the analyzer and generator compare candidates against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distributions {
    pub sum_stats: SumStats,
    /// "xP-yI" → percentage of complete draws.
    pub parity_distribution: BTreeMap<String, f64>,
    /// "xB-yA" → percentage of complete draws.
    pub high_low_distribution: BTreeMap<String, f64>,
    pub gap_stats: GapStats,
    /// Most frequent decade signatures, most common first.
    pub common_decade_patterns: Vec<String>,
    /// Number of complete draws the distributions were computed from.
    pub sample_size: usize,
}

impl Distributions {
    pub fn parity_percent(&self, key: &str) -> f64 {
        self.parity_distribution.get(key).copied().unwrap_or(0.0)
    }

    pub fn high_low_percent(&self, key: &str) -> f64 {
        self.high_low_distribution.get(key).copied().unwrap_or(0.0)
    }

    pub fn is_common_decade_pattern(&self, signature: &str) -> bool {
        self.common_decade_patterns.iter().any(|p| p == signature)
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentages are stored at two decimals; verdict thresholds compare
/// against the stored value.
fn round_to_hundredth(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn to_percentages(counts: HashMap<String, usize>, total: usize) -> BTreeMap<String, f64> {
    counts
        .into_iter()
        .map(|(key, count)| {
            let pct = if total == 0 {
                0.0
            } else {
                round_to_hundredth(count as f64 / total as f64 * 100.0)
            };
            (key, pct)
        })
        .collect()
}

/// Compute every distribution from complete, sorted draws.
///
/// An empty input yields zeroed statistics and empty maps.
pub fn compute_distributions(
    draws: &[[u8; NUMBERS_PER_DRAW]],
    gap_margin: f64,
    top_decade_patterns: usize,
) -> Distributions {
    let total = draws.len();

    let sums: Vec<f64> = draws.iter().map(|d| number_sum(d) as f64).collect();
    let sum_mean = mean(&sums);
    let sum_stddev = population_stddev(&sums, sum_mean);

    let gaps: Vec<f64> = draws.iter().map(|d| average_gap(d)).collect();
    let gap_mean = mean(&gaps);

    let mut parity: HashMap<String, usize> = HashMap::new();
    let mut high_low: HashMap<String, usize> = HashMap::new();
    let mut decades: HashMap<String, usize> = HashMap::new();
    for draw in draws {
        *parity.entry(parity_key(draw)).or_insert(0) += 1;
        *high_low.entry(high_low_key(draw)).or_insert(0) += 1;
        *decades.entry(decade_signature(draw)).or_insert(0) += 1;
    }

    let mut decade_ranking: Vec<(String, usize)> = decades.into_iter().collect();
    decade_ranking.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let common_decade_patterns = decade_ranking
        .into_iter()
        .take(top_decade_patterns)
        .map(|(signature, _)| signature)
        .collect();

    Distributions {
        sum_stats: SumStats {
            mean: sum_mean,
            stddev: sum_stddev,
            ideal_range: IdealRange::new(
                (sum_mean - sum_stddev).round(),
                (sum_mean + sum_stddev).round(),
            ),
        },
        parity_distribution: to_percentages(parity, total),
        high_low_distribution: to_percentages(high_low, total),
        gap_stats: GapStats {
            mean_gap: gap_mean,
            ideal_range: IdealRange::new(
                round_to_tenth(gap_mean - gap_margin),
                round_to_tenth(gap_mean + gap_margin),
            ),
        },
        common_decade_patterns,
        sample_size: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_stats_use_population_stddev() {
        let draws = [[1, 2, 3, 4, 5, 6], [1, 2, 3, 4, 5, 10]];
        let dist = compute_distributions(&draws, 2.0, 5);
        // sums 21 and 25
        assert!((dist.sum_stats.mean - 23.0).abs() < 1e-9);
        assert!((dist.sum_stats.stddev - 2.0).abs() < 1e-9);
        assert_eq!(dist.sum_stats.ideal_range, IdealRange::new(21.0, 25.0));
        assert_eq!(dist.sample_size, 2);
    }

    #[test]
    fn parity_and_high_low_percentages() {
        let draws = [
            [2, 4, 6, 31, 33, 35],
            [1, 3, 5, 30, 32, 34],
            [2, 4, 6, 8, 10, 12],
            [29, 31, 33, 35, 37, 39],
        ];
        let dist = compute_distributions(&draws, 2.0, 5);
        assert!((dist.parity_percent("3P-3I") - 50.0).abs() < 1e-9);
        assert!((dist.parity_percent("6P-0I") - 25.0).abs() < 1e-9);
        assert!((dist.parity_percent("0P-6I") - 25.0).abs() < 1e-9);
        assert_eq!(dist.parity_percent("2P-4I"), 0.0);
        assert!((dist.high_low_percent("3B-3A") - 50.0).abs() < 1e-9);
        assert!((dist.high_low_percent("6B-0A") - 25.0).abs() < 1e-9);
        assert!((dist.high_low_percent("0B-6A") - 25.0).abs() < 1e-9);

        let total: f64 = dist.parity_distribution.values().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn percentages_keep_two_decimals() {
        let draws = [
            [2, 4, 6, 31, 33, 35],
            [1, 3, 5, 30, 32, 34],
            [2, 4, 6, 8, 10, 12],
        ];
        let dist = compute_distributions(&draws, 2.0, 5);
        assert_eq!(dist.parity_percent("3P-3I"), 66.67);
        assert_eq!(dist.parity_percent("6P-0I"), 33.33);

        // 2501 of 25000 is 10.004%, stored as 10.00 so it is not above 10
        let counts = HashMap::from([("a".to_string(), 2501), ("b".to_string(), 22499)]);
        let pct = to_percentages(counts, 25_000);
        assert_eq!(pct["a"], 10.0);
        assert_eq!(pct["b"], 90.0);
    }

    #[test]
    fn keys_always_split_six() {
        let draws = [
            [2, 4, 6, 31, 33, 35],
            [1, 13, 25, 37, 49, 56],
            [10, 20, 30, 40, 50, 55],
        ];
        let dist = compute_distributions(&draws, 2.0, 5);
        for key in dist.parity_distribution.keys() {
            let (x, y) = key.trim_end_matches('I').split_once("P-").unwrap();
            assert_eq!(x.parse::<usize>().unwrap() + y.parse::<usize>().unwrap(), 6);
        }
        for key in dist.high_low_distribution.keys() {
            let (x, y) = key.trim_end_matches('A').split_once("B-").unwrap();
            assert_eq!(x.parse::<usize>().unwrap() + y.parse::<usize>().unwrap(), 6);
        }
    }

    #[test]
    fn decade_patterns_keep_most_frequent() {
        let draws = [
            [1, 2, 11, 12, 21, 22],
            [3, 4, 13, 14, 23, 24],
            [1, 10, 20, 30, 40, 50],
            [5, 6, 7, 8, 9, 55],
        ];
        let dist = compute_distributions(&draws, 2.0, 2);
        assert_eq!(dist.common_decade_patterns.len(), 2);
        assert_eq!(dist.common_decade_patterns[0], "2-2-2-0-0-0");
        // tie between the two single signatures resolves by signature order
        assert_eq!(dist.common_decade_patterns[1], "1-1-1-1-1-1");
        assert!(dist.is_common_decade_pattern("2-2-2-0-0-0"));
        assert!(!dist.is_common_decade_pattern("5-0-0-0-0-1"));
    }

    #[test]
    fn gap_range_is_mean_plus_minus_margin() {
        // gaps: 1,1,1,1,1 → 1.0 and 10,10,10,10,10 → 10.0
        let draws = [[1, 2, 3, 4, 5, 6], [1, 11, 21, 31, 41, 51]];
        let dist = compute_distributions(&draws, 2.0, 5);
        assert!((dist.gap_stats.mean_gap - 5.5).abs() < 1e-9);
        assert_eq!(dist.gap_stats.ideal_range, IdealRange::new(3.5, 7.5));
    }

    #[test]
    fn empty_history_is_zeroed() {
        let dist = compute_distributions(&[], 2.0, 5);
        assert_eq!(dist.sum_stats.mean, 0.0);
        assert_eq!(dist.sum_stats.stddev, 0.0);
        assert!(dist.parity_distribution.is_empty());
        assert!(dist.common_decade_patterns.is_empty());
        assert_eq!(dist.sample_size, 0);
    }

    #[test]
    fn ideal_range_helpers() {
        let range = IdealRange::new(140.0, 200.0);
        assert!(range.contains(140.0));
        assert!(range.contains(200.0));
        assert!(!range.contains(21.0));
        assert_eq!(range.widened(10.0), IdealRange::new(130.0, 210.0));
    }
}
