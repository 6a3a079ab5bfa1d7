// Number temperature: cold-streak buckets and composite-score tiers built on
// top of the predictive index.

use crate::stats::PredictiveEntry;
use serde::Serialize;
use std::fmt;

/// How many numbers make up the top score tier.
pub const TOP_TIER_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StreakBucket {
    OnFire,
    Hot,
    Warm,
    Cold,
    VeryCold,
    Frozen,
}

impl StreakBucket {
    pub const ALL: [StreakBucket; 6] = [
        StreakBucket::OnFire,
        StreakBucket::Hot,
        StreakBucket::Warm,
        StreakBucket::Cold,
        StreakBucket::VeryCold,
        StreakBucket::Frozen,
    ];

    pub fn from_streak(cold_streak: usize) -> Self {
        match cold_streak {
            0 => StreakBucket::OnFire,
            1..=5 => StreakBucket::Hot,
            6..=14 => StreakBucket::Warm,
            15..=29 => StreakBucket::Cold,
            30..=71 => StreakBucket::VeryCold,
            _ => StreakBucket::Frozen,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StreakBucket::OnFire => "On fire (last draw)",
            StreakBucket::Hot => "Hot (1-5 draws ago)",
            StreakBucket::Warm => "Warm (6-14 draws ago)",
            StreakBucket::Cold => "Cold (15-29 draws ago)",
            StreakBucket::VeryCold => "Very cold (30-71 draws ago)",
            StreakBucket::Frozen => "Frozen (72+ draws ago)",
        }
    }
}

impl fmt::Display for StreakBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ScoreTier {
    Top,
    High,
    Medium,
    Low,
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoreTier::Top => "Top",
            ScoreTier::High => "High",
            ScoreTier::Medium => "Medium",
            ScoreTier::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberTemperature {
    pub number: u8,
    pub cold_streak: usize,
    pub bucket: StreakBucket,
    pub composite_score: i64,
    pub tier: ScoreTier,
}

/// Classify every entry, ordered by composite score descending (ties by
/// number ascending).
///
/// The high and medium cut-offs are the scores found at the 30% and 70%
/// positions of that ordering.
pub fn classify(index: &[PredictiveEntry]) -> Vec<NumberTemperature> {
    let mut ranked: Vec<&PredictiveEntry> = index.iter().collect();
    ranked.sort_by(|a, b| {
        b.composite_score
            .cmp(&a.composite_score)
            .then(a.number.cmp(&b.number))
    });

    let cutoff = |fraction: f64| {
        let pos = (ranked.len() as f64 * fraction).floor() as usize;
        ranked.get(pos).map_or(0, |e| e.composite_score)
    };
    let high = cutoff(0.3);
    let medium = cutoff(0.7);

    ranked
        .iter()
        .enumerate()
        .map(|(rank, entry)| {
            let tier = if rank < TOP_TIER_SIZE {
                ScoreTier::Top
            } else if entry.composite_score >= high {
                ScoreTier::High
            } else if entry.composite_score >= medium {
                ScoreTier::Medium
            } else {
                ScoreTier::Low
            };
            NumberTemperature {
                number: entry.number,
                cold_streak: entry.cold_streak,
                bucket: StreakBucket::from_streak(entry.cold_streak),
                composite_score: entry.composite_score,
                tier,
            }
        })
        .collect()
}
