// Draw records and the number-space helpers shared by every stage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

// ---------------------------------------------------------------------------
// Number space
// ---------------------------------------------------------------------------

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 56;
pub const NUMBERS_PER_DRAW: usize = 6;

/// Numbers at or below this value count as "low" (B) in the high/low split.
pub const LOW_HIGH_SPLIT: u8 = 28;

/// Decade buckets: 1-9, 10-19, 20-29, 30-39, 40-49, 50-56.
pub const DECADE_COUNT: usize = 6;

pub fn is_valid_number(n: u8) -> bool {
    (MIN_NUMBER..=MAX_NUMBER).contains(&n)
}

/// Iterate every playable number in ascending order.
pub fn all_numbers() -> RangeInclusive<u8> {
    MIN_NUMBER..=MAX_NUMBER
}

/// Decade bucket index (0..6) for a valid number.
pub fn decade_of(n: u8) -> usize {
    ((n / 10) as usize).min(DECADE_COUNT - 1)
}

/// The numbers belonging to a decade bucket, or `None` past the last bucket.
pub fn decade_numbers(decade: usize) -> Option<RangeInclusive<u8>> {
    if decade >= DECADE_COUNT {
        return None;
    }
    let start = (decade as u8 * 10).max(MIN_NUMBER);
    let end = (decade as u8 * 10 + 9).min(MAX_NUMBER);
    Some(start..=end)
}

/// Human label for a decade bucket, e.g. "10-19".
pub fn decade_label(decade: usize) -> String {
    match decade_numbers(decade) {
        Some(range) => format!("{}-{}", range.start(), range.end()),
        None => format!("decade {decade}"),
    }
}

// ---------------------------------------------------------------------------
// Game kinds
// ---------------------------------------------------------------------------

/// Which parallel game a raw row belongs to. All three share a draw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameKind {
    Main,
    Secondary,
    Tertiary,
}

impl GameKind {
    /// Parse a draw-type tag. An empty tag means the main game.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_uppercase().as_str() {
            "" | "MAIN" | "MELATE" => Some(GameKind::Main),
            "SECONDARY" | "REVANCHA" => Some(GameKind::Secondary),
            "TERTIARY" | "REVANCHITA" => Some(GameKind::Tertiary),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameKind::Main => "Main",
            GameKind::Secondary => "Secondary",
            GameKind::Tertiary => "Tertiary",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// DrawRecord
// ---------------------------------------------------------------------------

/// One published draw event, possibly merged from several rows.
///
/// `main_numbers` holds the numbers as published; a record with fewer than
/// six valid main numbers stays in the history for lookup but is skipped by
/// every distributional tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub draw_id: String,
    pub date: Option<NaiveDate>,
    pub main_numbers: Vec<u8>,
    pub bonus_number: Option<u8>,
    pub secondary_numbers: Option<Vec<u8>>,
    pub tertiary_numbers: Option<Vec<u8>>,
}

impl DrawRecord {
    /// True when the main game carries exactly six distinct valid numbers.
    pub fn is_complete(&self) -> bool {
        self.sorted_main().is_some()
    }

    /// The main numbers sorted ascending, if the main set is complete.
    pub fn sorted_main(&self) -> Option<[u8; NUMBERS_PER_DRAW]> {
        let numbers: [u8; NUMBERS_PER_DRAW] = self.main_numbers.as_slice().try_into().ok()?;
        let mut sorted = numbers;
        sorted.sort_unstable();
        let distinct = sorted.windows(2).all(|w| w[0] != w[1]);
        if distinct && sorted.iter().all(|&n| is_valid_number(n)) {
            Some(sorted)
        } else {
            None
        }
    }

    /// Numbers for one of the parallel games.
    pub fn numbers_for(&self, kind: GameKind) -> Option<&[u8]> {
        match kind {
            GameKind::Main => Some(self.main_numbers.as_slice()),
            GameKind::Secondary => self.secondary_numbers.as_deref(),
            GameKind::Tertiary => self.tertiary_numbers.as_deref(),
        }
    }

    /// Whether `n` appears in any of the game sets (the bonus is not counted).
    pub fn contains_anywhere(&self, n: u8) -> bool {
        [GameKind::Main, GameKind::Secondary, GameKind::Tertiary]
            .iter()
            .filter_map(|kind| self.numbers_for(*kind))
            .any(|set| set.contains(&n))
    }
}

// ---------------------------------------------------------------------------
// Shape helpers used by stats, analyzer and generator alike
// ---------------------------------------------------------------------------

pub fn even_count(numbers: &[u8]) -> usize {
    numbers.iter().filter(|&&n| n % 2 == 0).count()
}

pub fn low_count(numbers: &[u8]) -> usize {
    numbers.iter().filter(|&&n| n <= LOW_HIGH_SPLIT).count()
}

/// Parity key in the "xP-yI" form (x even, y odd).
pub fn parity_key(numbers: &[u8]) -> String {
    let even = even_count(numbers);
    format!("{}P-{}I", even, numbers.len() - even)
}

/// High/low key in the "xB-yA" form (x low, y high).
pub fn high_low_key(numbers: &[u8]) -> String {
    let low = low_count(numbers);
    format!("{}B-{}A", low, numbers.len() - low)
}

/// Per-decade occupancy counts.
pub fn decade_occupancy(numbers: &[u8]) -> [usize; DECADE_COUNT] {
    let mut counts = [0usize; DECADE_COUNT];
    for &n in numbers {
        counts[decade_of(n)] += 1;
    }
    counts
}

/// Decade signature such as "2-1-0-2-1-0".
pub fn decade_signature(numbers: &[u8]) -> String {
    decade_occupancy(numbers)
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Number of distinct decades touched by the numbers.
pub fn distinct_decades(numbers: &[u8]) -> usize {
    decade_occupancy(numbers).iter().filter(|&&c| c > 0).count()
}

/// Average difference between consecutive numbers once sorted.
///
/// Returns 0.0 for fewer than two numbers.
pub fn average_gap(numbers: &[u8]) -> f64 {
    if numbers.len() < 2 {
        return 0.0;
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    let total: u32 = sorted.windows(2).map(|w| (w[1] - w[0]) as u32).sum();
    total as f64 / (sorted.len() - 1) as f64
}

pub fn number_sum(numbers: &[u8]) -> u32 {
    numbers.iter().map(|&n| n as u32).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(main: Vec<u8>) -> DrawRecord {
        DrawRecord {
            draw_id: "1".into(),
            date: None,
            main_numbers: main,
            bonus_number: None,
            secondary_numbers: None,
            tertiary_numbers: None,
        }
    }

    #[test]
    fn decade_buckets_cover_the_number_space() {
        assert_eq!(decade_of(1), 0);
        assert_eq!(decade_of(9), 0);
        assert_eq!(decade_of(10), 1);
        assert_eq!(decade_of(49), 4);
        assert_eq!(decade_of(50), 5);
        assert_eq!(decade_of(56), 5);

        let total: usize = (0..DECADE_COUNT)
            .filter_map(decade_numbers)
            .map(|range| range.count())
            .sum();
        assert_eq!(total, MAX_NUMBER as usize);
        assert_eq!(decade_label(0), "1-9");
        assert_eq!(decade_label(5), "50-56");
        assert!(decade_numbers(6).is_none());
    }

    #[test]
    fn game_kind_tags() {
        assert_eq!(GameKind::from_tag(""), Some(GameKind::Main));
        assert_eq!(GameKind::from_tag("melate"), Some(GameKind::Main));
        assert_eq!(GameKind::from_tag(" Revancha "), Some(GameKind::Secondary));
        assert_eq!(GameKind::from_tag("REVANCHITA"), Some(GameKind::Tertiary));
        assert_eq!(GameKind::from_tag("tertiary"), Some(GameKind::Tertiary));
        assert_eq!(GameKind::from_tag("chispazo"), None);
    }

    #[test]
    fn completeness_requires_six_distinct_numbers() {
        assert!(record(vec![6, 5, 4, 3, 2, 1]).is_complete());
        assert_eq!(
            record(vec![6, 5, 4, 3, 2, 1]).sorted_main(),
            Some([1, 2, 3, 4, 5, 6])
        );
        assert!(!record(vec![1, 2, 3, 4, 5]).is_complete());
        assert!(!record(vec![1, 1, 3, 4, 5, 6]).is_complete());
        assert!(!record(vec![1, 2, 3, 4, 5, 57]).is_complete());
    }

    #[test]
    fn shape_keys() {
        let combo = [2, 4, 6, 31, 33, 35];
        assert_eq!(parity_key(&combo), "3P-3I");
        assert_eq!(high_low_key(&combo), "3B-3A");
        assert_eq!(decade_signature(&combo), "3-0-0-3-0-0");
        assert_eq!(distinct_decades(&combo), 2);
        assert_eq!(number_sum(&combo), 111);
        assert!((average_gap(&combo) - 33.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn average_gap_ignores_input_order() {
        assert!((average_gap(&[50, 1, 11]) - 24.5).abs() < 1e-9);
        assert_eq!(average_gap(&[7]), 0.0);
    }

    #[test]
    fn contains_anywhere_checks_parallel_games() {
        let mut r = record(vec![1, 2, 3, 4, 5, 6]);
        r.secondary_numbers = Some(vec![10, 11, 12, 13, 14, 15]);
        r.bonus_number = Some(40);
        assert!(r.contains_anywhere(12));
        assert!(r.contains_anywhere(1));
        assert!(!r.contains_anywhere(40));
    }
}
