// Count tables: per-number frequency, pair/trio co-occurrence and repeated
// whole combinations.

use crate::draw::{all_numbers, is_valid_number, MAX_NUMBER, NUMBERS_PER_DRAW};
use serde::Serialize;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// FrequencyTable
// ---------------------------------------------------------------------------

/// Occurrence count per number over a set of draws. Index 0 is unused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    counts: Vec<u32>,
}

impl Default for FrequencyTable {
    fn default() -> Self {
        FrequencyTable {
            counts: vec![0; MAX_NUMBER as usize + 1],
        }
    }
}

impl FrequencyTable {
    /// Count every number of every given draw.
    pub fn from_draws<'a, I>(draws: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8; NUMBERS_PER_DRAW]>,
    {
        let mut table = FrequencyTable::default();
        for draw in draws {
            for &n in draw {
                table.record(n);
            }
        }
        table
    }

    fn record(&mut self, n: u8) {
        if is_valid_number(n) {
            self.counts[n as usize] += 1;
        }
    }

    /// Count for `n`; zero for numbers outside 1..=56.
    pub fn get(&self, n: u8) -> u32 {
        if is_valid_number(n) {
            self.counts[n as usize]
        } else {
            0
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// `(number, count)` pairs in number order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        all_numbers().map(move |n| (n, self.counts[n as usize]))
    }

    /// Numbers ordered by count descending, ties by number ascending.
    pub fn ranked(&self) -> Vec<(u8, u32)> {
        let mut ranked: Vec<(u8, u32)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

// ---------------------------------------------------------------------------
// Co-occurrence tables
// ---------------------------------------------------------------------------

/// A group of numbers (sorted ascending) with how many draws contained all
/// of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount<const N: usize> {
    #[serde(serialize_with = "serialize_group")]
    pub numbers: [u8; N],
    pub count: u32,
}

fn serialize_group<S, const N: usize>(numbers: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(numbers.iter())
}

/// Unordered co-occurrence counts for groups of `N` numbers.
#[derive(Debug, Clone, Serialize)]
pub struct CooccurrenceTable<const N: usize> {
    /// Sorted by count descending, ties by numbers ascending.
    entries: Vec<GroupCount<N>>,
    #[serde(skip)]
    index: HashMap<[u8; N], u32>,
}

pub type PairTable = CooccurrenceTable<2>;
pub type TrioTable = CooccurrenceTable<3>;

impl<const N: usize> CooccurrenceTable<N> {
    fn from_counts(index: HashMap<[u8; N], u32>) -> Self {
        let mut entries: Vec<GroupCount<N>> = index
            .iter()
            .map(|(numbers, &count)| GroupCount {
                numbers: *numbers,
                count,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.numbers.cmp(&b.numbers)));
        CooccurrenceTable { entries, index }
    }

    /// Count for a group given in any order.
    pub fn get(&self, numbers: [u8; N]) -> u32 {
        let mut key = numbers;
        key.sort_unstable();
        self.index.get(&key).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> &[GroupCount<N>] {
        &self.entries
    }

    pub fn top(&self, limit: usize) -> &[GroupCount<N>] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// Most frequent groups that include `n`, in table order.
    pub fn containing(&self, n: u8, limit: usize) -> Vec<&GroupCount<N>> {
        self.entries
            .iter()
            .filter(|group| group.numbers.contains(&n))
            .take(limit)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build pair and trio tables from sorted draws.
pub fn build_cooccurrence<'a, I>(draws: I) -> (PairTable, TrioTable)
where
    I: IntoIterator<Item = &'a [u8; NUMBERS_PER_DRAW]>,
{
    let mut pairs: HashMap<[u8; 2], u32> = HashMap::new();
    let mut trios: HashMap<[u8; 3], u32> = HashMap::new();

    for sorted in draws {
        for i in 0..sorted.len() {
            for j in (i + 1)..sorted.len() {
                *pairs.entry([sorted[i], sorted[j]]).or_insert(0) += 1;
                for k in (j + 1)..sorted.len() {
                    *trios.entry([sorted[i], sorted[j], sorted[k]]).or_insert(0) += 1;
                }
            }
        }
    }

    (
        CooccurrenceTable::from_counts(pairs),
        CooccurrenceTable::from_counts(trios),
    )
}

// ---------------------------------------------------------------------------
// Repeated combinations
// ---------------------------------------------------------------------------

/// How many draws produced exactly the same sorted main combination,
/// sorted by count descending.
pub fn repeated_combinations<'a, I>(draws: I) -> Vec<GroupCount<NUMBERS_PER_DRAW>>
where
    I: IntoIterator<Item = &'a [u8; NUMBERS_PER_DRAW]>,
{
    let mut counts: HashMap<[u8; NUMBERS_PER_DRAW], u32> = HashMap::new();
    for sorted in draws {
        *counts.entry(*sorted).or_insert(0) += 1;
    }
    let mut entries: Vec<GroupCount<NUMBERS_PER_DRAW>> = counts
        .into_iter()
        .map(|(numbers, count)| GroupCount { numbers, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.numbers.cmp(&b.numbers)));
    entries
}
