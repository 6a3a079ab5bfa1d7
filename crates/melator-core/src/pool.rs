// Weighted number pool. Each number appears in proportion to its historical
// plus boosted recent frequency, never fewer than once.

use crate::draw::{all_numbers, is_valid_number, MAX_NUMBER};
use crate::stats::FrequencyTable;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedPool {
    /// Copies per number; index 0 unused.
    weights: Vec<u32>,
}

impl WeightedPool {
    /// `max(1, round(historical[n] + recent_weight * recent[n]))` copies of n.
    pub fn build(historical: &FrequencyTable, recent: &FrequencyTable, recent_weight: f64) -> Self {
        let mut weights = vec![0u32; MAX_NUMBER as usize + 1];
        for n in all_numbers() {
            let raw = historical.get(n) as f64 + recent_weight * recent.get(n) as f64;
            weights[n as usize] = (raw.round() as u32).max(1);
        }
        WeightedPool { weights }
    }

    pub fn weight(&self, n: u8) -> u32 {
        if is_valid_number(n) {
            self.weights[n as usize]
        } else {
            0
        }
    }

    /// Total number of entries in the multiset.
    pub fn len(&self) -> usize {
        self.weights.iter().map(|&w| w as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(number, copies)` in number order.
    pub fn weights(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        all_numbers().map(move |n| (n, self.weights[n as usize]))
    }

    /// Expand into the flat multiset, numbers ascending.
    pub fn entries(&self) -> Vec<u8> {
        self.weights()
            .flat_map(|(n, w)| std::iter::repeat(n).take(w as usize))
            .collect()
    }
}
