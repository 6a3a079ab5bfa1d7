// Draw explorer: history filtering, pagination and a per-draw shape summary.

use crate::draw::{even_count, low_count, number_sum, DrawRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// All set fields must match; an empty filter matches every draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawFilter {
    /// Substring of the draw id.
    pub draw_id: Option<String>,
    /// Number present in the main, secondary or tertiary set.
    pub number: Option<u8>,
    pub date: Option<NaiveDate>,
}

impl DrawFilter {
    pub fn matches(&self, draw: &DrawRecord) -> bool {
        let id_ok = self
            .draw_id
            .as_deref()
            .map_or(true, |needle| draw.draw_id.contains(needle.trim()));
        let number_ok = self.number.map_or(true, |n| draw.contains_anywhere(n));
        let date_ok = self.date.map_or(true, |d| draw.date == Some(d));
        id_ok && number_ok && date_ok
    }
}

pub fn filter<'a>(history: &'a [DrawRecord], filter: &DrawFilter) -> Vec<&'a DrawRecord> {
    history.iter().filter(|d| filter.matches(d)).collect()
}

/// One page of results. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice `items` into the requested page, clamping the page number into
/// `1..=total_pages`. A page size of zero falls back to the default.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));
    let start = ((page - 1) * page_size).min(total_items);
    let end = (start + page_size).min(total_items);
    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages,
        total_items,
    }
}

/// Quick shape of a draw's main numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrawSummary {
    pub sum: u32,
    pub even: usize,
    pub low: usize,
}

pub fn summarize(draw: &DrawRecord) -> DrawSummary {
    let numbers = &draw.main_numbers;
    DrawSummary {
        sum: number_sum(numbers),
        even: even_count(numbers),
        low: low_count(numbers),
    }
}
