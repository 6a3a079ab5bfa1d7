// Constrained generator: bounded rejection sampling from the weighted pool.
//
// Each attempt starts from the included numbers and draws the rest without
// replacement, with each eligible number chosen in proportion to its pool
// weight. Six-number candidates must pass every active criterion; larger
// tickets are accepted as soon as they are complete.

use crate::analyzer::{
    analyze, analyze_ticket, AnalysisError, AnalysisResult, RecommendationTally, MAX_TICKET_SIZE,
};
use crate::config::{GeneratorConfig, ScoringConfig};
use crate::draw::{
    all_numbers, average_gap, decade_numbers, distinct_decades, even_count, is_valid_number,
    low_count, number_sum, DECADE_COUNT, MAX_NUMBER, NUMBERS_PER_DRAW,
};
use crate::pool::WeightedPool;
use crate::stats::Distributions;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Distinct-decade count at which a candidate is considered spread out.
const BALANCED_MIN_DECADES: usize = 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid request field `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("not enough eligible numbers: {available} available, {needed} needed")]
    InsufficientPool { available: usize, needed: usize },

    #[error("no combination satisfied every criterion after {attempts} attempts; relax your filters")]
    Exhausted { attempts: u32 },

    #[error("generation cancelled")]
    Cancelled,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("generation worker failed: {0}")]
    Worker(String),
}

fn invalid(field: &str, message: impl Into<String>) -> GenerateError {
    GenerateError::Validation {
        field: field.into(),
        message: message.into(),
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unrecognized {kind} `{value}`")]
pub struct ParseCriterionError {
    kind: &'static str,
    value: String,
}

impl ParseCriterionError {
    fn new(kind: &'static str, value: &str) -> Self {
        ParseCriterionError {
            kind,
            value: value.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Inclusive bounds on the combination sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumRange {
    pub min: u32,
    pub max: u32,
}

impl SumRange {
    pub fn contains(&self, sum: u32) -> bool {
        sum >= self.min && sum <= self.max
    }
}

/// Exact even/odd split, written "xP-yI".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParityPattern {
    pub even: usize,
}

/// Exact low/high split, written "xB-yA".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HighLowPattern {
    pub low: usize,
}

/// Parse "xL-yR" where x + y must be six.
fn parse_split(s: &str, left: char, right: char) -> Option<usize> {
    let (a, b) = s.trim().split_once('-')?;
    let x: usize = a.strip_suffix(left)?.parse().ok()?;
    let y: usize = b.strip_suffix(right)?.parse().ok()?;
    (x + y == NUMBERS_PER_DRAW).then_some(x)
}

impl FromStr for ParityPattern {
    type Err = ParseCriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_split(s, 'P', 'I')
            .map(|even| ParityPattern { even })
            .ok_or_else(|| ParseCriterionError::new("parity pattern", s))
    }
}

impl fmt::Display for ParityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}P-{}I", self.even, NUMBERS_PER_DRAW - self.even)
    }
}

impl TryFrom<String> for ParityPattern {
    type Error = ParseCriterionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ParityPattern> for String {
    fn from(value: ParityPattern) -> Self {
        value.to_string()
    }
}

impl FromStr for HighLowPattern {
    type Err = ParseCriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_split(s, 'B', 'A')
            .map(|low| HighLowPattern { low })
            .ok_or_else(|| ParseCriterionError::new("high/low pattern", s))
    }
}

impl fmt::Display for HighLowPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B-{}A", self.low, NUMBERS_PER_DRAW - self.low)
    }
}

impl TryFrom<String> for HighLowPattern {
    type Error = ParseCriterionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HighLowPattern> for String {
    fn from(value: HighLowPattern) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecadeSpread {
    #[default]
    Any,
    /// At least four distinct decades.
    Balanced,
    /// Fewer than four distinct decades.
    Concentrated,
}

impl FromStr for DecadeSpread {
    type Err = ParseCriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(DecadeSpread::Any),
            "balanced" => Ok(DecadeSpread::Balanced),
            "concentrated" => Ok(DecadeSpread::Concentrated),
            _ => Err(ParseCriterionError::new("decade spread", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapProfile {
    #[default]
    Any,
    /// Average gap within the historical ideal range.
    Ideal,
    /// Average gap at or below the lower bound.
    Clustered,
    /// Average gap at or above the upper bound.
    Spread,
}

impl FromStr for GapProfile {
    type Err = ParseCriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(GapProfile::Any),
            "ideal" => Ok(GapProfile::Ideal),
            "clustered" => Ok(GapProfile::Clustered),
            "spread" => Ok(GapProfile::Spread),
            _ => Err(ParseCriterionError::new("gap profile", s)),
        }
    }
}

/// Filters applied to six-number candidates. `None`/`Any` disables one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    pub sum_range: Option<SumRange>,
    pub parity: Option<ParityPattern>,
    pub high_low: Option<HighLowPattern>,
    pub decade_spread: DecadeSpread,
    pub gap_profile: GapProfile,
}

impl Criteria {
    /// Whether a sorted six-number candidate passes every active filter.
    pub fn accepts(&self, candidate: &[u8], distributions: &Distributions) -> bool {
        if let Some(range) = self.sum_range {
            if !range.contains(number_sum(candidate)) {
                return false;
            }
        }
        if let Some(parity) = self.parity {
            if even_count(candidate) != parity.even {
                return false;
            }
        }
        if let Some(high_low) = self.high_low {
            if low_count(candidate) != high_low.low {
                return false;
            }
        }

        let decades = distinct_decades(candidate);
        let decade_ok = match self.decade_spread {
            DecadeSpread::Any => true,
            DecadeSpread::Balanced => decades >= BALANCED_MIN_DECADES,
            DecadeSpread::Concentrated => decades < BALANCED_MIN_DECADES,
        };
        if !decade_ok {
            return false;
        }

        let range = distributions.gap_stats.ideal_range;
        let gap = average_gap(candidate);
        match self.gap_profile {
            GapProfile::Any => true,
            GapProfile::Ideal => range.contains(gap),
            GapProfile::Clustered => gap <= range.low,
            GapProfile::Spread => gap >= range.high,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub target_size: usize,
    #[serde(default)]
    pub included: Vec<u8>,
    #[serde(default)]
    pub excluded: Vec<u8>,
    /// Decade bucket indices (0 = 1-9 ... 5 = 50-56) whose numbers are excluded.
    #[serde(default)]
    pub excluded_decades: Vec<usize>,
    #[serde(default)]
    pub criteria: Criteria,
}

impl GenerationRequest {
    pub fn new(target_size: usize) -> Self {
        GenerationRequest {
            target_size,
            included: Vec::new(),
            excluded: Vec::new(),
            excluded_decades: Vec::new(),
            criteria: Criteria::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum TicketReport {
    Single(AnalysisResult),
    Multiple(RecommendationTally),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutcome {
    /// Sorted ascending.
    pub numbers: Vec<u8>,
    pub attempts: u32,
    pub report: TicketReport,
}

/// Read-only inputs a generation call samples and scores against.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub pool: &'a WeightedPool,
    pub distributions: &'a Distributions,
    pub generator: &'a GeneratorConfig,
    pub scoring: &'a ScoringConfig,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A validated request: deduplicated included set and the full excluded set.
#[derive(Debug)]
struct Plan {
    target_size: usize,
    included: Vec<u8>,
    excluded: BTreeSet<u8>,
}

fn check_numbers(field: &str, numbers: &[u8]) -> Result<(), GenerateError> {
    match numbers.iter().find(|&&n| !is_valid_number(n)) {
        Some(bad) => Err(invalid(field, format!("{bad} is outside 1-{MAX_NUMBER}"))),
        None => Ok(()),
    }
}

fn plan(request: &GenerationRequest) -> Result<Plan, GenerateError> {
    if !(NUMBERS_PER_DRAW..=MAX_TICKET_SIZE).contains(&request.target_size) {
        return Err(invalid(
            "target_size",
            format!(
                "must be between {NUMBERS_PER_DRAW} and {MAX_TICKET_SIZE}, got {}",
                request.target_size
            ),
        ));
    }
    check_numbers("included", &request.included)?;
    check_numbers("excluded", &request.excluded)?;

    let mut excluded: BTreeSet<u8> = request.excluded.iter().copied().collect();
    for &decade in &request.excluded_decades {
        let Some(range) = decade_numbers(decade) else {
            return Err(invalid(
                "excluded_decades",
                format!("decade index {decade} is outside 0-{}", DECADE_COUNT - 1),
            ));
        };
        excluded.extend(range);
    }

    let included: BTreeSet<u8> = request.included.iter().copied().collect();
    if let Some(conflict) = included.intersection(&excluded).next() {
        return Err(invalid(
            "included",
            format!("{conflict} is both included and excluded"),
        ));
    }
    if included.len() > request.target_size {
        return Err(invalid(
            "included",
            format!(
                "at most {} numbers can be included, got {}",
                request.target_size,
                included.len()
            ),
        ));
    }

    let criteria = &request.criteria;
    if let Some(range) = criteria.sum_range {
        if range.min > range.max {
            return Err(invalid("criteria.sum_range", "min must not exceed max"));
        }
    }
    if criteria.parity.is_some_and(|p| p.even > NUMBERS_PER_DRAW) {
        return Err(invalid("criteria.parity", "even count exceeds six"));
    }
    if criteria.high_low.is_some_and(|p| p.low > NUMBERS_PER_DRAW) {
        return Err(invalid("criteria.high_low", "low count exceeds six"));
    }

    Ok(Plan {
        target_size: request.target_size,
        included: included.into_iter().collect(),
        excluded,
    })
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Fill `candidate` up to `target_size` without replacement. Each drawn
/// number has its weight zeroed so it cannot come up again.
fn draw_without_replacement<R: Rng + ?Sized>(
    base: &WeightedIndex<u32>,
    candidate: &mut Vec<u8>,
    target_size: usize,
    rng: &mut R,
) -> Result<(), GenerateError> {
    let mut dist = base.clone();
    let start = candidate.len();
    while candidate.len() < target_size {
        let index = dist.sample(rng);
        let number = u8::try_from(index).map_err(|_| GenerateError::InsufficientPool {
            available: candidate.len() - start,
            needed: target_size - start,
        })?;
        candidate.push(number);
        if candidate.len() < target_size && dist.update_weights(&[(index, &0)]).is_err() {
            // every remaining weight is zero
            return Err(GenerateError::InsufficientPool {
                available: candidate.len() - start,
                needed: target_size - start,
            });
        }
    }
    Ok(())
}

/// Run bounded rejection sampling for `request`.
///
/// `cancel` is polled every `cancel_check_interval` attempts.
pub fn generate<R: Rng + ?Sized>(
    request: &GenerationRequest,
    ctx: GeneratorContext<'_>,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Result<GenerationOutcome, GenerateError> {
    let plan = plan(request)?;

    let mut eligible = vec![0u32; MAX_NUMBER as usize + 1];
    for n in all_numbers() {
        if !plan.excluded.contains(&n) && plan.included.binary_search(&n).is_err() {
            eligible[n as usize] = ctx.pool.weight(n);
        }
    }
    let available = eligible.iter().filter(|&&w| w > 0).count();
    let needed = plan.target_size - plan.included.len();
    if available < needed {
        return Err(GenerateError::InsufficientPool { available, needed });
    }
    let base = if needed > 0 {
        Some(
            WeightedIndex::new(&eligible)
                .map_err(|_| GenerateError::InsufficientPool { available, needed })?,
        )
    } else {
        None
    };

    let max_attempts = ctx.generator.max_attempts;
    let check_every = ctx.generator.cancel_check_interval.max(1);

    for attempt in 0..max_attempts {
        if attempt % check_every == 0 && cancel.load(Ordering::Relaxed) {
            debug!(attempt, "generation cancelled");
            return Err(GenerateError::Cancelled);
        }

        let mut candidate = plan.included.clone();
        if let Some(base) = &base {
            draw_without_replacement(base, &mut candidate, plan.target_size, rng)?;
        }
        candidate.sort_unstable();

        if plan.target_size == NUMBERS_PER_DRAW
            && !request.criteria.accepts(&candidate, ctx.distributions)
        {
            continue;
        }

        let attempts = attempt + 1;
        debug!(attempts, numbers = ?candidate, "candidate accepted");
        let report = if plan.target_size == NUMBERS_PER_DRAW {
            TicketReport::Single(analyze(&candidate, ctx.distributions, ctx.scoring)?)
        } else {
            TicketReport::Multiple(analyze_ticket(&candidate, ctx.distributions, ctx.scoring)?)
        };
        return Ok(GenerationOutcome {
            numbers: candidate,
            attempts,
            report,
        });
    }

    warn!(max_attempts, "generation exhausted its attempt ceiling");
    Err(GenerateError::Exhausted {
        attempts: max_attempts,
    })
}
