// Prize checker: compares a six-number play against published draws.

use crate::analyzer::{sorted_distinct, AnalysisError};
use crate::draw::{DrawRecord, GameKind, NUMBERS_PER_DRAW};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Main-game prize tier, first being the jackpot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MainPrize {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Eighth,
    Ninth,
}

impl MainPrize {
    /// Tier for `hits` main matches, plus whether the bonus also matched.
    pub fn from_hits(hits: usize, bonus: bool) -> Option<Self> {
        match (hits, bonus) {
            (6, _) => Some(MainPrize::First),
            (5, true) => Some(MainPrize::Second),
            (5, false) => Some(MainPrize::Third),
            (4, true) => Some(MainPrize::Fourth),
            (4, false) => Some(MainPrize::Fifth),
            (3, true) => Some(MainPrize::Sixth),
            (3, false) => Some(MainPrize::Seventh),
            (2, true) => Some(MainPrize::Eighth),
            (2, false) => Some(MainPrize::Ninth),
            _ => None,
        }
    }

    pub fn place(&self) -> u8 {
        *self as u8 + 1
    }
}

impl fmt::Display for MainPrize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let place = self.place();
        let suffix = match place {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        };
        write!(f, "{place}{suffix} place")
    }
}

/// Matches for one of the parallel games that only pay on six hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideGameResult {
    pub hits: Vec<u8>,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub draw_id: String,
    pub date: Option<NaiveDate>,
    pub main_hits: Vec<u8>,
    /// The bonus number, when the play holds it among its non-matching numbers.
    pub bonus_hit: Option<u8>,
    pub main_prize: Option<MainPrize>,
    pub secondary: Option<SideGameResult>,
    pub tertiary: Option<SideGameResult>,
}

impl CheckResult {
    /// Main hits formatted the usual way, e.g. "4+1".
    pub fn main_display(&self) -> String {
        if self.bonus_hit.is_some() {
            format!("{}+1", self.main_hits.len())
        } else {
            self.main_hits.len().to_string()
        }
    }

    pub fn has_any_hit(&self) -> bool {
        !self.main_hits.is_empty()
            || self.bonus_hit.is_some()
            || self.secondary.as_ref().is_some_and(|s| !s.hits.is_empty())
            || self.tertiary.as_ref().is_some_and(|s| !s.hits.is_empty())
    }

    pub fn is_winner(&self) -> bool {
        self.main_prize.is_some()
            || self.secondary.as_ref().is_some_and(|s| s.won)
            || self.tertiary.as_ref().is_some_and(|s| s.won)
    }
}

fn validate_play(play: &[u8]) -> Result<Vec<u8>, AnalysisError> {
    let sorted = sorted_distinct(play)?;
    if sorted.len() != NUMBERS_PER_DRAW {
        return Err(AnalysisError::InvalidCombination(format!(
            "a play holds {NUMBERS_PER_DRAW} numbers, got {}",
            sorted.len()
        )));
    }
    Ok(sorted)
}

fn check_sorted(play: &[u8], draw: &DrawRecord) -> CheckResult {
    let main = draw.numbers_for(GameKind::Main).unwrap_or_default();
    let main_hits: Vec<u8> = play.iter().copied().filter(|n| main.contains(n)).collect();
    let bonus_hit = draw
        .bonus_number
        .filter(|b| !main_hits.contains(b) && play.contains(b));

    let side = |kind: GameKind| {
        draw.numbers_for(kind).map(|set| {
            let hits: Vec<u8> = play.iter().copied().filter(|n| set.contains(n)).collect();
            let won = hits.len() == NUMBERS_PER_DRAW;
            SideGameResult { hits, won }
        })
    };

    CheckResult {
        draw_id: draw.draw_id.clone(),
        date: draw.date,
        main_prize: MainPrize::from_hits(main_hits.len(), bonus_hit.is_some()),
        main_hits,
        bonus_hit,
        secondary: side(GameKind::Secondary),
        tertiary: side(GameKind::Tertiary),
    }
}

/// Check one play against one draw.
pub fn check_play(play: &[u8], draw: &DrawRecord) -> Result<CheckResult, AnalysisError> {
    let sorted = validate_play(play)?;
    Ok(check_sorted(&sorted, draw))
}

/// Every draw in `history` where the play matched at least one number of any
/// game or the bonus, in history order.
pub fn historical_hits(
    play: &[u8],
    history: &[DrawRecord],
) -> Result<Vec<CheckResult>, AnalysisError> {
    let sorted = validate_play(play)?;
    Ok(history
        .iter()
        .map(|draw| check_sorted(&sorted, draw))
        .filter(CheckResult::has_any_hit)
        .collect())
}
