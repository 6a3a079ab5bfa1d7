// Draw history loading and normalization.
//
// Reads draw-result CSVs (CONCURSO, FECHA, R1..R6, R7, TIPO) and merges the
// rows of one draw event (main game plus its parallel games) into a single
// DrawRecord. Bad cells only cost their own slot; bad rows are skipped.

use crate::draw::{is_valid_number, DrawRecord, GameKind, NUMBERS_PER_DRAW};
use chrono::NaiveDate;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} has no {column} column")]
    MissingColumn { path: String, column: &'static str },

    #[error("no valid main-game draws found ({rows} rows read)")]
    NoValidDraws { rows: usize },
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// One raw result row. Every cell is optional text so a single bad value
/// never rejects the whole row. Extra columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDrawRow {
    #[serde(rename = "CONCURSO", alias = "draw_id", alias = "concurso", default)]
    pub draw_id: Option<String>,
    #[serde(rename = "FECHA", alias = "date", alias = "fecha", default)]
    pub date: Option<String>,
    #[serde(rename = "R1", default)]
    pub r1: Option<String>,
    #[serde(rename = "R2", default)]
    pub r2: Option<String>,
    #[serde(rename = "R3", default)]
    pub r3: Option<String>,
    #[serde(rename = "R4", default)]
    pub r4: Option<String>,
    #[serde(rename = "R5", default)]
    pub r5: Option<String>,
    #[serde(rename = "R6", default)]
    pub r6: Option<String>,
    /// Bonus ("adicional") number; only meaningful on main-game rows.
    #[serde(rename = "R7", alias = "bonus", default)]
    pub bonus: Option<String>,
    #[serde(rename = "TIPO", alias = "type", alias = "tipo", default)]
    pub draw_type: Option<String>,
}

impl RawDrawRow {
    fn number_cells(&self) -> [&Option<String>; NUMBERS_PER_DRAW] {
        [&self.r1, &self.r2, &self.r3, &self.r4, &self.r5, &self.r6]
    }
}

// ---------------------------------------------------------------------------
// Cell parsing helpers
// ---------------------------------------------------------------------------

/// Parse a number cell, accepting "7", " 07 " and "7.0". Out-of-range or
/// non-numeric values yield `None`.
fn parse_number(cell: &Option<String>) -> Option<u8> {
    let text = cell.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    let value = match text.parse::<u32>() {
        Ok(v) => v,
        Err(_) => {
            let f = text.parse::<f64>().ok()?;
            if !f.is_finite() || f.fract() != 0.0 || f < 0.0 {
                return None;
            }
            f as u32
        }
    };
    u8::try_from(value).ok().filter(|&n| is_valid_number(n))
}

/// Parse the up-to-six numbers of a row, dropping invalid cells and repeats.
fn parse_numbers(row: &RawDrawRow) -> Vec<u8> {
    let mut numbers = Vec::with_capacity(NUMBERS_PER_DRAW);
    for cell in row.number_cells() {
        match parse_number(cell) {
            Some(n) if numbers.contains(&n) => {
                debug!("dropping repeated number {} in draw {:?}", n, row.draw_id);
            }
            Some(n) => numbers.push(n),
            None => {
                if cell.as_deref().is_some_and(|c| !c.trim().is_empty()) {
                    debug!("dropping invalid cell {:?} in draw {:?}", cell, row.draw_id);
                }
            }
        }
    }
    numbers
}

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// Parse a draw date in any of the supported formats.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Most-recent-first ordering: numeric ids compare numerically, anything
/// else falls back to string order.
fn compare_ids_desc(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => y.cmp(&x),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    }
}

// ---------------------------------------------------------------------------
// Row merging
// ---------------------------------------------------------------------------

/// Turn raw rows into deduplicated draw records, most recent first.
///
/// Rows sharing a draw id are merged: the type tag routes each row's numbers
/// into the main, secondary or tertiary slot. The first row seen for a slot
/// wins. Fails when no record ends up with a complete main game.
pub fn build_history<I>(rows: I) -> Result<Vec<DrawRecord>, IngestError>
where
    I: IntoIterator<Item = RawDrawRow>,
{
    let mut by_id: HashMap<String, DrawRecord> = HashMap::new();
    let mut row_count = 0usize;

    for row in rows {
        row_count += 1;

        let Some(draw_id) = row
            .draw_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
        else {
            debug!("discarding row {} without a draw id", row_count);
            continue;
        };

        let tag = row.draw_type.as_deref().unwrap_or("");
        let Some(kind) = GameKind::from_tag(tag) else {
            warn!("skipping draw {}: unknown draw type '{}'", draw_id, tag.trim());
            continue;
        };

        let numbers = parse_numbers(&row);
        let record = by_id.entry(draw_id.clone()).or_insert_with(|| DrawRecord {
            draw_id: draw_id.clone(),
            date: None,
            main_numbers: Vec::new(),
            bonus_number: None,
            secondary_numbers: None,
            tertiary_numbers: None,
        });

        if record.date.is_none() {
            if let Some(text) = row.date.as_deref().filter(|d| !d.trim().is_empty()) {
                record.date = parse_date(text);
                if record.date.is_none() {
                    warn!("draw {}: unparseable date '{}'", draw_id, text.trim());
                }
            }
        }

        match kind {
            GameKind::Main => {
                if !record.main_numbers.is_empty() {
                    debug!("draw {}: duplicate main row ignored", draw_id);
                    continue;
                }
                if numbers.len() < NUMBERS_PER_DRAW {
                    warn!(
                        "draw {}: only {} valid main numbers, kept as partial draw",
                        draw_id,
                        numbers.len()
                    );
                }
                record.main_numbers = numbers;
                record.bonus_number = parse_number(&row.bonus);
            }
            GameKind::Secondary => {
                if record.secondary_numbers.is_none() {
                    record.secondary_numbers = Some(numbers);
                }
            }
            GameKind::Tertiary => {
                if record.tertiary_numbers.is_none() {
                    record.tertiary_numbers = Some(numbers);
                }
            }
        }
    }

    let mut history: Vec<DrawRecord> = by_id.into_values().collect();
    history.sort_by(|a, b| compare_ids_desc(&a.draw_id, &b.draw_id));

    let complete = history.iter().filter(|d| d.is_complete()).count();
    if complete == 0 {
        return Err(IngestError::NoValidDraws { rows: row_count });
    }

    info!(
        "ingested {} draws ({} complete) from {} rows",
        history.len(),
        complete,
        row_count
    );
    Ok(history)
}

// ---------------------------------------------------------------------------
// Reader- and path-based loaders
// ---------------------------------------------------------------------------

/// Header names accepted for the draw id column.
const DRAW_ID_HEADERS: &[&str] = &["CONCURSO", "draw_id", "concurso"];

/// Read every row. A broken header, a missing draw id column or an I/O
/// failure aborts the load; rows that fail to deserialize are skipped.
fn read_rows<R: Read>(rdr: R, source: &str) -> Result<Vec<RawDrawRow>, IngestError> {
    let csv_error = |e: csv::Error| IngestError::Csv {
        path: source.to_string(),
        source: e,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);

    let headers = reader.headers().map_err(csv_error)?;
    if !headers.iter().any(|h| DRAW_ID_HEADERS.contains(&h)) {
        return Err(IngestError::MissingColumn {
            path: source.to_string(),
            column: DRAW_ID_HEADERS[0],
        });
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawDrawRow>() {
        match result {
            Ok(raw) => rows.push(raw),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(csv_error(e)),
            Err(e) => {
                warn!("skipping malformed draw row: {}", e);
            }
        }
    }
    Ok(rows)
}

/// Load draw history from any CSV reader.
pub fn load_history_from_reader<R: Read>(rdr: R, source: &str) -> Result<Vec<DrawRecord>, IngestError> {
    let rows = read_rows(rdr, source)?;
    build_history(rows)
}

/// Load draw history from a CSV file.
pub fn load_history(path: &Path) -> Result<Vec<DrawRecord>, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_history_from_reader(file, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
