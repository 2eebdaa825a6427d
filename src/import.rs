// src/import.rs
//
// Bulk slot registration rows. File handling lives with the caller; this
// module owns the row shape, the acceptance rule, and a CSV reader for
// the documented template. Validation failures are text for the admin,
// and one bad row blocks the whole batch.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}$").unwrap());

pub const REQUIRED_STAFF_MIN: u32 = 1;
pub const REQUIRED_STAFF_MAX: u32 = 10;

fn default_required_staff() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotImportRow {
    pub date: String,
    #[serde(default)]
    pub label: String,
    pub start: String,
    pub end: String,
    #[serde(default = "default_required_staff")]
    pub required_staff: u32,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("required columns missing: {0}")]
    MissingColumns(String),
}

/// Runs the five acceptance checks on one row. Row numbers in the
/// messages are 1-based positions in the source file.
pub fn validate_row(row: &SlotImportRow, row_num: usize) -> Vec<String> {
    let mut errors = Vec::new();

    if row.date.is_empty() {
        errors.push(format!("row {}: date is missing", row_num));
    } else if !DATE_RE.is_match(&row.date) {
        errors.push(format!(
            "row {}: date must be in YYYY-MM-DD format",
            row_num
        ));
    }

    if row.start.is_empty() {
        errors.push(format!("row {}: start time is missing", row_num));
    } else if !TIME_RE.is_match(&row.start) {
        errors.push(format!(
            "row {}: start time must be in HH:MM format",
            row_num
        ));
    }

    if row.end.is_empty() {
        errors.push(format!("row {}: end time is missing", row_num));
    } else if !TIME_RE.is_match(&row.end) {
        errors.push(format!("row {}: end time must be in HH:MM format", row_num));
    }

    if !row.start.is_empty() && !row.end.is_empty() && row.start >= row.end {
        errors.push(format!(
            "row {}: end time must be after start time",
            row_num
        ));
    }

    if row.required_staff < REQUIRED_STAFF_MIN || row.required_staff > REQUIRED_STAFF_MAX {
        errors.push(format!(
            "row {}: required staff must be between {} and {}",
            row_num, REQUIRED_STAFF_MIN, REQUIRED_STAFF_MAX
        ));
    }

    errors
}

/// All-or-nothing batch check: any invalid row blocks every row.
pub fn validate_batch(rows: &[SlotImportRow]) -> Result<(), Vec<String>> {
    if rows.is_empty() {
        return Err(vec!["no rows to import".to_string()]);
    }
    let errors: Vec<String> = rows
        .iter()
        .enumerate()
        .flat_map(|(i, row)| validate_row(row, i + 2))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Locates a column by any of its accepted header names (the template
/// ships with Japanese headers; English works too).
fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.trim().to_lowercase();
        candidates
            .iter()
            .any(|name| header.contains(&name.to_lowercase()))
    })
}

/// Reads template rows from CSV. Comment lines (`#`) and blank lines are
/// skipped; a missing headcount column falls back to 3 per row.
pub fn read_slot_csv<R: Read>(reader: R) -> Result<Vec<SlotImportRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let date_idx = find_column(&headers, &["日付", "date"]);
    let label_idx = find_column(&headers, &["枠名", "label", "名前"]);
    let start_idx = find_column(&headers, &["開始時刻", "開始", "start", "開始時間"]);
    let end_idx = find_column(&headers, &["終了時刻", "終了", "end", "終了時間"]);
    let staff_idx = find_column(&headers, &["必要人数", "人数", "staff", "必要スタッフ"]);

    let (Some(date_idx), Some(start_idx), Some(end_idx)) = (date_idx, start_idx, end_idx) else {
        return Err(ImportError::MissingColumns(
            "date, start time and end time columns are required".to_string(),
        ));
    };

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let required_staff = field(staff_idx)
            .parse::<u32>()
            .unwrap_or_else(|_| default_required_staff());
        rows.push(SlotImportRow {
            date: field(Some(date_idx)),
            label: field(label_idx),
            start: field(Some(start_idx)),
            end: field(Some(end_idx)),
            required_staff,
        });
    }
    Ok(rows)
}
