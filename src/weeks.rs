// src/weeks.rs
//
// Week buckets for the one-shift-per-week rule. The static week list is
// extended, never mutated, by the custom-opened dates: building the
// list is a pure function, so repeated calls with the same override set
// produce the same weeks.

use crate::config::ScheduleConfig;
use crate::dates;
use crate::shifts::ShiftSubmission;
use crate::slots::SlotOverrides;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    /// The Monday of the week, `YYYY-MM-DD`.
    pub week_key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyViolation {
    pub week_key: String,
    pub staff_id: String,
    pub staff_name: String,
    pub count: usize,
    pub submissions: Vec<ShiftSubmission>,
}

/// The effective week list: static weeks plus a synthesized week for
/// every custom-opened date not already covered. New weeks get the
/// generated `M/D週` label; date lists and the week list stay sorted.
pub fn weeks(config: &ScheduleConfig, overrides: &SlotOverrides) -> Vec<Week> {
    let mut weeks = config.weeks.clone();

    for (date, slots) in overrides {
        if slots.is_empty() {
            continue;
        }
        if weeks.iter().any(|w| w.dates.iter().any(|d| d == date)) {
            continue;
        }
        let Some(parsed) = dates::parse_date(date) else {
            warn!("skipping custom date with unparseable key: {}", date);
            continue;
        };
        let monday = dates::monday_of(parsed);
        let week_key = dates::format_date(monday);

        let index = match weeks.iter().position(|w| w.week_key == week_key) {
            Some(index) => index,
            None => {
                weeks.push(Week {
                    week_key: week_key.clone(),
                    label: format!("{}/{}週", monday.month(), monday.day()),
                    description: None,
                    dates: Vec::new(),
                });
                weeks.len() - 1
            }
        };
        let week = &mut weeks[index];
        if !week.dates.iter().any(|d| d == date) {
            week.dates.push(date.clone());
            week.dates.sort();
        }
    }

    weeks.sort_by(|a, b| a.week_key.cmp(&b.week_key));
    weeks
}

/// The week key for a date: the containing week's key when one exists,
/// otherwise the Monday of the date's calendar week.
pub fn week_key_for(
    config: &ScheduleConfig,
    overrides: &SlotOverrides,
    date: &str,
) -> Option<String> {
    for week in weeks(config, overrides) {
        if week.dates.iter().any(|d| d == date) {
            return Some(week.week_key);
        }
    }
    let parsed = dates::parse_date(date)?;
    Some(dates::format_date(dates::monday_of(parsed)))
}

pub fn week_info(config: &ScheduleConfig, overrides: &SlotOverrides, week_key: &str) -> Option<Week> {
    weeks(config, overrides)
        .into_iter()
        .find(|w| w.week_key == week_key)
}

/// Groups submissions by (week, staff) and reports every group holding
/// more than the weekly limit of one. The data model permits violations
/// to exist; this only surfaces them.
pub fn detect_violations(
    config: &ScheduleConfig,
    overrides: &SlotOverrides,
    submissions: &[ShiftSubmission],
) -> Vec<WeeklyViolation> {
    let mut grouped: BTreeMap<(String, String), Vec<ShiftSubmission>> = BTreeMap::new();

    for submission in submissions {
        let week_key = if submission.week_key.is_empty() {
            match week_key_for(config, overrides, &submission.date) {
                Some(key) => key,
                None => {
                    warn!(
                        "submission {} has no resolvable week (date {})",
                        submission.id, submission.date
                    );
                    continue;
                }
            }
        } else {
            submission.week_key.clone()
        };
        grouped
            .entry((week_key, submission.staff_id.clone()))
            .or_default()
            .push(submission.clone());
    }

    grouped
        .into_iter()
        .filter(|(_, subs)| subs.len() > 1)
        .map(|((week_key, staff_id), subs)| WeeklyViolation {
            week_key,
            staff_id,
            staff_name: subs[0].staff_name.clone(),
            count: subs.len(),
            submissions: subs,
        })
        .collect()
}
