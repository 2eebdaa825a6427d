// src/calendar.rs
//
// The operation calendar: which dates the cafe is open, and over what
// period. Pure functions of (static config, custom slot overrides): the
// override set both adds dates (admin opened a new day) and removes them
// (empty tombstone).

use crate::config::{OperatingDate, OperationPeriod, ScheduleConfig};
use crate::dates;
use crate::slots::SlotOverrides;
use std::collections::BTreeSet;

/// All operating dates, ascending. Custom dates with slots join the
/// static list; tombstoned dates leave it even when the static config
/// still names them.
pub fn operating_dates(config: &ScheduleConfig, overrides: &SlotOverrides) -> Vec<String> {
    let mut dates: BTreeSet<String> = config
        .operation_dates
        .iter()
        .map(|d| d.date.clone())
        .collect();
    for (date, slots) in overrides {
        if slots.is_empty() {
            dates.remove(date);
        } else {
            dates.insert(date.clone());
        }
    }
    dates.into_iter().collect()
}

/// Inclusive period bounds: the static period, widened by any custom
/// date with slots that falls outside it. Tombstones never widen.
pub fn operating_period(config: &ScheduleConfig, overrides: &SlotOverrides) -> OperationPeriod {
    let mut start = config.operation_period.start.clone();
    let mut end = config.operation_period.end.clone();
    for (date, slots) in overrides {
        if slots.is_empty() {
            continue;
        }
        if *date < start {
            start = date.clone();
        }
        if *date > end {
            end = date.clone();
        }
    }
    OperationPeriod { start, end }
}

pub fn is_operating_date(config: &ScheduleConfig, overrides: &SlotOverrides, date: &str) -> bool {
    if let Some(slots) = overrides.get(date) {
        return !slots.is_empty();
    }
    config.operation_dates.iter().any(|d| d.date == date)
}

/// Operating-day info for a date: the static entry, else an entry
/// synthesized for a custom-opened date.
pub fn operation_date(
    config: &ScheduleConfig,
    overrides: &SlotOverrides,
    date: &str,
) -> Option<OperatingDate> {
    if let Some(slots) = overrides.get(date) {
        if slots.is_empty() {
            return None;
        }
    }
    if let Some(found) = config.operation_dates.iter().find(|d| d.date == date) {
        return Some(found.clone());
    }
    let has_custom = overrides.get(date).map(|s| !s.is_empty()).unwrap_or(false);
    if !has_custom {
        return None;
    }
    let parsed = dates::parse_date(date)?;
    Some(OperatingDate {
        date: date.to_string(),
        weekday: chrono::Datelike::weekday(&parsed).num_days_from_sunday() as u8,
        has_morning: true,
        has_afternoon: true,
    })
}
