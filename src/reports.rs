// src/reports.rs
//
// Read-side aggregation: slot fill counts, roster statistics, weekly
// overviews and the CSV/JSON projections the admin screen exports.

use crate::attendance::{AttendanceRow, ClockRecord, ClockStatus, ClockType};
use crate::calendar;
use crate::config::ScheduleConfig;
use crate::shifts::ShiftSubmission;
use crate::slots::{ShiftSlot, SlotConfigService};
use crate::weeks;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotFill {
    pub slot_id: String,
    pub label: String,
    pub filled: usize,
    pub required: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayFill {
    pub date: String,
    pub slots: Vec<SlotFill>,
    /// Overfilled slots count only up to their requirement.
    pub total_filled: u32,
    pub total_required: u32,
}

/// Fill statistics for one date's resolved slots.
pub fn day_fill(
    date: &str,
    slots: &[ShiftSlot],
    submissions: &[ShiftSubmission],
    resolver: &SlotConfigService,
) -> DayFill {
    let mut fills = Vec::with_capacity(slots.len());
    let mut total_filled = 0u32;
    let mut total_required = 0u32;

    for slot in slots {
        let filled = submissions
            .iter()
            .filter(|s| s.date == date && s.slot_id == slot.id)
            .count();
        let required = slot
            .required_staff
            .unwrap_or_else(|| resolver.resolve_required_staff(&slot.id, date));
        total_required += required;
        total_filled += (filled as u32).min(required);
        fills.push(SlotFill {
            slot_id: slot.id.clone(),
            label: slot.label.clone(),
            filled,
            required,
        });
    }

    DayFill {
        date: date.to_string(),
        slots: fills,
        total_filled,
        total_required,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStats {
    pub total_slots: usize,
    pub filled_slots: usize,
    pub shortage_slots: usize,
}

/// Slot-level fill state across every operating date.
pub fn schedule_stats(
    resolver: &SlotConfigService,
    submissions: &[ShiftSubmission],
) -> ScheduleStats {
    let config = resolver.config();
    let overrides = resolver.custom_overrides();
    let mut stats = ScheduleStats {
        total_slots: 0,
        filled_slots: 0,
        shortage_slots: 0,
    };

    for date in calendar::operating_dates(config, &overrides) {
        for slot in resolver.resolve_slots(&date) {
            stats.total_slots += 1;
            let count = submissions
                .iter()
                .filter(|s| s.date == date && s.slot_id == slot.id)
                .count();
            let required = slot
                .required_staff
                .unwrap_or_else(|| resolver.resolve_required_staff(&slot.id, &date));
            if count as u32 >= required {
                stats.filled_slots += 1;
            } else {
                stats.shortage_slots += 1;
            }
        }
    }
    stats
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub staff_id: String,
    pub name: String,
    pub shift_count: usize,
    pub attendance_count: usize,
}

/// Per-staff submission and attendance counts across the full dataset.
/// Attendance matches clock-ins by id or by name, because the oldest
/// records carry only a name.
pub fn staff_stats(
    config: &ScheduleConfig,
    submissions: &[ShiftSubmission],
    records: &[ClockRecord],
) -> Vec<StaffStats> {
    config
        .staff
        .iter()
        .map(|staff| {
            let shift_count = submissions
                .iter()
                .filter(|s| s.staff_id == staff.id)
                .count();
            let attendance_count = records
                .iter()
                .filter(|r| r.clock_type == ClockType::In)
                .filter(|r| r.staff_id == staff.id || r.staff_name == staff.name)
                .count();
            StaffStats {
                staff_id: staff.id.clone(),
                name: staff.name.clone(),
                shift_count,
                attendance_count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    pub week_key: String,
    pub label: String,
    pub member_count: usize,
    /// (date, submissions on that date), in week order.
    pub date_counts: Vec<(String, usize)>,
}

/// Submission coverage per week, for the weekly check screen.
pub fn week_overview(
    resolver: &SlotConfigService,
    submissions: &[ShiftSubmission],
) -> Vec<WeekSummary> {
    let config = resolver.config();
    let overrides = resolver.custom_overrides();

    weeks::weeks(config, &overrides)
        .into_iter()
        .map(|week| {
            let in_week: Vec<&ShiftSubmission> = submissions
                .iter()
                .filter(|s| {
                    let key = if s.week_key.is_empty() {
                        weeks::week_key_for(config, &overrides, &s.date).unwrap_or_default()
                    } else {
                        s.week_key.clone()
                    };
                    key == week.week_key
                })
                .collect();
            let mut members: Vec<&str> = in_week.iter().map(|s| s.staff_id.as_str()).collect();
            members.sort_unstable();
            members.dedup();
            let date_counts = week
                .dates
                .iter()
                .map(|date| {
                    let count = in_week.iter().filter(|s| &s.date == date).count();
                    (date.clone(), count)
                })
                .collect();
            WeekSummary {
                week_key: week.week_key,
                label: week.label,
                member_count: members.len(),
                date_counts,
            }
        })
        .collect()
}

// --- CSV projections ---

/// Status column value with the precedence the attendance table uses:
/// late beats early-leave beats a completed pair beats a missing out.
pub fn attendance_status_label(row: &AttendanceRow) -> &'static str {
    if row.in_status == Some(ClockStatus::Late) {
        "遅刻"
    } else if row.out_status == Some(ClockStatus::EarlyLeave) {
        "早退"
    } else if row.in_time.is_some() && row.out_time.is_some() {
        "完了"
    } else if row.in_time.is_some() {
        "未退勤"
    } else {
        ""
    }
}

pub fn attendance_csv(rows: &[AttendanceRow]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["日付", "学生番号", "名前", "シフト枠", "出勤", "退勤", "状態"])?;
    for row in rows {
        writer.write_record([
            row.date.as_str(),
            row.staff_id.as_str(),
            row.staff_name.as_str(),
            row.slot_label.as_str(),
            row.in_time.as_deref().unwrap_or(""),
            row.out_time.as_deref().unwrap_or(""),
            attendance_status_label(row),
        ])?;
    }
    finish_csv(writer)
}

/// The shift table: one row per submission, plus a placeholder row for
/// every slot nobody requested.
pub fn shift_table_csv(
    resolver: &SlotConfigService,
    submissions: &[ShiftSubmission],
) -> Result<String, csv::Error> {
    let config = resolver.config();
    let overrides = resolver.custom_overrides();
    let week_list = weeks::weeks(config, &overrides);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["日付", "枠", "開始時刻", "終了時刻", "学生番号", "スタッフ名", "週"])?;

    for date in calendar::operating_dates(config, &overrides) {
        for slot in resolver.resolve_slots(&date) {
            let slot_subs: Vec<&ShiftSubmission> = submissions
                .iter()
                .filter(|s| s.date == date && s.slot_id == slot.id)
                .collect();
            if slot_subs.is_empty() {
                writer.write_record([
                    date.as_str(),
                    slot.label.as_str(),
                    slot.start.as_str(),
                    slot.end.as_str(),
                    "-",
                    "（未定）",
                    "-",
                ])?;
                continue;
            }
            for sub in slot_subs {
                let week_label = week_list
                    .iter()
                    .find(|w| w.week_key == sub.week_key)
                    .map(|w| w.label.as_str())
                    .unwrap_or("-");
                writer.write_record([
                    date.as_str(),
                    slot.label.as_str(),
                    slot.start.as_str(),
                    slot.end.as_str(),
                    sub.staff_id.as_str(),
                    sub.staff_name.as_str(),
                    week_label,
                ])?;
            }
        }
    }
    finish_csv(writer)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// --- Data export / import ---

pub const EXPORT_VERSION: &str = "1.0";
pub const EXPORT_SYSTEM: &str = "cafeshift-core";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub exported_at: String,
    pub version: String,
    pub system: String,
    pub shifts: Vec<ShiftSubmission>,
    pub clock_records: Vec<ClockRecord>,
}

pub fn export_data(shifts: &[ShiftSubmission], records: &[ClockRecord]) -> DataExport {
    info!(
        "exporting {} shifts and {} clock records",
        shifts.len(),
        records.len()
    );
    DataExport {
        exported_at: Utc::now().to_rfc3339(),
        version: EXPORT_VERSION.to_string(),
        system: EXPORT_SYSTEM.to_string(),
        shifts: shifts.to_vec(),
        clock_records: records.to_vec(),
    }
}

/// Total worked minutes over reconciled rows with a complete pair.
pub fn total_minutes(rows: &[AttendanceRow]) -> i64 {
    rows.iter()
        .filter_map(|row| {
            let (in_time, out_time) = (row.in_time.as_deref()?, row.out_time.as_deref()?);
            crate::attendance::duration_minutes(in_time, out_time)
        })
        .sum()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub attendance: usize,
    pub total_minutes: i64,
    pub late_count: usize,
    pub early_leave_count: usize,
}

/// The four headline numbers of the attendance screen.
pub fn attendance_summary(rows: &[AttendanceRow]) -> AttendanceSummary {
    AttendanceSummary {
        attendance: rows.iter().filter(|r| r.in_time.is_some()).count(),
        total_minutes: total_minutes(rows),
        late_count: rows
            .iter()
            .filter(|r| r.in_status == Some(ClockStatus::Late))
            .count(),
        early_leave_count: rows
            .iter()
            .filter(|r| r.out_status == Some(ClockStatus::EarlyLeave))
            .count(),
    }
}
