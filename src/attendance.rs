// src/attendance.rs
//
// Clock records and their reconciliation into attendance rows. Records
// arrive from two generations of clients, so everything passes through
// `RawClockRecord::normalize` first; core logic only ever sees the
// canonical shape.

use crate::config::{PunchTolerance, ScheduleConfig};
use crate::dates;
use crate::slots::{ShiftSlot, SlotConfigService};
use crate::store::{keys, LocalStore, StoreError};
use crate::sync::Upstream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockType {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    Normal,
    Late,
    EarlyLeave,
}

/// Wire shape tolerant of the legacy clients: `clockType` may arrive as
/// `type` (in either case), `staffName` as `name`, `slotId` as `slot`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawClockRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub staff_id: String,
    #[serde(default, alias = "name")]
    pub staff_name: String,
    #[serde(default, alias = "slot")]
    pub slot_id: String,
    #[serde(default)]
    pub slot_label: String,
    #[serde(default, alias = "type")]
    pub clock_type: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Canonical clock record. One staff/date/slot triple accumulates at
/// most one `in` and one `out` under normal operation; duplicates are
/// tolerated downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClockRecord {
    pub id: String,
    pub date: String,
    pub staff_id: String,
    pub staff_name: String,
    pub slot_id: String,
    pub slot_label: String,
    pub clock_type: ClockType,
    pub time: String,
    pub status: ClockStatus,
    pub timestamp: String,
}

impl RawClockRecord {
    /// Produces the canonical record, or `None` when the clock type is
    /// neither `in` nor `out` (such rows carry no usable punch).
    pub fn normalize(self) -> Option<ClockRecord> {
        let clock_type = match self.clock_type.trim().to_lowercase().as_str() {
            "in" => ClockType::In,
            "out" => ClockType::Out,
            other => {
                warn!(
                    "dropping clock record {} with unrecognized type {:?}",
                    self.id, other
                );
                return None;
            }
        };
        Some(ClockRecord {
            id: self.id,
            date: dates::normalize_date_str(&self.date).unwrap_or(self.date),
            staff_id: self.staff_id,
            staff_name: self.staff_name,
            slot_id: self.slot_id,
            slot_label: self.slot_label,
            clock_type,
            time: dates::normalize_time_str(&self.time).unwrap_or(self.time),
            // Anything unrecognized reads as a normal punch.
            status: match self.status.as_str() {
                "late" => ClockStatus::Late,
                "early_leave" => ClockStatus::EarlyLeave,
                _ => ClockStatus::Normal,
            },
            timestamp: self.timestamp,
        })
    }
}

/// Classifies a punch against the slot window. A clock-in on or after
/// `start + late_minutes` is late; a clock-out strictly before `end` is
/// an early leave. Arriving early (inside `early_minutes`) is normal.
pub fn classify(
    clock_type: ClockType,
    time: &str,
    slot: &ShiftSlot,
    tolerance: &PunchTolerance,
) -> ClockStatus {
    let Some(punched) = dates::time_to_minutes(time) else {
        return ClockStatus::Normal;
    };
    match clock_type {
        ClockType::In => match dates::time_to_minutes(&slot.start) {
            Some(start) if punched >= start + tolerance.late_minutes => ClockStatus::Late,
            _ => ClockStatus::Normal,
        },
        ClockType::Out => match dates::time_to_minutes(&slot.end) {
            Some(end) if punched < end => ClockStatus::EarlyLeave,
            _ => ClockStatus::Normal,
        },
    }
}

/// Minutes between paired punches. A negative span wraps across
/// midnight; this is a close-to-midnight heuristic, not an overnight
/// shift model.
pub fn duration_minutes(in_time: &str, out_time: &str) -> Option<i64> {
    let start = dates::time_to_minutes(in_time)? as i64;
    let end = dates::time_to_minutes(out_time)? as i64;
    let mut span = end - start;
    if span < 0 {
        span += MINUTES_PER_DAY;
    }
    Some(span)
}

// --- Punch state machine ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchState {
    Unpunched,
    ClockedIn,
    ClockedOut,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PunchError {
    #[error("already clocked in")]
    AlreadyClockedIn,
    #[error("already clocked out")]
    AlreadyClockedOut,
    #[error("must clock in first")]
    NotClockedIn,
    #[error("unknown staff id: {0}")]
    UnknownStaff(String),
    #[error("unknown shift slot: {0}")]
    UnknownSlot(String),
    #[error("failed to persist the punch")]
    Persist,
}

impl PunchState {
    /// State derived from the latest record by timestamp (RFC 3339
    /// strings compare correctly as text).
    pub fn from_records(records: &[ClockRecord]) -> Self {
        records
            .iter()
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
            .map(|latest| match latest.clock_type {
                ClockType::In => PunchState::ClockedIn,
                ClockType::Out => PunchState::ClockedOut,
            })
            .unwrap_or(PunchState::Unpunched)
    }

    /// The only legal path is Unpunched → ClockedIn → ClockedOut; a
    /// closed pair cannot be reopened through this flow.
    pub fn apply(self, clock_type: ClockType) -> Result<PunchState, PunchError> {
        match (self, clock_type) {
            (PunchState::Unpunched, ClockType::In) => Ok(PunchState::ClockedIn),
            (PunchState::ClockedIn, ClockType::Out) => Ok(PunchState::ClockedOut),
            (PunchState::ClockedIn, ClockType::In) => Err(PunchError::AlreadyClockedIn),
            (PunchState::Unpunched, ClockType::Out) => Err(PunchError::NotClockedIn),
            (PunchState::ClockedOut, _) => Err(PunchError::AlreadyClockedOut),
        }
    }
}

// --- Reconciliation ---

/// One staff/date/slot pairing of punches.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub date: String,
    pub staff_name: String,
    pub staff_id: String,
    pub slot_id: String,
    pub slot_label: String,
    pub in_time: Option<String>,
    pub out_time: Option<String>,
    pub in_status: Option<ClockStatus>,
    pub out_status: Option<ClockStatus>,
}

/// Groups records by (date, staff name, slot) and folds each group's
/// punches into one row. Within a group the last record processed wins
/// for its type; callers that need "latest wins" must pre-sort by
/// timestamp descending, as the clock-entry flow does. Rows come back
/// sorted by date descending, then staff name ascending.
pub fn reconcile(records: &[ClockRecord], config: &ScheduleConfig) -> Vec<AttendanceRow> {
    let mut grouped: BTreeMap<(String, String, String), AttendanceRow> = BTreeMap::new();

    for record in records {
        let slot_key = if record.slot_id.is_empty() {
            "default".to_string()
        } else {
            record.slot_id.clone()
        };
        let key = (
            record.date.clone(),
            record.staff_name.clone(),
            slot_key.clone(),
        );
        let row = grouped.entry(key).or_insert_with(|| {
            let slot_label = if !record.slot_label.is_empty() {
                record.slot_label.clone()
            } else {
                config
                    .global_slots
                    .get(&record.slot_id)
                    .map(|s| s.label.clone())
                    .unwrap_or_else(|| "-".to_string())
            };
            AttendanceRow {
                date: record.date.clone(),
                staff_name: record.staff_name.clone(),
                staff_id: record.staff_id.clone(),
                slot_id: slot_key,
                slot_label,
                in_time: None,
                out_time: None,
                in_status: None,
                out_status: None,
            }
        });
        match record.clock_type {
            ClockType::In => {
                row.in_time = Some(record.time.clone());
                row.in_status = Some(record.status);
            }
            ClockType::Out => {
                row.out_time = Some(record.time.clone());
                row.out_status = Some(record.status);
            }
        }
    }

    let mut rows: Vec<AttendanceRow> = grouped.into_values().collect();
    rows.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.staff_name.cmp(&b.staff_name))
    });
    rows
}

// --- Clock service ---

pub struct ClockService {
    config: Arc<ScheduleConfig>,
    store: Arc<LocalStore>,
    upstream: Arc<dyn Upstream>,
    slots: Arc<SlotConfigService>,
}

impl ClockService {
    pub fn new(
        config: Arc<ScheduleConfig>,
        store: Arc<LocalStore>,
        upstream: Arc<dyn Upstream>,
        slots: Arc<SlotConfigService>,
    ) -> Self {
        Self {
            config,
            store,
            upstream,
            slots,
        }
    }

    /// The local snapshot, normalized.
    pub fn all_records(&self) -> Vec<ClockRecord> {
        self.store
            .get::<Vec<RawClockRecord>>(keys::CLOCK_RECORDS)
            .unwrap_or_default()
            .into_iter()
            .filter_map(RawClockRecord::normalize)
            .collect()
    }

    /// Records for one date. Upstream data replaces the view only when
    /// it actually returns rows; everything else falls back to the local
    /// snapshot.
    pub async fn records_for_date(&self, date: &str) -> Vec<ClockRecord> {
        if self.upstream.is_configured() {
            match self.upstream.get_records(Some(date)).await {
                Ok(raw) if !raw.is_empty() => {
                    return raw.into_iter().filter_map(RawClockRecord::normalize).collect();
                }
                Ok(_) => {}
                Err(e) => warn!("record fetch failed, using local snapshot: {}", e),
            }
        }
        self.all_records()
            .into_iter()
            .filter(|r| r.date == date)
            .collect()
    }

    /// Records one punch. The guard runs against the stored records for
    /// the same staff/date/slot; an illegal transition writes nothing.
    pub async fn punch(
        &self,
        staff_id: &str,
        slot_id: &str,
        date: Option<&str>,
        time: Option<&str>,
        clock_type: ClockType,
    ) -> Result<ClockRecord, PunchError> {
        let staff = self
            .config
            .staff_by_id(staff_id)
            .ok_or_else(|| PunchError::UnknownStaff(staff_id.to_string()))?;

        let now = dates::jst_now();
        let date = match date {
            Some(d) => d.to_string(),
            None => now.format("%Y-%m-%d").to_string(),
        };
        let time = match time {
            Some(t) => dates::normalize_time_str(t).unwrap_or_else(|| t.to_string()),
            None => now.format("%H:%M").to_string(),
        };

        let slot = self
            .slots
            .slot_info(slot_id, &date)
            .ok_or_else(|| PunchError::UnknownSlot(slot_id.to_string()))?;

        let existing: Vec<ClockRecord> = self
            .all_records()
            .into_iter()
            .filter(|r| r.staff_id == staff.id && r.date == date && r.slot_id == slot_id)
            .collect();
        PunchState::from_records(&existing).apply(clock_type)?;

        let record = ClockRecord {
            id: dates::generate_id(),
            date,
            staff_id: staff.id.clone(),
            staff_name: staff.name.clone(),
            slot_id: slot.id.clone(),
            slot_label: slot.label.clone(),
            clock_type,
            status: classify(clock_type, &time, &slot, &self.config.punch_tolerance),
            time,
            timestamp: now.to_rfc3339(),
        };

        self.append_record(&record).map_err(|e| {
            warn!("failed to persist punch: {}", e);
            PunchError::Persist
        })?;
        if let Err(e) = self.store.set(keys::LAST_STAFF_ID, &record.staff_id) {
            warn!("failed to remember last staff id: {}", e);
        }

        if self.upstream.is_configured() {
            if let Err(e) = self.upstream.punch(&record).await {
                warn!("upstream punch forward failed: {}", e);
            }
        }

        info!(
            "{} punched {:?} for slot {} on {} ({:?})",
            record.staff_name, record.clock_type, record.slot_id, record.date, record.status
        );
        Ok(record)
    }

    fn append_record(&self, record: &ClockRecord) -> Result<(), StoreError> {
        let mut all = self.all_records();
        all.push(record.clone());
        self.store.set(keys::CLOCK_RECORDS, &all)
    }

    /// Replaces the whole record collection (data import).
    pub fn replace_all(&self, records: &[ClockRecord]) -> Result<(), StoreError> {
        self.store.set(keys::CLOCK_RECORDS, &records)
    }
}
