// src/shifts.rs
//
// Shift submissions: a staff member's request to work one slot on one
// date. The collection is append-only plus deletion-by-id; the upstream
// store is the source of truth when reachable, the local snapshot
// otherwise.

use crate::calendar;
use crate::config::ScheduleConfig;
use crate::dates;
use crate::slots::SlotConfigService;
use crate::store::{keys, LocalStore, StoreError};
use crate::sync::Upstream;
use crate::weeks;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSubmission {
    pub id: String,
    pub date: String,
    pub staff_id: String,
    pub staff_name: String,
    pub slot_id: String,
    /// Denormalized at creation; legacy rows may carry none.
    #[serde(default)]
    pub week_key: String,
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("unknown staff id: {0}")]
    UnknownStaff(String),
    #[error("{0} is not an operating date")]
    NotOperating(String),
    #[error("slot {slot_id} is not offered on {date}")]
    SlotUnavailable { date: String, slot_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ShiftService {
    config: Arc<ScheduleConfig>,
    store: Arc<LocalStore>,
    upstream: Arc<dyn Upstream>,
    slots: Arc<SlotConfigService>,
}

impl ShiftService {
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

    /// Cleans up the artifacts spreadsheet round-trips leave behind.
    fn normalize(mut submissions: Vec<ShiftSubmission>) -> Vec<ShiftSubmission> {
        for s in &mut submissions {
            if let Some(date) = dates::normalize_date_str(&s.date) {
                s.date = date;
            }
        }
        submissions
    }

    /// The local snapshot.
    pub fn all(&self) -> Vec<ShiftSubmission> {
        Self::normalize(self.store.get(keys::SHIFTS).unwrap_or_default())
    }

    /// Fetches the full submission set from upstream and replaces the
    /// local snapshot; on any failure the snapshot is the answer.
    pub async fn load_all(&self) -> Vec<ShiftSubmission> {
        if self.upstream.is_configured() {
            match self.upstream.get_all_shifts().await {
                Ok(shifts) => {
                    let shifts = Self::normalize(shifts);
                    if let Err(e) = self.store.set(keys::SHIFTS, &shifts) {
                        warn!("failed to persist shift snapshot: {}", e);
                    }
                    info!("loaded {} shifts from upstream", shifts.len());
                    return shifts;
                }
                Err(e) => {
                    warn!("shift fetch failed, using local snapshot: {}", e);
                }
            }
        }
        self.all()
    }

    /// Creates a submission. The weekly limit is not enforced here;
    /// violations surface through `weeks::detect_violations`.
    pub fn submit(
        &self,
        staff_id: &str,
        date: &str,
        slot_id: &str,
    ) -> Result<ShiftSubmission, SubmitError> {
        let staff = self
            .config
            .staff_by_id(staff_id)
            .ok_or_else(|| SubmitError::UnknownStaff(staff_id.to_string()))?;

        let overrides = self.slots.custom_overrides();
        if !calendar::is_operating_date(&self.config, &overrides, date) {
            return Err(SubmitError::NotOperating(date.to_string()));
        }
        if !self.slots.is_slot_available(date, slot_id) {
            return Err(SubmitError::SlotUnavailable {
                date: date.to_string(),
                slot_id: slot_id.to_string(),
            });
        }

        let submission = ShiftSubmission {
            id: dates::generate_id(),
            date: date.to_string(),
            staff_id: staff.id.clone(),
            staff_name: staff.name.clone(),
            slot_id: slot_id.to_string(),
            week_key: weeks::week_key_for(&self.config, &overrides, date).unwrap_or_default(),
        };

        let mut all = self.all();
        all.push(submission.clone());
        self.store.set(keys::SHIFTS, &all)?;
        info!(
            "shift submitted: {} on {} slot {}",
            submission.staff_name, submission.date, submission.slot_id
        );
        Ok(submission)
    }

    /// Cancels a submission by id (staff or admin). The upstream delete
    /// is best-effort; the local removal is authoritative.
    pub async fn cancel(&self, shift_id: &str) -> Result<bool, StoreError> {
        if self.upstream.is_configured() {
            if let Err(e) = self.upstream.delete_shift(shift_id).await {
                warn!("upstream shift delete failed for {}: {}", shift_id, e);
            }
        }
        let mut all = self.all();
        let before = all.len();
        all.retain(|s| s.id != shift_id);
        let removed = all.len() < before;
        if removed {
            self.store.set(keys::SHIFTS, &all)?;
            info!("shift {} cancelled", shift_id);
        }
        Ok(removed)
    }

    /// Replaces the whole submission collection (data import).
    pub fn replace_all(&self, submissions: &[ShiftSubmission]) -> Result<(), StoreError> {
        self.store.set(keys::SHIFTS, &submissions)
    }

    pub fn by_date(&self, date: &str) -> Vec<ShiftSubmission> {
        self.all().into_iter().filter(|s| s.date == date).collect()
    }

    pub fn for_staff(&self, staff_id: &str) -> Vec<ShiftSubmission> {
        self.all()
            .into_iter()
            .filter(|s| s.staff_id == staff_id)
            .collect()
    }

    /// How many submissions a staff member already holds in a week.
    pub fn weekly_count_for(&self, staff_id: &str, week_key: &str) -> usize {
        let overrides = self.slots.custom_overrides();
        self.all()
            .iter()
            .filter(|s| s.staff_id == staff_id)
            .filter(|s| {
                let key = if s.week_key.is_empty() {
                    weeks::week_key_for(&self.config, &overrides, &s.date).unwrap_or_default()
                } else {
                    s.week_key.clone()
                };
                key == week_key
            })
            .count()
    }
}
