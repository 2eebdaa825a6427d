// src/slots.rs
//
// Slot configuration resolution. Three tiers, highest priority first:
//
//   1. custom overrides (admin-entered, persisted, synced upstream); a
//      key that maps to an empty list is a tombstone: the date's slots
//      are deleted and no lower tier may resurrect them;
//   2. per-date defaults from the static schedule config;
//   3. the legacy global slot table addressed by per-date slot-ID lists.
//
// Resolution stops at the first tier that defines an entry for the date.

use crate::config::ScheduleConfig;
use crate::dates;
use crate::import::SlotImportRow;
use crate::store::{keys, LocalStore, StoreError};
use crate::sync::{ApiError, Upstream};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A named time window on a given date requiring a minimum headcount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSlot {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_staff: Option<u32>,
}

/// Custom per-date overrides, keyed by `YYYY-MM-DD`.
pub type SlotOverrides = BTreeMap<String, Vec<ShiftSlot>>;

#[derive(Error, Debug)]
pub enum SlotConfigError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upstream(#[from] ApiError),
}

pub struct SlotConfigService {
    config: Arc<ScheduleConfig>,
    store: Arc<LocalStore>,
    upstream: Arc<dyn Upstream>,
    cache: RwLock<Option<SlotOverrides>>,
    refresh_gate: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

impl SlotConfigService {
    pub fn new(
        config: Arc<ScheduleConfig>,
        store: Arc<LocalStore>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            config,
            store,
            upstream,
            cache: RwLock::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Current custom overrides: the primed cache, else the local
    /// snapshot. Reading the snapshot does not prime the cache.
    pub fn custom_overrides(&self) -> SlotOverrides {
        if let Some(cached) = self
            .cache
            .read()
            .expect("slot cache lock poisoned")
            .clone()
        {
            return cached;
        }
        self.store
            .get::<SlotOverrides>(keys::CUSTOM_SHIFT_SLOTS)
            .unwrap_or_default()
    }

    /// Drops the cached overrides; the next read goes back to the local
    /// snapshot (or a refresh). Every mutation calls this implicitly by
    /// rewriting the cache.
    pub fn invalidate(&self) {
        *self.cache.write().expect("slot cache lock poisoned") = None;
        debug!("slot config cache cleared");
    }

    fn update_cache(&self, overrides: SlotOverrides) {
        if let Err(e) = self.store.set(keys::CUSTOM_SHIFT_SLOTS, &overrides) {
            warn!("failed to persist slot overrides: {}", e);
        }
        *self.cache.write().expect("slot cache lock poisoned") = Some(overrides);
    }

    /// Fetches the override set from upstream, collapsing concurrent
    /// calls into a single request: whoever loses the race on the gate
    /// observes the bumped generation and returns the fresh cache.
    /// Failures degrade to the local snapshot and are never surfaced.
    pub async fn refresh(&self, force: bool) -> SlotOverrides {
        if !force {
            if let Some(cached) = self
                .cache
                .read()
                .expect("slot cache lock poisoned")
                .clone()
            {
                return cached;
            }
        }
        if !self.upstream.is_configured() {
            debug!("no upstream configured; slot overrides come from the local snapshot");
            return self.custom_overrides();
        }

        let observed = self.generation.load(Ordering::SeqCst);
        let _gate = self.refresh_gate.lock().await;
        if self.generation.load(Ordering::SeqCst) != observed {
            // Another caller completed a refresh while we waited.
            return self.custom_overrides();
        }

        match self.upstream.get_shift_slot_config().await {
            Ok(overrides) => {
                info!("fetched slot config for {} dates from upstream", overrides.len());
                self.update_cache(overrides.clone());
                self.generation.fetch_add(1, Ordering::SeqCst);
                overrides
            }
            Err(e) => {
                warn!("slot config refresh failed, using local snapshot: {}", e);
                self.custom_overrides()
            }
        }
    }

    // --- Resolution ---

    /// Custom entry for the date, else the per-date default. `None` means
    /// neither tier knows the date (the legacy tier is not consulted;
    /// mutations never materialize legacy slots).
    fn custom_or_default(&self, date: &str) -> Option<Vec<ShiftSlot>> {
        let overrides = self.custom_overrides();
        if let Some(slots) = overrides.get(date) {
            return Some(slots.clone());
        }
        self.config.date_shift_slots.get(date).cloned()
    }

    /// The effective slots for a date. Order is configuration insertion
    /// order, not time order. An unknown date resolves to an empty list.
    pub fn resolve_slots(&self, date: &str) -> Vec<ShiftSlot> {
        let overrides = self.custom_overrides();
        if let Some(slots) = overrides.get(date) {
            // Present-but-empty wins: the date's slots were deleted.
            return slots.clone();
        }
        if let Some(defaults) = self.config.date_shift_slots.get(date) {
            if !defaults.is_empty() {
                return defaults.clone();
            }
        }
        let Some(ids) = self.config.date_slot_ids.get(date) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.config.global_slots.get(id).cloned())
            .collect()
    }

    /// Required headcount for a slot: the date-aware slot instance, else
    /// the legacy global slot, else the configured default.
    pub fn resolve_required_staff(&self, slot_id: &str, date: &str) -> u32 {
        if let Some(required) = self
            .resolve_slots(date)
            .iter()
            .find(|s| s.id == slot_id)
            .and_then(|s| s.required_staff)
        {
            return required;
        }
        if let Some(required) = self
            .config
            .global_slots
            .get(slot_id)
            .and_then(|s| s.required_staff)
        {
            return required;
        }
        self.config.required_staff_per_slot
    }

    /// Date-aware slot lookup with a legacy-global fallback.
    pub fn slot_info(&self, slot_id: &str, date: &str) -> Option<ShiftSlot> {
        self.resolve_slots(date)
            .into_iter()
            .find(|s| s.id == slot_id)
            .or_else(|| self.config.global_slots.get(slot_id).cloned())
    }

    pub fn available_slot_ids(&self, date: &str) -> Vec<String> {
        self.resolve_slots(date).into_iter().map(|s| s.id).collect()
    }

    pub fn is_slot_available(&self, date: &str, slot_id: &str) -> bool {
        self.resolve_slots(date).iter().any(|s| s.id == slot_id)
    }

    /// All configured dates and their slots: defaults overlaid by custom
    /// entries, tombstones included (callers skip the empty ones).
    pub fn all_shift_slots(&self) -> SlotOverrides {
        let mut all = self.config.date_shift_slots.clone();
        for (date, slots) in self.custom_overrides() {
            all.insert(date, slots);
        }
        all
    }

    // --- Mutations ---
    // Each one writes the local snapshot, forwards to the upstream when
    // one is configured, and leaves the cache holding the new state.

    /// Inserts or updates one slot on a date. The first custom entry for
    /// a date that has defaults starts as a copy of those defaults, so
    /// adding a slot never hides the existing ones.
    pub async fn save_slot(
        &self,
        date: &str,
        mut slot: ShiftSlot,
    ) -> Result<ShiftSlot, SlotConfigError> {
        let mut overrides = self.custom_overrides();
        let entry = overrides.entry(date.to_string()).or_insert_with(|| {
            self.config
                .date_shift_slots
                .get(date)
                .cloned()
                .unwrap_or_default()
        });

        if slot.id.is_empty() {
            slot.id = format!("SLOT_{}_{}", Utc::now().timestamp_millis(), entry.len());
        }
        if slot.label.is_empty() {
            slot.label = format!("枠{}", entry.len() + 1);
        }

        if self.upstream.is_configured() {
            slot = self.upstream.save_shift_slot(date, &slot).await?;
        }

        match entry.iter_mut().find(|s| s.id == slot.id) {
            Some(existing) => *existing = slot.clone(),
            None => entry.push(slot.clone()),
        }
        info!("saved slot {} on {}", slot.id, date);
        self.update_cache(overrides);
        Ok(slot)
    }

    /// Removes one slot from a date, or every slot when `slot_id` is
    /// `None`. The result is stored as a custom entry even when empty;
    /// that tombstone is what overrides the default tier.
    pub async fn delete_slot(
        &self,
        date: &str,
        slot_id: Option<&str>,
    ) -> Result<(), SlotConfigError> {
        if self.upstream.is_configured() {
            self.upstream.delete_shift_slot_config(date, slot_id).await?;
        }

        let current = self.custom_or_default(date).unwrap_or_default();
        let remaining: Vec<ShiftSlot> = match slot_id {
            Some(id) => current.into_iter().filter(|s| s.id != id).collect(),
            None => Vec::new(),
        };
        let mut overrides = self.custom_overrides();
        overrides.insert(date.to_string(), remaining);
        info!("deleted slot config on {} ({:?})", date, slot_id);
        self.update_cache(overrides);
        Ok(())
    }

    /// Commits a validated import batch. Rows are appended per date with
    /// synthesized IDs; the whole batch has already passed validation, so
    /// this either applies every row or fails on the upstream boundary
    /// before touching local state.
    pub async fn import_slots(&self, rows: &[SlotImportRow]) -> Result<usize, SlotConfigError> {
        if self.upstream.is_configured() {
            self.upstream.import_shift_slots(rows).await?;
        }

        let mut overrides = self.custom_overrides();
        for row in rows {
            let entry = overrides.entry(row.date.clone()).or_default();
            entry.push(ShiftSlot {
                id: format!("SLOT_{}_{}", Utc::now().timestamp_millis(), entry.len()),
                label: row.label.clone(),
                start: row.start.clone(),
                end: row.end.clone(),
                required_staff: Some(row.required_staff),
            });
        }
        info!("imported {} slot rows", rows.len());
        self.update_cache(overrides);
        Ok(rows.len())
    }
}

// --- Clock-screen helpers ---

/// The slot whose window contains `time`, if any.
pub fn current_slot<'a>(time: &str, slots: &'a [ShiftSlot]) -> Option<&'a ShiftSlot> {
    let now = dates::time_to_minutes(time)?;
    slots.iter().find(|slot| {
        match (
            dates::time_to_minutes(&slot.start),
            dates::time_to_minutes(&slot.end),
        ) {
            (Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    })
}

/// The next slot starting after `time`, earliest first.
pub fn next_slot<'a>(time: &str, slots: &'a [ShiftSlot]) -> Option<&'a ShiftSlot> {
    let now = dates::time_to_minutes(time)?;
    slots
        .iter()
        .filter_map(|slot| dates::time_to_minutes(&slot.start).map(|start| (start, slot)))
        .filter(|(start, _)| now < *start)
        .min_by_key(|(start, _)| *start)
        .map(|(_, slot)| slot)
}
