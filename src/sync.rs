// src/sync.rs
//
// Client for the upstream spreadsheet-backed API. Every action exchanges a
// `{ success: bool, ... }` envelope; the engine treats any failure on this
// boundary as "use the local snapshot", so callers log and fall back
// instead of propagating these errors.

use crate::attendance::{ClockRecord, RawClockRecord};
use crate::import::SlotImportRow;
use crate::shifts::ShiftSubmission;
use crate::slots::{ShiftSlot, SlotOverrides};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

/// Matches the original client-side API timeout.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("no upstream configured")]
    NotConfigured,
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("upstream returned status {status}")]
    Status { status: reqwest::StatusCode },
    #[error("upstream rejected the action: {message}")]
    Rejected { message: String },
}

/// Response envelope shared by every action.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: Value,
}

impl ApiEnvelope {
    fn into_payload(self) -> Result<Value, ApiError> {
        if self.success {
            Ok(self.payload)
        } else {
            Err(ApiError::Rejected {
                message: self.message.unwrap_or_else(|| "unspecified".to_string()),
            })
        }
    }
}

/// The eight actions the engine exchanges with the remote store. A trait
/// so the slot/shift/clock services can be exercised against a stub.
#[async_trait]
pub trait Upstream: Send + Sync {
    fn is_configured(&self) -> bool;
    async fn get_all_shifts(&self) -> Result<Vec<ShiftSubmission>, ApiError>;
    async fn get_records(&self, date: Option<&str>) -> Result<Vec<RawClockRecord>, ApiError>;
    async fn punch(&self, record: &ClockRecord) -> Result<(), ApiError>;
    async fn delete_shift(&self, shift_id: &str) -> Result<(), ApiError>;
    async fn save_shift_slot(&self, date: &str, slot: &ShiftSlot) -> Result<ShiftSlot, ApiError>;
    async fn delete_shift_slot_config(
        &self,
        date: &str,
        slot_id: Option<&str>,
    ) -> Result<(), ApiError>;
    async fn import_shift_slots(&self, rows: &[SlotImportRow]) -> Result<usize, ApiError>;
    async fn get_shift_slot_config(&self) -> Result<SlotOverrides, ApiError>;
}

pub struct ApiClient {
    base_url: Option<Url>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: Option<Url>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self { base_url, http })
    }

    /// A client with no upstream; every action fails with `NotConfigured`
    /// and callers stay on the local snapshot.
    pub fn unconfigured() -> Self {
        Self {
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    fn base(&self) -> Result<&Url, ApiError> {
        self.base_url.as_ref().ok_or(ApiError::NotConfigured)
    }

    async fn get(&self, action: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let mut url = self.base()?.clone();
        url.query_pairs_mut().append_pair("action", action);
        for (k, v) in params {
            url.query_pairs_mut().append_pair(k, v);
        }
        debug!("GET upstream action {}", action);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("upstream {} returned {}", action, status);
            return Err(ApiError::Status { status });
        }
        let envelope: ApiEnvelope = response.json().await?;
        envelope.into_payload()
    }

    async fn post(&self, action: &str, mut payload: Value) -> Result<Value, ApiError> {
        let url = self.base()?.clone();
        if let Some(map) = payload.as_object_mut() {
            map.insert("action".to_string(), json!(action));
        }
        debug!("POST upstream action {}", action);
        let response = self.http.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("upstream {} returned {}", action, status);
            return Err(ApiError::Status { status });
        }
        let envelope: ApiEnvelope = response.json().await?;
        envelope.into_payload()
    }
}

#[async_trait]
impl Upstream for ApiClient {
    fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    async fn get_all_shifts(&self) -> Result<Vec<ShiftSubmission>, ApiError> {
        let payload = self.post("getAllShifts", json!({})).await?;
        Ok(serde_json::from_value(
            payload.get("shifts").cloned().unwrap_or(Value::Null),
        )
        .unwrap_or_default())
    }

    async fn get_records(&self, date: Option<&str>) -> Result<Vec<RawClockRecord>, ApiError> {
        let mut body = json!({});
        if let Some(date) = date {
            body = json!({ "date": date });
        }
        let payload = self.post("getRecords", body).await?;
        Ok(serde_json::from_value(
            payload.get("records").cloned().unwrap_or(Value::Null),
        )
        .unwrap_or_default())
    }

    async fn punch(&self, record: &ClockRecord) -> Result<(), ApiError> {
        let body = serde_json::to_value(record)?;
        self.post("punch", body).await?;
        Ok(())
    }

    async fn delete_shift(&self, shift_id: &str) -> Result<(), ApiError> {
        self.post("deleteShift", json!({ "shiftId": shift_id }))
            .await?;
        Ok(())
    }

    async fn save_shift_slot(&self, date: &str, slot: &ShiftSlot) -> Result<ShiftSlot, ApiError> {
        let payload = self
            .post(
                "saveShiftSlot",
                json!({ "dateStr": date, "slot": slot }),
            )
            .await?;
        match payload.get("slot") {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(slot.clone()),
        }
    }

    async fn delete_shift_slot_config(
        &self,
        date: &str,
        slot_id: Option<&str>,
    ) -> Result<(), ApiError> {
        self.post(
            "deleteShiftSlotConfig",
            json!({ "dateStr": date, "slotId": slot_id }),
        )
        .await?;
        Ok(())
    }

    async fn import_shift_slots(&self, rows: &[SlotImportRow]) -> Result<usize, ApiError> {
        let payload = self
            .post("importShiftSlots", json!({ "slots": rows }))
            .await?;
        Ok(payload
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(rows.len() as u64) as usize)
    }

    async fn get_shift_slot_config(&self) -> Result<SlotOverrides, ApiError> {
        let payload = self.get("getShiftSlotConfig", &[]).await?;
        match payload.get("slots") {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(SlotOverrides::new()),
        }
    }
}
