// src/main.rs
//
// HTTP surface of the shift/attendance engine. The `/api` endpoint
// mirrors the spreadsheet backend's action protocol (every request names
// an action, every response is a `{ success, ... }` envelope); the
// remaining routes expose the read-side operations the browser screens
// compute. Engine rejections (double punches, invalid import rows)
// travel as `success: false` with a message, not as HTTP errors.

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

mod attendance;
mod calendar;
mod config;
mod dates;
mod import;
mod reports;
mod shifts;
mod slots;
mod store;
mod sync;
mod weeks;

mod schedule_tests;

use attendance::{ClockService, ClockType};
use config::ScheduleConfig;
use shifts::{ShiftService, SubmitError};
use slots::{SlotConfigError, SlotConfigService};
use store::{keys, LocalStore, StoreError};
use sync::{ApiClient, Upstream};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    SlotConfig(#[from] SlotConfigError),
    #[error("CSV generation failed: {0}")]
    Csv(#[from] csv::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("request failed: {}", self);
        let status = match &self {
            AppError::BadRequest(_) | AppError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SlotConfig(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(json!({ "success": false, "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<LocalStore>,
    slot_config: Arc<SlotConfigService>,
    shifts: Arc<ShiftService>,
    clock: Arc<ClockService>,
}

#[derive(Parser, Debug)]
#[command(name = "cafeshift-core", about = "Shift scheduling and attendance backend")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8787)]
    port: u16,
    /// Directory for the JSON collection snapshots.
    #[arg(long, default_value = "./cafeshift_data")]
    data_dir: PathBuf,
    /// Schedule config JSON; the built-in seed is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Upstream spreadsheet API base URL (also CAFESHIFT_UPSTREAM_URL).
    #[arg(long)]
    upstream_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default tracing subscriber")?;

    let args = Args::parse();

    let schedule = match &args.config {
        Some(path) => ScheduleConfig::from_file(path)?,
        None => {
            info!("no --config given, using the built-in schedule");
            ScheduleConfig::builtin()
        }
    };

    let upstream_url = args
        .upstream_url
        .clone()
        .or_else(|| std::env::var("CAFESHIFT_UPSTREAM_URL").ok());
    let upstream_url = match upstream_url {
        Some(raw) => Some(Url::parse(&raw).context("parsing upstream URL")?),
        None => None,
    };
    if upstream_url.is_none() {
        info!("no upstream configured; running on the local snapshot only");
    }

    let config = Arc::new(schedule);
    let store = Arc::new(LocalStore::new(&args.data_dir)?);
    let upstream: Arc<dyn Upstream> = match upstream_url {
        Some(url) => Arc::new(ApiClient::new(Some(url)).context("building upstream client")?),
        None => Arc::new(ApiClient::unconfigured()),
    };
    let slot_config = Arc::new(SlotConfigService::new(
        config.clone(),
        store.clone(),
        upstream.clone(),
    ));
    let shifts = Arc::new(ShiftService::new(
        config.clone(),
        store.clone(),
        upstream.clone(),
        slot_config.clone(),
    ));
    let clock = Arc::new(ClockService::new(
        config.clone(),
        store.clone(),
        upstream.clone(),
        slot_config.clone(),
    ));

    if upstream.is_configured() {
        let overrides = slot_config.refresh(true).await;
        info!("initial slot config sync: {} dates", overrides.len());
    }

    let state = AppState {
        store,
        slot_config,
        shifts,
        clock,
    };

    let app = Router::new()
        .route("/api", post(api_post).get(api_get))
        .route("/api/schedule", get(schedule_overview))
        .route("/api/schedule/day/{date}", get(schedule_day))
        .route("/api/schedule/stats", get(schedule_stats_handler))
        .route("/api/weekly", get(weekly_overview))
        .route("/api/attendance", get(attendance_rows))
        .route("/api/attendance.csv", get(attendance_csv_handler))
        .route("/api/shifts", get(shifts_query).post(submit_shift))
        .route("/api/shifts.csv", get(shift_table_handler))
        .route("/api/slots", get(slot_config_overview))
        .route("/api/staff/stats", get(staff_stats_handler))
        .route("/api/export", get(export_handler))
        .route("/api/import", post(import_handler))
        .route("/api/import/slots.csv", post(import_slot_csv_handler))
        .route("/api/clear", post(clear_handler))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

// --- Action endpoint (spreadsheet protocol) ---

async fn api_post(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let action = body
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("missing action".to_string()))?
        .to_string();
    dispatch(&state, &action, &body).await.map(Json)
}

/// The legacy clients issue the read actions as GET with query params.
async fn api_get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let action = params
        .get("action")
        .cloned()
        .ok_or_else(|| AppError::BadRequest("missing action".to_string()))?;
    let mut body = serde_json::Map::new();
    for (k, v) in params {
        body.insert(k, Value::String(v));
    }
    dispatch(&state, &action, &Value::Object(body))
        .await
        .map(Json)
}

fn str_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn require_str(payload: &Value, key: &str) -> Result<String, AppError> {
    str_field(payload, key).ok_or_else(|| AppError::BadRequest(format!("missing {}", key)))
}

async fn dispatch(state: &AppState, action: &str, payload: &Value) -> Result<Value, AppError> {
    match action {
        "getAllShifts" => {
            let shifts = state.shifts.load_all().await;
            Ok(json!({ "success": true, "shifts": shifts }))
        }
        "getRecords" => {
            let records = match str_field(payload, "date") {
                Some(date) => state.clock.records_for_date(&date).await,
                None => state.clock.all_records(),
            };
            Ok(json!({ "success": true, "records": records }))
        }
        "punch" => {
            let staff_id = require_str(payload, "staffId")?;
            let slot_id = require_str(payload, "slotId")?;
            let clock_type = match require_str(payload, "clockType")?.to_lowercase().as_str() {
                "in" => ClockType::In,
                "out" => ClockType::Out,
                other => {
                    return Err(AppError::BadRequest(format!(
                        "clockType must be in or out, got {}",
                        other
                    )))
                }
            };
            let date = str_field(payload, "date");
            let time = str_field(payload, "time");
            match state
                .clock
                .punch(
                    &staff_id,
                    &slot_id,
                    date.as_deref(),
                    time.as_deref(),
                    clock_type,
                )
                .await
            {
                Ok(record) => Ok(json!({ "success": true, "record": record })),
                Err(e) => {
                    warn!("punch rejected: {}", e);
                    Ok(json!({ "success": false, "message": e.to_string() }))
                }
            }
        }
        "deleteShift" => {
            let shift_id = require_str(payload, "shiftId")?;
            let removed = state.shifts.cancel(&shift_id).await?;
            Ok(json!({ "success": true, "removed": removed }))
        }
        "saveShiftSlot" => {
            let date = require_str(payload, "dateStr")?;
            let slot_value = payload
                .get("slot")
                .cloned()
                .ok_or_else(|| AppError::BadRequest("missing slot".to_string()))?;
            let slot: slots::ShiftSlot = serde_json::from_value(slot_value)
                .map_err(|e| AppError::BadRequest(format!("invalid slot: {}", e)))?;
            let saved = state.slot_config.save_slot(&date, slot).await?;
            Ok(json!({ "success": true, "slot": saved }))
        }
        "deleteShiftSlotConfig" => {
            let date = require_str(payload, "dateStr")?;
            let slot_id = str_field(payload, "slotId");
            state
                .slot_config
                .delete_slot(&date, slot_id.as_deref())
                .await?;
            Ok(json!({ "success": true }))
        }
        "importShiftSlots" => {
            let rows_value = payload
                .get("slots")
                .cloned()
                .ok_or_else(|| AppError::BadRequest("missing slots".to_string()))?;
            let rows: Vec<import::SlotImportRow> = serde_json::from_value(rows_value)
                .map_err(|e| AppError::BadRequest(format!("invalid slots: {}", e)))?;
            if let Err(errors) = import::validate_batch(&rows) {
                warn!("slot import rejected with {} errors", errors.len());
                return Ok(json!({ "success": false, "errors": errors }));
            }
            let count = state.slot_config.import_slots(&rows).await?;
            state.slot_config.invalidate();
            Ok(json!({ "success": true, "count": count }))
        }
        "getShiftSlotConfig" => {
            let slots = state.slot_config.custom_overrides();
            Ok(json!({ "success": true, "slots": slots }))
        }
        other => Err(AppError::UnknownAction(other.to_string())),
    }
}

// --- Schedule reads ---

async fn schedule_overview(State(state): State<AppState>) -> Json<Value> {
    let config = state.slot_config.config();
    let overrides = state.slot_config.custom_overrides();
    Json(json!({
        "success": true,
        "cafeName": config.cafe_name,
        "dates": calendar::operating_dates(config, &overrides),
        "period": calendar::operating_period(config, &overrides),
        "weeks": weeks::weeks(config, &overrides),
    }))
}

async fn schedule_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let config = state.slot_config.config();
    let overrides = state.slot_config.custom_overrides();
    let slot_list = state.slot_config.resolve_slots(&date);
    let submissions = state.shifts.by_date(&date);
    let fill = reports::day_fill(&date, &slot_list, &submissions, &state.slot_config);
    let week = weeks::week_key_for(config, &overrides, &date)
        .and_then(|key| weeks::week_info(config, &overrides, &key));

    let (current, next) = match params.get("time") {
        Some(time) => (
            slots::current_slot(time, &slot_list).cloned(),
            slots::next_slot(time, &slot_list).cloned(),
        ),
        None => (None, None),
    };

    Json(json!({
        "success": true,
        "date": date,
        "dateLabel": dates::format_date_display(&date),
        "operating": calendar::is_operating_date(config, &overrides, &date),
        "operationDate": calendar::operation_date(config, &overrides, &date),
        "week": week,
        "slots": slot_list,
        "slotIds": state.slot_config.available_slot_ids(&date),
        "fill": fill,
        "submissions": submissions,
        "currentSlot": current,
        "nextSlot": next,
    }))
}

async fn schedule_stats_handler(State(state): State<AppState>) -> Json<Value> {
    let stats = reports::schedule_stats(&state.slot_config, &state.shifts.all());
    Json(json!({ "success": true, "stats": stats }))
}

async fn weekly_overview(State(state): State<AppState>) -> Json<Value> {
    let config = state.slot_config.config();
    let overrides = state.slot_config.custom_overrides();
    let submissions = state.shifts.all();
    Json(json!({
        "success": true,
        "violations": weeks::detect_violations(config, &overrides, &submissions),
        "overview": reports::week_overview(&state.slot_config, &submissions),
    }))
}

// --- Attendance reads ---

async fn collect_attendance_rows(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Vec<attendance::AttendanceRow> {
    let records = match params.get("date") {
        Some(date) => state.clock.records_for_date(date).await,
        None => state.clock.all_records(),
    };
    let records: Vec<_> = match params.get("staffName") {
        Some(name) => records
            .into_iter()
            .filter(|r| &r.staff_name == name)
            .collect(),
        None => records,
    };
    attendance::reconcile(&records, state.slot_config.config())
}

async fn attendance_rows(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let rows = collect_attendance_rows(&state, &params).await;
    let summary = reports::attendance_summary(&rows);
    Json(json!({ "success": true, "rows": rows, "summary": summary }))
}

async fn attendance_csv_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let rows = collect_attendance_rows(&state, &params).await;
    let csv = reports::attendance_csv(&rows)?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        csv,
    )
        .into_response())
}

// --- Shifts ---

async fn shifts_query(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let shifts = match params.get("staffId") {
        Some(staff_id) => state.shifts.for_staff(staff_id),
        None => state.shifts.all(),
    };
    Json(json!({ "success": true, "shifts": shifts }))
}

async fn submit_shift(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let staff_id = require_str(&body, "staffId")?;
    let date = require_str(&body, "date")?;
    let slot_id = require_str(&body, "slotId")?;
    match state.shifts.submit(&staff_id, &date, &slot_id) {
        Ok(shift) => {
            let weekly_count = state.shifts.weekly_count_for(&staff_id, &shift.week_key);
            let limit = state.slot_config.config().weekly_shift_limit as usize;
            Ok(Json(json!({
                "success": true,
                "shift": shift,
                "weeklyCount": weekly_count,
                "weeklyLimitExceeded": weekly_count > limit,
            })))
        }
        Err(SubmitError::Store(e)) => Err(e.into()),
        Err(e) => {
            warn!("shift submission rejected: {}", e);
            Ok(Json(json!({ "success": false, "message": e.to_string() })))
        }
    }
}

async fn shift_table_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let csv = reports::shift_table_csv(&state.slot_config, &state.shifts.all())?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        csv,
    )
        .into_response())
}

// --- Admin reads and data management ---

async fn slot_config_overview(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "slots": state.slot_config.all_shift_slots() }))
}

async fn staff_stats_handler(State(state): State<AppState>) -> Json<Value> {
    let stats = reports::staff_stats(
        state.slot_config.config(),
        &state.shifts.all(),
        &state.clock.all_records(),
    );
    Json(json!({ "success": true, "stats": stats }))
}

async fn export_handler(State(state): State<AppState>) -> Json<Value> {
    let export = reports::export_data(&state.shifts.all(), &state.clock.all_records());
    Json(json!({ "success": true, "export": export }))
}

async fn import_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let export_value = body.get("export").cloned().unwrap_or(body);
    let data: reports::DataExport = serde_json::from_value(export_value)
        .map_err(|e| AppError::BadRequest(format!("invalid export payload: {}", e)))?;
    state.shifts.replace_all(&data.shifts)?;
    state.clock.replace_all(&data.clock_records)?;
    info!(
        "imported {} shifts and {} clock records",
        data.shifts.len(),
        data.clock_records.len()
    );
    Ok(Json(json!({
        "success": true,
        "shifts": data.shifts.len(),
        "clockRecords": data.clock_records.len(),
    })))
}

/// Bulk slot registration straight from the CSV template.
async fn import_slot_csv_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, AppError> {
    let rows = import::read_slot_csv(body.as_bytes())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if let Err(errors) = import::validate_batch(&rows) {
        warn!("CSV slot import rejected with {} errors", errors.len());
        return Ok(Json(json!({ "success": false, "errors": errors })));
    }
    let count = state.slot_config.import_slots(&rows).await?;
    state.slot_config.invalidate();
    Ok(Json(json!({ "success": true, "count": count })))
}

async fn clear_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.store.remove(keys::SHIFTS)?;
    state.store.remove(keys::CLOCK_RECORDS)?;
    state.slot_config.invalidate();
    info!("cleared shift and clock collections");
    Ok(Json(json!({ "success": true })))
}
