//! REST API handlers.
//!
//! Each handler delegates to the `Scheduler` and returns the JSON envelope
//! `{success, data, error}`. Handlers that change an event read the caller
//! from the `x-user-id` header.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use fest_core::DateRange;
use festgrid_scheduler::{CalendarFilter, EventUpdate, ScheduleEdit};
use festgrid_state::{Event, Round, SubEventId};
use serde::{Deserialize, Serialize};

use crate::ApiState;
use crate::error::ApiError;

pub const CALLER_HEADER: &str = "x-user-id";

type ApiResult = Result<Response, ApiError>;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingCaller)
}

// ── Events ─────────────────────────────────────────────────────

/// GET /api/v1/events
pub async fn list_events(State(state): State<ApiState>) -> ApiResult {
    let events = state.scheduler.list_events()?;
    Ok(ApiResponse::ok(events).into_response())
}

/// POST /api/v1/events
pub async fn create_event(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(event): Json<Event>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let event = state.scheduler.create_event(&caller, event).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(event)).into_response())
}

/// GET /api/v1/events/{id}
pub async fn get_event(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let event = state.scheduler.get_event(&id)?;
    Ok(ApiResponse::ok(event).into_response())
}

/// GET /api/v1/events/mine
pub async fn my_events(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult {
    let caller = caller(&headers)?;
    let events = state.scheduler.events_organized_by(&caller)?;
    Ok(ApiResponse::ok(events).into_response())
}

/// PATCH /api/v1/events/{id}
pub async fn update_event(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<EventUpdate>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let event = state.scheduler.update_event(&caller, &id, update).await?;
    Ok(ApiResponse::ok(event).into_response())
}

/// POST /api/v1/events/{id}/sub-events/{sub_id}/rounds
pub async fn create_round(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((id, sub_id)): Path<(String, String)>,
    Json(round): Json<Round>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let round = state
        .scheduler
        .create_round(&caller, &id, &sub_id, round)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(round)).into_response())
}

/// DELETE /api/v1/events/{id}
pub async fn delete_event(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let caller = caller(&headers)?;
    state.scheduler.delete_event(&caller, &id).await?;
    Ok(ApiResponse::ok("deleted").into_response())
}

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub student_id: String,
    #[serde(default)]
    pub sub_event_ids: Vec<SubEventId>,
}

/// POST /api/v1/events/{id}/registrations
pub async fn register_student(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult {
    let registration = state
        .scheduler
        .register_student(&id, &req.student_id, req.sub_event_ids)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(registration)).into_response())
}

/// DELETE /api/v1/events/{id}/registrations/{reg_id}
pub async fn cancel_registration(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((id, reg_id)): Path<(String, String)>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let registration = state
        .scheduler
        .cancel_registration(&caller, &id, &reg_id)
        .await?;
    Ok(ApiResponse::ok(registration).into_response())
}

/// GET /api/v1/registrations
pub async fn my_registrations(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult {
    let caller = caller(&headers)?;
    let registrations = state.scheduler.student_registrations(&caller, Utc::now())?;
    Ok(ApiResponse::ok(registrations).into_response())
}

/// Reschedule request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub conducted_dates: DateRange,
}

/// PUT /api/v1/events/{id}/reschedule
pub async fn reschedule_event(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let event = state
        .scheduler
        .reschedule_event(&caller, &id, req.conducted_dates)
        .await?;
    Ok(ApiResponse::ok(event).into_response())
}

/// POST /api/v1/events/optimize
pub async fn optimize_events(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult {
    caller(&headers)?;
    let placed = state.scheduler.optimize_upcoming(Utc::now()).await?;
    Ok(ApiResponse::ok(placed).into_response())
}

/// GET /api/v1/calendar
pub async fn calendar(
    State(state): State<ApiState>,
    Query(filter): Query<CalendarFilter>,
) -> ApiResult {
    let events = state.scheduler.calendar(&filter)?;
    Ok(ApiResponse::ok(events).into_response())
}

// ── Schedules ──────────────────────────────────────────────────

/// Query parameters for a scheduling run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleParams {
    pub daily_hours: Option<f64>,
    /// Fail with 409 instead of returning fallback placements.
    #[serde(default)]
    pub strict: bool,
}

/// POST /api/v1/events/{id}/schedule
pub async fn schedule_sub_events(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<ScheduleParams>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let report = state
        .scheduler
        .schedule_sub_events(&caller, &id, params.daily_hours)
        .await?;
    if params.strict {
        let schedules = report.require_clean()?;
        return Ok(ApiResponse::ok(schedules).into_response());
    }
    Ok(ApiResponse::ok(report).into_response())
}

/// GET /api/v1/events/{id}/schedule
pub async fn get_schedule(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let view = state.scheduler.get_schedule(&id)?;
    Ok(ApiResponse::ok(view).into_response())
}

/// PATCH /api/v1/schedules/{id}
pub async fn edit_schedule(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(edit): Json<ScheduleEdit>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let schedule = state
        .scheduler
        .edit_sub_event_schedule(&caller, &id, edit)
        .await?;
    Ok(ApiResponse::ok(schedule).into_response())
}
