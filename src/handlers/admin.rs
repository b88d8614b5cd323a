use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{
    AcademySettings, Appointment, AppointmentStatus, KnowledgeEntry, OpeningHours, Partner, Plan,
    Promotion, SchedulingPolicy,
};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AcademySettings>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = db::lock(&state.db)?;
    Ok(Json(queries::get_settings(&conn)?))
}

// POST /api/admin/settings
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub academy_name: Option<String>,
    pub whatsapp_number: Option<String>,
    pub allow_scheduling: Option<SchedulingPolicy>,
    pub scheduling_mode: Option<String>,
    pub fallback_response: Option<String>,
    pub opening_hours: Option<OpeningHours>,
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<AcademySettings>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if let Some(hours) = &body.opening_hours {
        hours
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    let conn = db::lock(&state.db)?;
    let mut settings = queries::get_settings(&conn)?;

    if let Some(name) = body.academy_name {
        settings.academy_name = name;
    }
    if let Some(number) = body.whatsapp_number {
        settings.whatsapp_number = number.chars().filter(char::is_ascii_digit).collect();
    }
    if let Some(policy) = body.allow_scheduling {
        settings.allow_scheduling = policy;
    }
    if let Some(mode) = body.scheduling_mode {
        settings.scheduling_mode = mode;
    }
    if let Some(text) = body.fallback_response {
        settings.fallback_response = text;
    }
    if let Some(hours) = body.opening_hours {
        settings.opening_hours = (!hours.slots.is_empty()).then_some(hours);
    }

    queries::save_settings(&conn, &settings)?;
    tracing::info!(policy = settings.allow_scheduling.as_str(), "academy settings updated");

    Ok(Json(settings))
}

// GET /api/admin/appointments
#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            AppointmentStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let appointments = state.store.list(status, query.limit.unwrap_or(50))?;
    Ok(Json(appointments))
}

// POST /api/admin/appointments/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = AppointmentStatus::parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {}", body.status)))?;

    if !state.store.update_status(&id, status)? {
        return Err(AppError::NotFound(format!("appointment {id}")));
    }

    tracing::info!(id = %id, status = status.as_str(), "appointment status updated");
    Ok(Json(serde_json::json!({ "ok": true, "status": status })))
}

// POST /api/admin/knowledge
pub async fn add_knowledge(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<KnowledgeEntry>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = db::lock(&state.db)?;
    let id = queries::insert_knowledge(&conn, &body)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// POST /api/admin/plans
pub async fn add_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Plan>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = db::lock(&state.db)?;
    let id = queries::insert_plan(&conn, &body)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// POST /api/admin/promotions
pub async fn add_promotion(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Promotion>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = db::lock(&state.db)?;
    let id = queries::insert_promotion(&conn, &body)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

// POST /api/admin/partners
pub async fn add_partner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Partner>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let conn = db::lock(&state.db)?;
    let id = queries::insert_partner(&conn, &body)?;
    Ok(Json(serde_json::json!({ "id": id })))
}
