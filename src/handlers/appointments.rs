use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Appointment, NewAppointment};
use crate::services::booking::{check_availability, create_appointment, suggest_alternatives};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    available: bool,
    alternatives: Vec<String>,
}

// GET /api/appointments/availability?date=YYYY-MM-DD&time=HH:MM
pub async fn availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityResponse> {
    let available = check_availability(state.store.as_ref(), query.date, &query.time);
    let alternatives = if available {
        vec![]
    } else {
        let settings = state.settings();
        suggest_alternatives(
            state.store.as_ref(),
            query.date,
            &query.time,
            settings.opening_hours.as_ref(),
            2,
        )
    };

    Json(AvailabilityResponse {
        available,
        alternatives,
    })
}

// POST /api/appointments
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    if body.name.trim().is_empty() || body.phone.trim().is_empty() {
        return Err(AppError::BadRequest("name and phone are required".to_string()));
    }

    let settings = state.settings();
    let appt = create_appointment(state.store.as_ref(), body, settings.opening_hours.as_ref())?;
    Ok((StatusCode::CREATED, Json(appt)))
}
