use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::services::calendar::generate_ics;
use crate::state::AppState;

// GET /calendar/:appointment_id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    let appointment_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let appt = match state.store.get(appointment_id) {
        Ok(Some(a)) => a,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, "Agendamento não encontrado").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load appointment for .ics");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
        }
    };

    let academy_name = state.settings().academy_name;
    let Some(ics) = generate_ics(&appt, &academy_name) else {
        tracing::error!(id = %appt.id, time = %appt.scheduled_time, "stored appointment time is invalid");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
    };
    let filename = format!("aula-{appointment_id}.ics");

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response()
}
