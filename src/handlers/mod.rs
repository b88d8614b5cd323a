pub mod admin;
pub mod appointments;
pub mod calendar;
pub mod chat;
pub mod dialogue;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat/message", post(chat::post_message))
        .route("/api/chat/dialogue", post(dialogue::submit))
        .route("/api/chat/dialogue/:session_id", get(dialogue::get_session))
        .route("/api/chat/dialogue/:session_id/reset", post(dialogue::reset_session))
        .route("/api/appointments/availability", get(appointments::availability))
        .route("/api/appointments", post(appointments::create))
        .route("/calendar/:appointment_id", get(calendar::download_ics))
        .route("/api/admin/settings", get(admin::get_settings).post(admin::update_settings))
        .route("/api/admin/appointments", get(admin::list_appointments))
        .route("/api/admin/appointments/:id/status", post(admin::update_appointment_status))
        .route("/api/admin/knowledge", post(admin::add_knowledge))
        .route("/api/admin/plans", post(admin::add_plan))
        .route("/api/admin/promotions", post(admin::add_promotion))
        .route("/api/admin/partners", post(admin::add_partner))
        .with_state(state)
}
