use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Local;

use crate::errors::AppError;
use crate::services::assistant::{self, ChatInput, ChatOutput};
use crate::state::AppState;

// POST /api/chat/message
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatOutput>, AppError> {
    if input.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let today = Local::now().date_naive();
    Ok(Json(assistant::process_message(&state, input, today).await))
}
