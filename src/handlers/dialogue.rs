use std::sync::{Arc, MutexGuard};
use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Appointment, ChatMessage, ConversationContext};
use crate::services::assistant::{self, ChatInput};
use crate::services::booking::{create_appointment, suggest_alternatives, BookingError};
use crate::services::dialogue::{DialogueState, DialogueStep, SchedulingData, SchedulingDialogue};
use crate::services::policy;
use crate::state::{AppState, DialogueSessions};

const BUSY_REPLY: &str = "Só um instante, ainda estou concluindo seu agendamento.";
const STUCK_REPLY: &str =
    "O agendamento demorou mais que o esperado. Reinicie a conversa para tentar de novo.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueRequest {
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Enter the free-form scheduling step right away.
    #[serde(default)]
    pub start: bool,
    #[serde(default)]
    pub context: ConversationContext,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueResponse {
    session_id: String,
    reply: Option<String>,
    state: Option<DialogueState>,
    data: SchedulingData,
    busy: bool,
    stuck: bool,
    /// Set when the general assistant answered instead of the dialogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<ConversationContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    appointment: Option<Appointment>,
}

impl DialogueResponse {
    fn snapshot(session_id: String, dialogue: &SchedulingDialogue, reply: Option<String>) -> Self {
        Self {
            session_id,
            reply,
            state: dialogue.state(),
            data: dialogue.data().clone(),
            busy: dialogue.is_busy(),
            stuck: dialogue.is_stuck(Instant::now()),
            context: None,
            appointment: None,
        }
    }
}

fn sessions(state: &AppState) -> Result<MutexGuard<'_, DialogueSessions>, AppError> {
    state
        .dialogues
        .lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("dialogue sessions mutex poisoned")))
}

// POST /api/chat/dialogue
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DialogueRequest>,
) -> Result<Json<DialogueResponse>, AppError> {
    if !body.start && body.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let session_id = body
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let today = Local::now().date_naive();
    let now = Instant::now();

    // Only dialogues still collecting or booking go back into the store.
    let (step, snapshot) = {
        let mut sessions = sessions(&state)?;
        let mut dialogue = sessions.take(&session_id);
        let step = if dialogue.is_stuck(now) {
            DialogueStep::Reply(STUCK_REPLY.to_string())
        } else if body.start {
            DialogueStep::Reply(dialogue.start())
        } else {
            dialogue.on_user_submit(&body.message, today, now)
        };
        let snapshot = DialogueResponse::snapshot(session_id.clone(), &dialogue, None);
        sessions.put(session_id.clone(), dialogue, now);
        (step, snapshot)
    };

    match step {
        DialogueStep::Reply(text) => Ok(Json(DialogueResponse {
            reply: Some(text),
            ..snapshot
        })),
        DialogueStep::Busy => Ok(Json(DialogueResponse {
            reply: Some(BUSY_REPLY.to_string()),
            ..snapshot
        })),
        DialogueStep::Delegate => {
            let input = ChatInput {
                message: body.message,
                context: body.context,
                history: body.history,
            };
            let output = assistant::process_message(&state, input, today).await;

            Ok(Json(DialogueResponse {
                reply: Some(output.reply),
                context: Some(output.context),
                appointment: output.appointment,
                ..snapshot
            }))
        }
        DialogueStep::Book(new) => {
            let settings = state.settings();
            let (date, time) = (new.scheduled_date, new.scheduled_time.clone());

            let result = create_appointment(state.store.as_ref(), new, settings.opening_hours.as_ref());
            let alternatives = match &result {
                Err(BookingError::SlotTaken | BookingError::OutsideOpeningHours { .. }) => {
                    suggest_alternatives(
                        state.store.as_ref(),
                        date,
                        &time,
                        settings.opening_hours.as_ref(),
                        2,
                    )
                }
                _ => vec![],
            };
            let appointment = result.as_ref().ok().cloned();
            if let Err(e) = &result {
                tracing::warn!(session_id = %session_id, error = %e, "dialogue booking failed");
            }

            let mut sessions = sessions(&state)?;
            let mut dialogue = sessions.take(&session_id);
            let text =
                dialogue.complete_booking(result, &alternatives, &policy::handoff_message(&settings));
            let mut response = DialogueResponse::snapshot(session_id.clone(), &dialogue, Some(text));
            response.appointment = appointment;
            sessions.put(session_id, dialogue, Instant::now());
            Ok(Json(response))
        }
    }
}

// GET /api/chat/dialogue/:session_id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<DialogueResponse>, AppError> {
    let sessions = sessions(&state)?;
    let dialogue = sessions
        .get(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("dialogue session {session_id}")))?;
    Ok(Json(DialogueResponse::snapshot(session_id.clone(), dialogue, None)))
}

// POST /api/chat/dialogue/:session_id/reset
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<DialogueResponse>, AppError> {
    let removed = sessions(&state)?.remove(&session_id);
    tracing::info!(session_id = %session_id, removed, "dialogue session reset");
    Ok(Json(DialogueResponse::snapshot(
        session_id,
        &SchedulingDialogue::new(),
        None,
    )))
}
