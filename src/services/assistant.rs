//! Server-side chat entry point: one visitor message in, one reply out.
//!
//! Processing faults never escape as errors. Every failure ends up as a chat
//! reply, usually the academy's handoff text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{
    AcademySettings, Appointment, AppointmentIntent, AppointmentRequest, ChatMessage,
    ConversationContext, MissingField, NewAppointment, Slot,
};
use crate::services::ai::intent::KeywordClassifier;
use crate::services::ai::prompt::build_system_prompt;
use crate::services::booking::{create_appointment, suggest_alternatives, BookingError};
use crate::services::composer::{ComposeOptions, Composer};
use crate::services::extract::{
    extract_bare_name, extract_email, extract_name, extract_phone, FieldExtractor, RuleExtractor,
};
use crate::services::policy::{self, GateDecision};
use crate::state::AppState;

const ALTERNATIVES_OFFERED: usize = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatInput {
    pub message: String,
    #[serde(default)]
    pub context: ConversationContext,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutput {
    pub reply: String,
    pub context: ConversationContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
}

pub async fn process_message(state: &AppState, input: ChatInput, today: NaiveDate) -> ChatOutput {
    let ChatInput {
        message,
        mut context,
        history,
    } = input;
    let text = message.trim();
    let settings = state.settings();

    if let Some(field) = context.pending_field.take() {
        fill_pending_field(field, text, &mut context);
    }

    let options = ComposeOptions {
        default_time_satisfies: state.config.default_time_satisfies,
    };
    let composer = Composer::new(&KeywordClassifier, &RuleExtractor, options);
    let request = composer.compose(text, &context, today);
    let decision = policy::decide(
        settings.allow_scheduling,
        request.has_appointment_intent,
        request.confidence,
    );

    tracing::info!(
        ?decision,
        has_intent = request.has_appointment_intent,
        confidence = request.confidence,
        missing = ?request.missing_info,
        "chat message classified"
    );

    match decision {
        GateDecision::Handoff => {
            context.appointment_intent = None;
            reply(policy::handoff_message(&settings), context)
        }
        GateDecision::Proceed => proceed(state, &settings, text, request, context),
        GateDecision::Decline => {
            let answer = fallback_chat(state, &settings, history, text, today).await;
            reply(answer, context)
        }
    }
}

fn reply(text: String, context: ConversationContext) -> ChatOutput {
    ChatOutput {
        reply: text,
        context,
        appointment: None,
    }
}

/// A bare answer to the question asked last turn, e.g. just "Carlos".
fn fill_pending_field(field: MissingField, text: &str, context: &mut ConversationContext) {
    let user = &mut context.user_info;
    match field {
        MissingField::Name => {
            let name = extract_name(text).or_else(|| extract_bare_name(text));
            user.merge(name, None, None);
        }
        MissingField::Phone => user.merge(None, extract_phone(text), None),
        MissingField::Email => user.merge(None, None, extract_email(text)),
        // The composer reads these from the ongoing request.
        MissingField::Date | MissingField::Time => {}
    }
}

fn proceed(
    state: &AppState,
    settings: &AcademySettings,
    text: &str,
    request: AppointmentRequest,
    mut context: ConversationContext,
) -> ChatOutput {
    context.user_info.merge(
        request.name.clone(),
        RuleExtractor.phone(text),
        RuleExtractor.email(text),
    );
    context.appointment_intent = Some(AppointmentIntent {
        class_type: request.class_type.clone(),
        date: request.date,
        time: match &request.time {
            Slot::Extracted(t) => Some(t.clone()),
            Slot::Defaulted(_) | Slot::Missing => None,
        },
        confidence: request.confidence,
    });

    if let Some(field) = policy::next_missing_field(&request, &context.user_info) {
        context.pending_field = Some(field);
        let question = policy::question_for(field, context.user_info.name.as_deref());
        return reply(question, context);
    }

    let (Some(name), Some(phone), Some(email), Some(date), Some(time)) = (
        context.user_info.name.clone(),
        context.user_info.phone.clone(),
        context.user_info.email.clone(),
        request.date,
        request.time.value().cloned(),
    ) else {
        // next_missing_field found nothing, so every field is present
        return reply(policy::handoff_message(settings), context);
    };

    let new = NewAppointment {
        name,
        phone,
        email,
        class_type: request.class_type,
        scheduled_date: date,
        scheduled_time: time.clone(),
        notes: Some("Aula experimental agendada pelo assistente".to_string()),
    };

    match create_appointment(state.store.as_ref(), new, settings.opening_hours.as_ref()) {
        Ok(appt) => {
            context.appointment_intent = None;
            let text = format!(
                "Prontinho, {}! Sua aula experimental de {} está agendada para {} às {}. \
                 Adicione à sua agenda: /calendar/{}.ics",
                first_name(&appt.name),
                appt.class_type,
                appt.scheduled_date.format("%d/%m/%Y"),
                appt.scheduled_time,
                appt.id,
            );
            ChatOutput {
                reply: text,
                context,
                appointment: Some(appt),
            }
        }
        Err(
            e @ (BookingError::SlotTaken
            | BookingError::OutsideOpeningHours { .. }
            | BookingError::InvalidSlot(_)),
        ) => {
            let alternatives = suggest_alternatives(
                state.store.as_ref(),
                date,
                &time,
                settings.opening_hours.as_ref(),
                ALTERNATIVES_OFFERED,
            );
            if let Some(intent) = context.appointment_intent.as_mut() {
                intent.time = None;
            }
            context.pending_field = Some(MissingField::Time);

            let text = if alternatives.is_empty() {
                format!("{e} Qual outro dia ou horário fica bom para você?")
            } else {
                format!(
                    "{e} Nesse dia ainda temos {}. Qual horário prefere?",
                    alternatives.join(" ou ")
                )
            };
            reply(text, context)
        }
        Err(e) => {
            tracing::error!(error = %e, "booking collaborator failed");
            let text = format!(
                "Não consegui concluir seu agendamento: {e}. {}",
                policy::handoff_message(settings)
            );
            reply(text, context)
        }
    }
}

async fn fallback_chat(
    state: &AppState,
    settings: &AcademySettings,
    mut history: Vec<ChatMessage>,
    text: &str,
    today: NaiveDate,
) -> String {
    let catalog = state.catalog(today);
    let system_prompt = build_system_prompt(settings, &catalog);

    history.push(ChatMessage {
        role: "user".to_string(),
        content: text.to_string(),
    });

    match state.llm.chat(&system_prompt, &history).await {
        Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
        Ok(_) => {
            tracing::warn!("LLM returned an empty reply, using fallback response");
            policy::handoff_message(settings)
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM call failed, using fallback response");
            policy::handoff_message(settings)
        }
    }
}

fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::config::AppConfig;
    use crate::db::{self, queries};
    use crate::models::SchedulingPolicy;
    use crate::services::ai::LlmProvider;

    struct CannedLlm(Option<&'static str>);

    #[async_trait]
    impl LlmProvider for CannedLlm {
        async fn chat(&self, _: &str, _: &[ChatMessage]) -> anyhow::Result<String> {
            match self.0 {
                Some(answer) => Ok(answer.to_string()),
                None => anyhow::bail!("model offline"),
            }
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn state_with(policy: SchedulingPolicy, llm: CannedLlm) -> AppState {
        let conn = db::init_db(":memory:").unwrap();
        let settings = AcademySettings {
            academy_name: "Iron Gym".to_string(),
            whatsapp_number: "5511988887777".to_string(),
            allow_scheduling: policy,
            fallback_response: "Fale com a {academy}: {whatsapp}".to_string(),
            ..AcademySettings::default()
        };
        queries::save_settings(&conn, &settings).unwrap();

        let config = AppConfig {
            port: 0,
            database_url: ":memory:".to_string(),
            admin_token: "test".to_string(),
            llm_provider: "mock".to_string(),
            ollama_url: String::new(),
            ollama_model: String::new(),
            groq_api_key: String::new(),
            groq_model: String::new(),
            default_time_satisfies: true,
        };
        AppState::new(Arc::new(Mutex::new(conn)), config, Box::new(llm))
    }

    async fn send(state: &AppState, message: &str, context: ConversationContext) -> ChatOutput {
        let input = ChatInput {
            message: message.to_string(),
            context,
            history: vec![],
        };
        process_message(state, input, today()).await
    }

    #[tokio::test]
    async fn test_off_mode_hands_off_without_questions() {
        let state = state_with(SchedulingPolicy::Off, CannedLlm(Some("oi")));
        // 0.4 + 0.3 (date) = 0.7
        let out = send(&state, "quero agendar amanhã", ConversationContext::default()).await;

        assert_eq!(out.reply, "Fale com a Iron Gym: https://wa.me/5511988887777");
        assert!(out.context.pending_field.is_none());
        assert!(out.context.appointment_intent.is_none());
    }

    #[tokio::test]
    async fn test_always_mode_collects_then_books() {
        let state = state_with(SchedulingPolicy::Always, CannedLlm(Some("oi")));

        let out = send(
            &state,
            "quero agendar musculação amanhã às 14h, meu nome é Carlos",
            ConversationContext::default(),
        )
        .await;
        assert_eq!(out.context.pending_field, Some(MissingField::Phone));
        assert!(out.reply.starts_with("Carlos, "));

        let out = send(&state, "11 99999-8888", out.context).await;
        assert_eq!(out.context.pending_field, Some(MissingField::Email));
        assert_eq!(out.context.user_info.phone.as_deref(), Some("11999998888"));

        let out = send(&state, "carlos@example.com", out.context).await;
        let appt = out.appointment.expect("appointment booked");
        assert_eq!(appt.scheduled_date.format("%Y-%m-%d").to_string(), "2025-06-17");
        assert_eq!(appt.scheduled_time, "14:00");
        assert_eq!(appt.class_type, "Musculação");
        assert!(out.reply.contains("17/06/2025"));
        assert!(out.context.appointment_intent.is_none());
    }

    #[tokio::test]
    async fn test_bare_name_reply_fills_pending_field() {
        let state = state_with(SchedulingPolicy::Always, CannedLlm(Some("oi")));

        let out = send(&state, "quero agendar uma aula", ConversationContext::default()).await;
        assert_eq!(out.context.pending_field, Some(MissingField::Name));

        let out = send(&state, "Carlos Souza", out.context).await;
        assert_eq!(out.context.user_info.name.as_deref(), Some("Carlos Souza"));
        assert_eq!(out.context.pending_field, Some(MissingField::Date));
    }

    #[tokio::test]
    async fn test_on_intent_below_threshold_falls_back_to_llm() {
        let state = state_with(SchedulingPolicy::OnIntent, CannedLlm(Some("Temos aulas todos os dias!")));
        let out = send(&state, "quero conhecer a academia", ConversationContext::default()).await;

        assert_eq!(out.reply, "Temos aulas todos os dias!");
        assert!(out.context.appointment_intent.is_none());
    }

    #[tokio::test]
    async fn test_llm_failure_uses_fallback_response() {
        let state = state_with(SchedulingPolicy::OnIntent, CannedLlm(None));
        let out = send(&state, "Qual o valor da mensalidade?", ConversationContext::default()).await;

        assert_eq!(out.reply, "Fale com a Iron Gym: https://wa.me/5511988887777");
    }

    #[tokio::test]
    async fn test_known_fields_are_not_overwritten() {
        let state = state_with(SchedulingPolicy::Always, CannedLlm(Some("oi")));
        let mut ctx = ConversationContext::default();
        ctx.user_info.name = Some("Ana".to_string());
        ctx.user_info.phone = Some("21988887777".to_string());

        let out = send(&state, "quero agendar amanhã, meu nome é Carlos, tel 11999998888", ctx).await;
        assert_eq!(out.context.user_info.name.as_deref(), Some("Ana"));
        assert_eq!(out.context.user_info.phone.as_deref(), Some("21988887777"));
    }

    #[tokio::test]
    async fn test_taken_slot_offers_alternatives() {
        let state = state_with(SchedulingPolicy::Always, CannedLlm(Some("oi")));
        let mut ctx = ConversationContext::default();
        ctx.user_info.phone = Some("11999998888".to_string());
        ctx.user_info.email = Some("carlos@example.com".to_string());

        let first = send(&state, "quero agendar amanhã às 14h, meu nome é Carlos", ctx.clone()).await;
        assert!(first.appointment.is_some());

        let mut other = ctx;
        other.user_info.name = Some("Ana".to_string());
        let second = send(&state, "quero agendar amanhã às 14h", other).await;
        assert!(second.appointment.is_none());
        assert!(second.reply.contains("já está ocupado"));
        assert!(second.reply.contains("15:00 ou 16:00"));
        assert_eq!(second.context.pending_field, Some(MissingField::Time));
    }
}
