//! Decides what the assistant does with a scheduling request.
//!
//! `onIntent` books on its own only above 0.8; `off` hands a visitor to a
//! human above 0.6.

use serde::Serialize;

use crate::models::{AcademySettings, AppointmentRequest, MissingField, SchedulingPolicy, UserInfo};

pub const ON_INTENT_THRESHOLD: f32 = 0.8;
pub const HANDOFF_THRESHOLD: f32 = 0.6;

const DEFAULT_HANDOFF_TEMPLATE: &str =
    "Para agendar sua aula, fale com a equipe da {academy} pelo WhatsApp {whatsapp}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Collect the remaining fields and book automatically.
    Proceed,
    /// Send the visitor to the human channel right away.
    Handoff,
    /// Not a scheduling turn for automation; answer conversationally.
    Decline,
}

pub fn decide(policy: SchedulingPolicy, has_intent: bool, confidence: f32) -> GateDecision {
    match policy {
        SchedulingPolicy::OnIntent if has_intent && confidence > ON_INTENT_THRESHOLD => {
            GateDecision::Proceed
        }
        SchedulingPolicy::Always if has_intent => GateDecision::Proceed,
        SchedulingPolicy::Off if has_intent && confidence > HANDOFF_THRESHOLD => {
            GateDecision::Handoff
        }
        _ => GateDecision::Decline,
    }
}

/// Fields are demanded one at a time in this order.
pub fn next_missing_field(request: &AppointmentRequest, user: &UserInfo) -> Option<MissingField> {
    [MissingField::Name, MissingField::Date, MissingField::Time]
        .into_iter()
        .find(|f| request.missing_info.contains(f))
        .or_else(|| user.phone.is_none().then_some(MissingField::Phone))
        .or_else(|| user.email.is_none().then_some(MissingField::Email))
}

pub fn question_for(field: MissingField, name: Option<&str>) -> String {
    let greeting = name
        .and_then(|n| n.split_whitespace().next())
        .map(|first| format!("{first}, "))
        .unwrap_or_default();

    match field {
        MissingField::Name => "Ótimo! Para agendar, qual é o seu nome?".to_string(),
        MissingField::Date => format!(
            "{greeting}qual dia você prefere? Pode ser amanhã, segunda, sexta..."
        ),
        MissingField::Time => format!("{greeting}qual horário fica melhor para você?"),
        MissingField::Phone => format!("{greeting}qual é o seu telefone com DDD?"),
        MissingField::Email => format!("{greeting}qual é o seu e-mail para enviarmos a confirmação?"),
    }
}

/// Renders `fallback_response`, substituting `{whatsapp}` and `{academy}`.
pub fn handoff_message(settings: &AcademySettings) -> String {
    let template = if settings.fallback_response.trim().is_empty() {
        DEFAULT_HANDOFF_TEMPLATE
    } else {
        settings.fallback_response.as_str()
    };

    let whatsapp = if settings.whatsapp_number.is_empty() {
        "da recepção".to_string()
    } else {
        format!("https://wa.me/{}", settings.whatsapp_number)
    };

    template
        .replace("{whatsapp}", &whatsapp)
        .replace("{academy}", &settings.academy_name)
}
