//! Turn-by-turn trial-class booking dialogue used by the site chat widget.
//!
//! States run `smart → name → phone → datetime → confirm`, skipping any field
//! the visitor already gave. Cancel words drop back to idle from anywhere.

use std::time::{Duration, Instant};

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{Appointment, NewAppointment};
use crate::services::ai::intent::{IntentClassifier, KeywordClassifier};
use crate::services::booking::BookingError;
use crate::services::extract::{
    digits_only, extract_class_type, extract_email, extract_name, extract_phone, extract_time,
    extract_weekday, next_weekday, weekday_from_label, weekday_label, DEFAULT_CLASS_TYPE,
};

/// A booking call outstanding longer than this is reported as stuck.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(30);

const SYNTHETIC_EMAIL_DOMAIN: &str = "experimental.gymdesk.local";

const CANCEL_PHRASES: &[&str] = &[
    "cancelar",
    "cancela",
    "agora não",
    "agora nao",
    "mais tarde",
    "outra hora",
    "deixa pra depois",
];

const AFFIRMATIVE_WORDS: &[&str] = &[
    "sim", "confirmo", "confirmar", "confirma", "correto", "certo", "isso",
];

const NEGATION_WORDS: &[&str] = &["não", "nao", "errado", "errada", "incorreto"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    Smart,
    Name,
    Phone,
    DateTime,
    Confirm,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingData {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Weekday label such as "Sábado".
    pub date: Option<String>,
    pub time: Option<String>,
    pub class_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogueStep {
    Reply(String),
    /// Submit this to the booking bridge, then call `complete_booking`.
    Book(NewAppointment),
    /// Not a scheduling turn; hand the text to the general assistant.
    Delegate,
    /// A booking call is still outstanding; input is ignored.
    Busy,
}

#[derive(Debug, Default)]
pub struct SchedulingDialogue {
    state: Option<DialogueState>,
    data: SchedulingData,
    awaiting_since: Option<Instant>,
}

impl SchedulingDialogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<DialogueState> {
        self.state
    }

    pub fn data(&self) -> &SchedulingData {
        &self.data
    }

    pub fn is_busy(&self) -> bool {
        self.awaiting_since.is_some()
    }

    /// Collecting fields or waiting on a booking.
    pub fn is_active(&self) -> bool {
        self.state.is_some() || self.is_busy()
    }

    pub fn is_stuck(&self, now: Instant) -> bool {
        self.awaiting_since
            .is_some_and(|since| now.saturating_duration_since(since) >= WATCHDOG_TIMEOUT)
    }

    /// Back to idle with nothing collected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Explicit entry into the free-form step (e.g. the "agendar" button).
    pub fn start(&mut self) -> String {
        self.reset();
        self.state = Some(DialogueState::Smart);
        "Vamos agendar sua aula experimental! Me conte seu nome, o dia da semana e o horário que prefere."
            .to_string()
    }

    pub fn on_user_submit(&mut self, text: &str, today: NaiveDate, now: Instant) -> DialogueStep {
        if self.is_busy() {
            return DialogueStep::Busy;
        }

        let text = text.trim();
        let Some(state) = self.state else {
            if text.is_empty() || !KeywordClassifier.classify(text).has_intent {
                return DialogueStep::Delegate;
            }
            self.state = Some(DialogueState::Smart);
            self.absorb(text);
            return DialogueStep::Reply(self.advance());
        };

        if text.is_empty() {
            return DialogueStep::Reply(self.prompt_for(state));
        }

        if is_cancel(text) {
            self.reset();
            return DialogueStep::Reply(
                "Tudo bem, cancelei o agendamento. Se quiser retomar, é só chamar!".to_string(),
            );
        }

        match state {
            DialogueState::Smart => {
                self.absorb(text);
                DialogueStep::Reply(self.advance())
            }
            DialogueState::Name => {
                let name = extract_name(text).unwrap_or_else(|| text.to_string());
                self.data.name = Some(name);
                DialogueStep::Reply(self.advance())
            }
            DialogueState::Phone => {
                let digits = digits_only(text);
                if !(10..=11).contains(&digits.len()) {
                    return DialogueStep::Reply(
                        "Esse telefone não parece válido. Envie o número com DDD, por exemplo 11 99999-8888."
                            .to_string(),
                    );
                }
                self.data.phone = Some(digits);
                DialogueStep::Reply(self.advance())
            }
            DialogueState::DateTime => match (extract_weekday(text), extract_time(text)) {
                (Some(day), Some(time)) => {
                    self.data.date = Some(weekday_label(day).to_string());
                    self.data.time = Some(time);
                    DialogueStep::Reply(self.advance())
                }
                _ => DialogueStep::Reply(
                    "Não entendi o dia e o horário. Tente algo como \"sexta às 18h\" ou \"sábado de manhã\"."
                        .to_string(),
                ),
            },
            DialogueState::Confirm => {
                if is_affirmative(text) {
                    self.finalize(today, now)
                } else {
                    let class_type = self.data.class_type.take();
                    let email = self.data.email.take();
                    self.data = SchedulingData {
                        class_type,
                        email,
                        ..SchedulingData::default()
                    };
                    self.state = Some(DialogueState::Name);
                    DialogueStep::Reply("Sem problemas, vamos corrigir. Qual é o seu nome?".to_string())
                }
            }
        }
    }

    /// Feeds the outcome of the booking call back into the dialogue.
    pub fn complete_booking(
        &mut self,
        result: Result<Appointment, BookingError>,
        alternatives: &[String],
        handoff: &str,
    ) -> String {
        self.awaiting_since = None;

        match result {
            Ok(appt) => {
                let label = self.data.date.clone().unwrap_or_default();
                self.reset();
                format!(
                    "Prontinho, {}! Sua aula de {} está agendada para {} ({}) às {}. Te esperamos!",
                    first_name(&appt.name),
                    appt.class_type,
                    label,
                    appt.scheduled_date.format("%d/%m"),
                    appt.scheduled_time,
                )
            }
            Err(e @ (BookingError::SlotTaken | BookingError::OutsideOpeningHours { .. })) => {
                let label = self.data.date.take().unwrap_or_default();
                self.data.time = None;
                self.state = Some(DialogueState::DateTime);
                if alternatives.is_empty() {
                    format!("{e} Qual outro dia e horário você prefere?")
                } else {
                    format!(
                        "{e} Ainda temos {} {}. Qual outro dia e horário você prefere?",
                        alternatives.join(" ou "),
                        on_day(&label),
                    )
                }
            }
            Err(e) => {
                self.state = Some(DialogueState::Confirm);
                format!(
                    "Não consegui concluir o agendamento: {e}. Responda \"sim\" para tentar de novo. {handoff}"
                )
            }
        }
    }

    fn absorb(&mut self, text: &str) {
        let data = &mut self.data;
        if data.name.is_none() {
            data.name = extract_name(text);
        }
        if data.phone.is_none() {
            data.phone = extract_phone(text).filter(|p| (10..=11).contains(&p.len()));
        }
        if data.email.is_none() {
            data.email = extract_email(text);
        }
        if data.class_type.is_none() {
            data.class_type = extract_class_type(text);
        }
        if data.date.is_none() || data.time.is_none() {
            if let (Some(day), Some(time)) = (extract_weekday(text), extract_time(text)) {
                data.date = Some(weekday_label(day).to_string());
                data.time = Some(time);
            }
        }
    }

    /// Moves to the first state whose field is still empty and returns its prompt.
    fn advance(&mut self) -> String {
        let next = if self.data.name.is_none() {
            DialogueState::Name
        } else if self.data.phone.is_none() {
            DialogueState::Phone
        } else if self.data.date.is_none() || self.data.time.is_none() {
            DialogueState::DateTime
        } else {
            DialogueState::Confirm
        };
        self.state = Some(next);
        self.prompt_for(next)
    }

    fn prompt_for(&self, state: DialogueState) -> String {
        match state {
            DialogueState::Smart => {
                "Me conte seu nome, o dia da semana e o horário que prefere.".to_string()
            }
            DialogueState::Name => "Qual é o seu nome?".to_string(),
            DialogueState::Phone => "Qual é o seu telefone com DDD?".to_string(),
            DialogueState::DateTime => {
                "Qual dia da semana e horário você prefere? Ex.: \"terça às 19h\".".to_string()
            }
            DialogueState::Confirm => format!(
                "Confirma sua aula de {} {} às {}, em nome de {} (tel. {})? Responda \"sim\" para confirmar.",
                self.data.class_type.as_deref().unwrap_or(DEFAULT_CLASS_TYPE),
                on_day(self.data.date.as_deref().unwrap_or_default()),
                self.data.time.as_deref().unwrap_or_default(),
                self.data.name.as_deref().unwrap_or_default(),
                self.data.phone.as_deref().unwrap_or_default(),
            ),
        }
    }

    fn finalize(&mut self, today: NaiveDate, now: Instant) -> DialogueStep {
        let (Some(name), Some(phone), Some(label), Some(time)) = (
            self.data.name.clone(),
            self.data.phone.clone(),
            self.data.date.clone(),
            self.data.time.clone(),
        ) else {
            return DialogueStep::Reply(self.advance());
        };

        let Some(weekday) = weekday_from_label(&label) else {
            self.data.date = None;
            return DialogueStep::Reply(self.advance());
        };

        let email = self
            .data
            .email
            .clone()
            .unwrap_or_else(|| format!("{phone}@{SYNTHETIC_EMAIL_DOMAIN}"));

        self.awaiting_since = Some(now);

        DialogueStep::Book(NewAppointment {
            name,
            phone,
            email,
            class_type: self
                .data
                .class_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CLASS_TYPE.to_string()),
            scheduled_date: next_weekday(today, weekday, false),
            scheduled_time: time,
            notes: Some("Aula experimental agendada pelo chat do site".to_string()),
        })
    }
}

fn is_cancel(text: &str) -> bool {
    let lower = text.to_lowercase();
    CANCEL_PHRASES.iter().any(|p| lower.contains(p))
}

/// "não está correto" is a refusal even though it contains "correto".
fn is_affirmative(text: &str) -> bool {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
    !words.iter().any(|w| NEGATION_WORDS.contains(w))
        && words.iter().any(|w| AFFIRMATIVE_WORDS.contains(w))
}

/// "no Sábado", "na Terça-feira".
fn on_day(label: &str) -> String {
    match weekday_from_label(label) {
        Some(Weekday::Sat | Weekday::Sun) => format!("no {label}"),
        _ => format!("na {label}"),
    }
}

fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::AppointmentStatus;

    // 2025-06-16 is a Monday
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn submit(d: &mut SchedulingDialogue, text: &str) -> DialogueStep {
        d.on_user_submit(text, today(), Instant::now())
    }

    fn booked(new: &NewAppointment) -> Appointment {
        Appointment {
            id: "appt-1".to_string(),
            name: new.name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            class_type: new.class_type.clone(),
            scheduled_date: new.scheduled_date,
            scheduled_time: new.scheduled_time.clone(),
            status: AppointmentStatus::Pending,
            notes: new.notes.clone(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_idle_without_intent_delegates() {
        let mut d = SchedulingDialogue::new();
        assert_eq!(submit(&mut d, "Qual o preço do plano anual?"), DialogueStep::Delegate);
        assert_eq!(d.state(), None);
    }

    #[test]
    fn test_step_by_step_flow() {
        let mut d = SchedulingDialogue::new();
        d.start();
        assert_eq!(d.state(), Some(DialogueState::Smart));

        submit(&mut d, "oi");
        assert_eq!(d.state(), Some(DialogueState::Name));

        submit(&mut d, "Carlos");
        assert_eq!(d.state(), Some(DialogueState::Phone));

        submit(&mut d, "(11) 99999-8888");
        assert_eq!(d.state(), Some(DialogueState::DateTime));

        let step = submit(&mut d, "sábado de manhã");
        assert_eq!(d.state(), Some(DialogueState::Confirm));
        let DialogueStep::Reply(summary) = step else { panic!("expected reply") };
        assert!(summary.contains("Sábado"));
        assert!(summary.contains("09:00"));

        let DialogueStep::Book(new) = submit(&mut d, "Sim, pode confirmar") else {
            panic!("expected booking")
        };
        assert_eq!(new.name, "Carlos");
        assert_eq!(new.phone, "11999998888");
        assert_eq!(new.scheduled_date, NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());
        assert_eq!(new.scheduled_time, "09:00");
        assert_eq!(new.email, "11999998888@experimental.gymdesk.local");
        assert_eq!(new.class_type, DEFAULT_CLASS_TYPE);
    }

    #[test]
    fn test_smart_fills_everything_at_once() {
        let mut d = SchedulingDialogue::new();
        submit(
            &mut d,
            "Quero agendar pilates, meu nome é Ana, telefone 21 98888-7777, quinta às 19h",
        );
        assert_eq!(d.state(), Some(DialogueState::Confirm));
        assert_eq!(d.data().name.as_deref(), Some("Ana"));
        assert_eq!(d.data().phone.as_deref(), Some("21988887777"));
        assert_eq!(d.data().date.as_deref(), Some("Quinta-feira"));
        assert_eq!(d.data().time.as_deref(), Some("19:00"));
        assert_eq!(d.data().class_type.as_deref(), Some("Pilates"));
    }

    #[test]
    fn test_short_phone_rejected_and_state_kept() {
        let mut d = SchedulingDialogue::new();
        d.start();
        submit(&mut d, "Carlos");
        submit(&mut d, "Carlos");
        assert_eq!(d.state(), Some(DialogueState::Phone));

        let step = submit(&mut d, "11999");
        assert_eq!(d.state(), Some(DialogueState::Phone));
        assert!(matches!(step, DialogueStep::Reply(r) if r.contains("não parece válido")));
        assert!(d.data().phone.is_none());
    }

    #[test]
    fn test_unparseable_datetime_reprompts() {
        let mut d = SchedulingDialogue::new();
        submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888");
        assert_eq!(d.state(), Some(DialogueState::DateTime));

        submit(&mut d, "amanhã");
        assert_eq!(d.state(), Some(DialogueState::DateTime));
        submit(&mut d, "segunda");
        assert_eq!(d.state(), Some(DialogueState::DateTime));
        submit(&mut d, "segunda às 7h");
        assert_eq!(d.state(), Some(DialogueState::Confirm));
    }

    #[test]
    fn test_weekday_resolves_strictly_future() {
        let mut d = SchedulingDialogue::new();
        submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888, segunda às 7h");
        let DialogueStep::Book(new) = submit(&mut d, "sim") else { panic!("expected booking") };
        // today is Monday; "segunda" is next week's
        assert_eq!(new.scheduled_date, NaiveDate::from_ymd_opt(2025, 6, 23).unwrap());
    }

    #[test]
    fn test_non_affirmative_confirm_restarts_at_name() {
        let mut d = SchedulingDialogue::new();
        submit(&mut d, "quero agendar yoga, meu nome é Carlos, 11999998888, terça às 18h");
        assert_eq!(d.state(), Some(DialogueState::Confirm));

        submit(&mut d, "não, errei o nome");
        assert_eq!(d.state(), Some(DialogueState::Name));
        assert!(d.data().name.is_none());
        assert!(d.data().phone.is_none());
        assert_eq!(d.data().class_type.as_deref(), Some("Yoga"));
    }

    #[test]
    fn test_negated_confirmation_does_not_book() {
        let mut d = SchedulingDialogue::new();
        submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888, terça às 18h");
        assert_eq!(d.state(), Some(DialogueState::Confirm));

        for refusal in ["não está correto", "Nao, isso está errado"] {
            let step = submit(&mut d, refusal);
            assert!(matches!(step, DialogueStep::Reply(_)));
            assert_eq!(d.state(), Some(DialogueState::Name));
            assert!(!d.is_busy());

            submit(&mut d, "Carlos");
            submit(&mut d, "11999998888");
            submit(&mut d, "terça às 18h");
            assert_eq!(d.state(), Some(DialogueState::Confirm));
        }

        assert!(matches!(submit(&mut d, "sim, correto"), DialogueStep::Book(_)));
    }

    #[test]
    fn test_weekend_replies_use_masculine_article() {
        let mut d = SchedulingDialogue::new();
        let DialogueStep::Reply(summary) =
            submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888, sábado às 10h")
        else {
            panic!("expected reply")
        };
        assert!(summary.contains("no Sábado às 10:00"));

        submit(&mut d, "sim");
        let reply = d.complete_booking(Err(BookingError::SlotTaken), &["11:00".to_string()], "");
        assert!(reply.contains("Ainda temos 11:00 no Sábado."));
    }

    #[test]
    fn test_weekday_replies_use_feminine_article() {
        let mut d = SchedulingDialogue::new();
        let DialogueStep::Reply(summary) =
            submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888, terça às 18h")
        else {
            panic!("expected reply")
        };
        assert!(summary.contains("na Terça-feira às 18:00"));
    }

    #[test]
    fn test_cancel_from_any_state() {
        let mut d = SchedulingDialogue::new();
        d.start();
        submit(&mut d, "Carlos");
        let step = submit(&mut d, "agora não, obrigado");
        assert_eq!(d.state(), None);
        assert_eq!(d.data(), &SchedulingData::default());
        assert!(matches!(step, DialogueStep::Reply(r) if r.contains("cancelei")));
    }

    #[test]
    fn test_busy_while_booking_outstanding() {
        let mut d = SchedulingDialogue::new();
        submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888, sexta às 18h");
        let DialogueStep::Book(new) = submit(&mut d, "sim") else { panic!("expected booking") };

        assert!(d.is_busy());
        assert_eq!(submit(&mut d, "alô?"), DialogueStep::Busy);

        let reply = d.complete_booking(Ok(booked(&new)), &[], "");
        assert!(reply.contains("Prontinho, Carlos"));
        assert!(reply.contains("20/06"));
        assert!(!d.is_busy());
        assert_eq!(d.state(), None);
    }

    #[test]
    fn test_watchdog_reports_stuck_after_timeout() {
        let mut d = SchedulingDialogue::new();
        let start = Instant::now();
        d.on_user_submit("quero agendar, meu nome é Carlos, 11999998888, sexta às 18h", today(), start);
        d.on_user_submit("sim", today(), start);

        assert!(!d.is_stuck(start + Duration::from_secs(29)));
        assert!(d.is_stuck(start + WATCHDOG_TIMEOUT));

        d.reset();
        assert!(!d.is_busy());
        assert_eq!(d.state(), None);
    }

    #[test]
    fn test_conflict_returns_to_datetime_with_alternatives() {
        let mut d = SchedulingDialogue::new();
        submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888, sexta às 18h");
        submit(&mut d, "sim");

        let reply = d.complete_booking(
            Err(BookingError::SlotTaken),
            &["19:00".to_string(), "20:00".to_string()],
            "",
        );
        assert_eq!(d.state(), Some(DialogueState::DateTime));
        assert!(reply.contains("já está ocupado"));
        assert!(reply.contains("19:00 ou 20:00"));
        assert_eq!(d.data().name.as_deref(), Some("Carlos"));
    }

    #[test]
    fn test_backend_error_surfaced_with_handoff() {
        let mut d = SchedulingDialogue::new();
        submit(&mut d, "quero agendar, meu nome é Carlos, 11999998888, sexta às 18h");
        submit(&mut d, "sim");

        let reply = d.complete_booking(
            Err(BookingError::Backend("serviço indisponível".to_string())),
            &[],
            "Fale com a equipe pelo WhatsApp.",
        );
        assert!(reply.contains("serviço indisponível"));
        assert!(reply.contains("WhatsApp"));
        assert_eq!(d.state(), Some(DialogueState::Confirm));
    }
}
