use serde::Serialize;

/// Confidence assigned to any message that shows scheduling intent at all.
pub const BASE_CONFIDENCE: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub has_intent: bool,
    pub base_confidence: f32,
}

impl Classification {
    pub fn none() -> Self {
        Self {
            has_intent: false,
            base_confidence: 0.0,
        }
    }
}

/// Decides whether a message is asking to schedule something.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;
}

const SCHEDULING_KEYWORDS: &[&str] = &[
    "agendar",
    "agendamento",
    "agenda",
    "marcar",
    "reservar",
    "aula",
    "experimental",
    "horário",
    "horario",
    "treinar",
    "treino",
    "visita",
    "conhecer",
    "quero",
    "queria",
    "gostaria",
    "preciso",
];

/// Substring match over a fixed Portuguese vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Classification {
        let lower = text.to_lowercase();
        if SCHEDULING_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Classification {
                has_intent: true,
                base_confidence: BASE_CONFIDENCE,
            }
        } else {
            Classification::none()
        }
    }
}
