use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A field value that remembers whether the visitor supplied it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", content = "value", rename_all = "lowercase")]
pub enum Slot<T> {
    Extracted(T),
    Defaulted(T),
    Missing,
}

impl<T> Slot<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Extracted(v) | Slot::Defaulted(v) => Some(v),
            Slot::Missing => None,
        }
    }

    /// Whether this slot counts as filled, given whether defaults are accepted.
    pub fn is_satisfied(&self, accept_default: bool) -> bool {
        match self {
            Slot::Extracted(_) => true,
            Slot::Defaulted(_) => accept_default,
            Slot::Missing => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissingField {
    Name,
    Date,
    Time,
    Phone,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub has_appointment_intent: bool,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Slot<String>,
    pub class_type: String,
    /// Additive score; may exceed 1.0.
    pub confidence: f32,
    pub missing_info: Vec<MissingField>,
}

impl AppointmentRequest {
    pub fn no_intent() -> Self {
        Self {
            has_appointment_intent: false,
            name: None,
            date: None,
            time: Slot::Missing,
            class_type: String::new(),
            confidence: 0.0,
            missing_info: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_satisfaction() {
        let extracted = Slot::Extracted("14:00".to_string());
        let defaulted = Slot::Defaulted("09:00".to_string());
        let missing: Slot<String> = Slot::Missing;

        assert!(extracted.is_satisfied(false));
        assert!(defaulted.is_satisfied(true));
        assert!(!defaulted.is_satisfied(false));
        assert!(!missing.is_satisfied(true));
        assert_eq!(defaulted.value().map(String::as_str), Some("09:00"));
    }

    #[test]
    fn test_slot_serializes_with_source_tag() {
        let json = serde_json::to_value(Slot::Defaulted("09:00".to_string())).unwrap();
        assert_eq!(json["source"], "defaulted");
        assert_eq!(json["value"], "09:00");
    }
}
