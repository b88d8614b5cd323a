use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::MissingField;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl UserInfo {
    /// Fills only the fields that are still unknown; a known value is never replaced.
    pub fn merge(&mut self, name: Option<String>, phone: Option<String>, email: Option<String>) {
        if self.name.is_none() {
            self.name = name;
        }
        if self.phone.is_none() {
            self.phone = phone;
        }
        if self.email.is_none() {
            self.email = email;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentIntent {
    pub class_type: String,
    pub date: Option<NaiveDate>,
    /// Only times the visitor actually said are kept here, never the 09:00 default.
    pub time: Option<String>,
    pub confidence: f32,
}

/// Per-session state of the server-side assistant. Owned by the caller and
/// round-tripped with every message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default)]
    pub appointment_intent: Option<AppointmentIntent>,
    /// The field the assistant asked for in its last reply.
    #[serde(default)]
    pub pending_field: Option<MissingField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_first_value_wins() {
        let mut info = UserInfo::default();
        info.merge(Some("Carlos".into()), None, None);
        info.merge(Some("Ana".into()), Some("11999998888".into()), None);
        assert_eq!(info.name.as_deref(), Some("Carlos"));
        assert_eq!(info.phone.as_deref(), Some("11999998888"));
        assert!(info.email.is_none());
    }

    #[test]
    fn test_context_deserializes_from_empty_object() {
        let ctx: ConversationContext = serde_json::from_str("{}").unwrap();
        assert_eq!(ctx, ConversationContext::default());
    }
}
