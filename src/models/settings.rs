use serde::{Deserialize, Serialize};

use super::OpeningHours;

/// How far the assistant may go on its own when a visitor wants to book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SchedulingPolicy {
    #[default]
    OnIntent,
    Always,
    Off,
}

impl SchedulingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingPolicy::OnIntent => "onIntent",
            SchedulingPolicy::Always => "always",
            SchedulingPolicy::Off => "off",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "always" => SchedulingPolicy::Always,
            "off" => SchedulingPolicy::Off,
            _ => SchedulingPolicy::OnIntent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademySettings {
    #[serde(default = "default_academy_name")]
    pub academy_name: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default)]
    pub allow_scheduling: SchedulingPolicy,
    /// Free-form label shown in the dashboard; not interpreted.
    #[serde(default)]
    pub scheduling_mode: String,
    #[serde(default)]
    pub fallback_response: String,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
}

fn default_academy_name() -> String {
    "Academia".to_string()
}

impl Default for AcademySettings {
    fn default() -> Self {
        Self {
            academy_name: default_academy_name(),
            whatsapp_number: String::new(),
            allow_scheduling: SchedulingPolicy::default(),
            scheduling_mode: String::new(),
            fallback_response: String::new(),
            opening_hours: None,
        }
    }
}
