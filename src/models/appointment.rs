use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Default length of a class, used for opening-hours and calendar math.
pub const CLASS_DURATION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub class_type: String,
    pub scheduled_date: NaiveDate,
    /// `HH:MM`, 24h.
    pub scheduled_time: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let time = chrono::NaiveTime::parse_from_str(&self.scheduled_time, "%H:%M").ok()?;
        Some(self.scheduled_date.and_time(time))
    }
}

/// Payload submitted to the booking collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub class_type: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }
}
