use chrono::Duration;

use crate::models::{Appointment, CLASS_DURATION_MINUTES};

/// Single-event iCalendar file for a booked class. `None` when the stored
/// time can't be parsed.
pub fn generate_ics(appt: &Appointment, academy_name: &str) -> Option<String> {
    let starts_at = appt.starts_at()?;
    let dtstart = starts_at.format("%Y%m%dT%H%M%S").to_string();
    let dtend = (starts_at + Duration::minutes(CLASS_DURATION_MINUTES))
        .format("%Y%m%dT%H%M%S")
        .to_string();
    let dtstamp = appt.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@gymdesk", appt.id);

    let summary = format!("Aula experimental de {} - {}", appt.class_type, academy_name);
    let description = appt.notes.as_deref().unwrap_or("Aula experimental");

    Some(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Gymdesk//Agendamento//PT\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    ))
}
