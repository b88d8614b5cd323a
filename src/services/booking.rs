use chrono::{NaiveDate, NaiveTime, Utc};

use crate::db::{self, queries, Db};
use crate::models::{
    Appointment, AppointmentStatus, NewAppointment, OpeningHours, CLASS_DURATION_MINUTES,
};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Esse horário já está ocupado.")]
    SlotTaken,

    #[error("Esse horário está fora do nosso funcionamento ({hours}).")]
    OutsideOpeningHours { hours: String },

    #[error("Horário inválido: {0}")]
    InvalidSlot(String),

    #[error("{0}")]
    Backend(String),
}

/// Storage side of the booking collaborator.
pub trait AppointmentStore: Send + Sync {
    fn is_slot_taken(&self, date: NaiveDate, time: &str) -> anyhow::Result<bool>;

    /// Inserts `appt` only if no live appointment holds its slot, in one step.
    fn reserve(&self, appt: &Appointment) -> Result<(), BookingError>;

    fn get(&self, id: &str) -> anyhow::Result<Option<Appointment>>;

    fn list(&self, status: Option<AppointmentStatus>, limit: i64) -> anyhow::Result<Vec<Appointment>>;

    /// Reactivating an appointment whose slot was taken since fails with `SlotTaken`.
    fn update_status(&self, id: &str, status: AppointmentStatus) -> Result<bool, BookingError>;
}

pub struct SqliteAppointmentStore {
    db: Db,
}

impl SqliteAppointmentStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

impl AppointmentStore for SqliteAppointmentStore {
    fn is_slot_taken(&self, date: NaiveDate, time: &str) -> anyhow::Result<bool> {
        let conn = db::lock(&self.db)?;
        queries::is_slot_taken(&conn, date, time)
    }

    fn reserve(&self, appt: &Appointment) -> Result<(), BookingError> {
        let conn = db::lock(&self.db).map_err(|e| BookingError::Backend(e.to_string()))?;
        queries::insert_appointment(&conn, appt).map_err(slot_write_error)
    }

    fn get(&self, id: &str) -> anyhow::Result<Option<Appointment>> {
        let conn = db::lock(&self.db)?;
        queries::get_appointment(&conn, id)
    }

    fn list(&self, status: Option<AppointmentStatus>, limit: i64) -> anyhow::Result<Vec<Appointment>> {
        let conn = db::lock(&self.db)?;
        queries::list_appointments(&conn, status, limit)
    }

    fn update_status(&self, id: &str, status: AppointmentStatus) -> Result<bool, BookingError> {
        let conn = db::lock(&self.db).map_err(|e| BookingError::Backend(e.to_string()))?;
        queries::update_appointment_status(&conn, id, status).map_err(slot_write_error)
    }
}

/// The partial unique index on live slots is the only constraint these writes can hit.
fn slot_write_error(e: rusqlite::Error) -> BookingError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            BookingError::SlotTaken
        }
        e => BookingError::Backend(e.to_string()),
    }
}

/// True when the slot is free. Any backend failure counts as taken.
pub fn check_availability(store: &dyn AppointmentStore, date: NaiveDate, time: &str) -> bool {
    match store.is_slot_taken(date, time) {
        Ok(taken) => !taken,
        Err(e) => {
            tracing::warn!(error = %e, %date, time, "availability check failed, treating slot as taken");
            false
        }
    }
}

pub fn create_appointment(
    store: &dyn AppointmentStore,
    new: NewAppointment,
    opening_hours: Option<&OpeningHours>,
) -> Result<Appointment, BookingError> {
    let time = NaiveTime::parse_from_str(&new.scheduled_time, "%H:%M")
        .map_err(|_| BookingError::InvalidSlot(new.scheduled_time.clone()))?;

    if let Some(hours) = opening_hours {
        if !hours.covers(&new.scheduled_date.and_time(time), CLASS_DURATION_MINUTES) {
            return Err(BookingError::OutsideOpeningHours {
                hours: hours.to_human_readable(),
            });
        }
    }

    if !check_availability(store, new.scheduled_date, &new.scheduled_time) {
        return Err(BookingError::SlotTaken);
    }

    let appt = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        name: new.name,
        phone: new.phone,
        email: new.email,
        class_type: new.class_type,
        scheduled_date: new.scheduled_date,
        scheduled_time: time.format("%H:%M").to_string(),
        status: AppointmentStatus::Pending,
        notes: new.notes,
        created_at: Utc::now().naive_utc(),
    };

    store.reserve(&appt)?;

    tracing::info!(
        id = %appt.id,
        date = %appt.scheduled_date,
        time = %appt.scheduled_time,
        class_type = %appt.class_type,
        "appointment created"
    );

    Ok(appt)
}

/// Up to `limit` free, open slots later on the same day, on the hour offset.
pub fn suggest_alternatives(
    store: &dyn AppointmentStore,
    date: NaiveDate,
    time: &str,
    opening_hours: Option<&OpeningHours>,
    limit: usize,
) -> Vec<String> {
    let Ok(start) = NaiveTime::parse_from_str(time, "%H:%M") else {
        return vec![];
    };

    (1..=6)
        .filter_map(|h| {
            let (candidate, wrapped) =
                start.overflowing_add_signed(chrono::Duration::hours(h));
            (wrapped == 0).then_some(candidate)
        })
        .filter(|t| {
            opening_hours
                .map(|hours| hours.covers(&date.and_time(*t), CLASS_DURATION_MINUTES))
                .unwrap_or(true)
        })
        .map(|t| t.format("%H:%M").to_string())
        .filter(|t| check_availability(store, date, t))
        .take(limit)
        .collect()
}
