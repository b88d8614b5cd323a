use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    AcademySettings, Appointment, AppointmentStatus, Catalog, KnowledgeEntry, OpeningHours,
    Partner, Plan, Promotion, SchedulingPolicy,
};

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ── Settings ──

pub fn get_settings(conn: &Connection) -> anyhow::Result<AcademySettings> {
    let row = conn
        .query_row(
            "SELECT academy_name, whatsapp_number, allow_scheduling, scheduling_mode, fallback_response, opening_hours
             FROM settings WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((academy_name, whatsapp_number, allow, mode, fallback, hours_json)) = row else {
        return Ok(AcademySettings::default());
    };

    let opening_hours = match hours_json.as_deref() {
        Some(json) => match OpeningHours::from_json(json) {
            Ok(hours) => Some(hours),
            Err(e) => {
                tracing::warn!(error = %e, "stored opening hours are invalid, ignoring");
                None
            }
        },
        None => None,
    };

    Ok(AcademySettings {
        academy_name,
        whatsapp_number,
        allow_scheduling: SchedulingPolicy::parse(&allow),
        scheduling_mode: mode,
        fallback_response: fallback,
        opening_hours,
    })
}

pub fn save_settings(conn: &Connection, settings: &AcademySettings) -> anyhow::Result<()> {
    let hours_json = settings
        .opening_hours
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO settings (id, academy_name, whatsapp_number, allow_scheduling, scheduling_mode, fallback_response, opening_hours)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           academy_name = excluded.academy_name,
           whatsapp_number = excluded.whatsapp_number,
           allow_scheduling = excluded.allow_scheduling,
           scheduling_mode = excluded.scheduling_mode,
           fallback_response = excluded.fallback_response,
           opening_hours = excluded.opening_hours,
           updated_at = datetime('now')",
        params![
            settings.academy_name,
            settings.whatsapp_number,
            settings.allow_scheduling.as_str(),
            settings.scheduling_mode,
            settings.fallback_response,
            hours_json,
        ],
    )?;
    Ok(())
}

// ── Appointments ──

/// Plain insert; a live appointment already holding the slot surfaces as a
/// constraint violation from the partial unique index.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, name, phone, email, class_type, scheduled_date, scheduled_time, status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            appt.id,
            appt.name,
            appt.phone,
            appt.email,
            appt.class_type,
            appt.scheduled_date.format(DATE_FMT).to_string(),
            appt.scheduled_time,
            appt.status.as_str(),
            appt.notes,
            appt.created_at.format(TIMESTAMP_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn is_slot_taken(conn: &Connection, date: NaiveDate, time: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE scheduled_date = ?1 AND scheduled_time = ?2 AND status IN ('pending', 'confirmed')",
        params![date.format(DATE_FMT).to_string(), time],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        "SELECT id, name, phone, email, class_type, scheduled_date, scheduled_time, status, notes, created_at
         FROM appointments WHERE id = ?1",
        params![id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appt) => Ok(Some(appt?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_appointments(
    conn: &Connection,
    status_filter: Option<AppointmentStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, phone, email, class_type, scheduled_date, scheduled_time, status, notes, created_at
         FROM appointments
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY scheduled_date DESC, scheduled_time DESC
         LIMIT ?2",
    )?;

    let status = status_filter.map(|s| s.as_str());
    let rows = stmt.query_map(params![status, limit], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let scheduled_date_str: String = row.get(5)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;

    let scheduled_date = NaiveDate::parse_from_str(&scheduled_date_str, DATE_FMT)?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let status = AppointmentStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown appointment status: {status_str}"))?;

    Ok(Appointment {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        class_type: row.get(4)?,
        scheduled_date,
        scheduled_time: row.get(6)?,
        status,
        notes: row.get(8)?,
        created_at,
    })
}

// ── Catalog ──

pub fn insert_knowledge(conn: &Connection, entry: &KnowledgeEntry) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO knowledge_entries (title, content) VALUES (?1, ?2)",
        params![entry.title, entry.content],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_knowledge(conn: &Connection) -> anyhow::Result<Vec<KnowledgeEntry>> {
    let mut stmt = conn.prepare("SELECT id, title, content FROM knowledge_entries ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(KnowledgeEntry {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
        })
    })?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

pub fn insert_plan(conn: &Connection, plan: &Plan) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO plans (name, price, description) VALUES (?1, ?2, ?3)",
        params![plan.name, plan.price, plan.description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_plans(conn: &Connection) -> anyhow::Result<Vec<Plan>> {
    let mut stmt = conn.prepare("SELECT id, name, price, description FROM plans ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Plan {
            id: row.get(0)?,
            name: row.get(1)?,
            price: row.get(2)?,
            description: row.get(3)?,
        })
    })?;

    let mut plans = vec![];
    for row in rows {
        plans.push(row?);
    }
    Ok(plans)
}

pub fn insert_promotion(conn: &Connection, promo: &Promotion) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO promotions (title, description, valid_until) VALUES (?1, ?2, ?3)",
        params![promo.title, promo.description, promo.valid_until],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Promotions whose `valid_until` is absent or not yet past.
pub fn list_active_promotions(conn: &Connection, today: NaiveDate) -> anyhow::Result<Vec<Promotion>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, valid_until FROM promotions
         WHERE valid_until IS NULL OR valid_until >= ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![today.format(DATE_FMT).to_string()], |row| {
        Ok(Promotion {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            valid_until: row.get(3)?,
        })
    })?;

    let mut promos = vec![];
    for row in rows {
        promos.push(row?);
    }
    Ok(promos)
}

pub fn insert_partner(conn: &Connection, partner: &Partner) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO partners (name, benefit) VALUES (?1, ?2)",
        params![partner.name, partner.benefit],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_partners(conn: &Connection) -> anyhow::Result<Vec<Partner>> {
    let mut stmt = conn.prepare("SELECT id, name, benefit FROM partners ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Partner {
            id: row.get(0)?,
            name: row.get(1)?,
            benefit: row.get(2)?,
        })
    })?;

    let mut partners = vec![];
    for row in rows {
        partners.push(row?);
    }
    Ok(partners)
}

pub fn load_catalog(conn: &Connection, today: NaiveDate) -> anyhow::Result<Catalog> {
    Ok(Catalog {
        knowledge: list_knowledge(conn)?,
        plans: list_plans(conn)?,
        promotions: list_active_promotions(conn, today)?,
        partners: list_partners(conn)?,
    })
}
