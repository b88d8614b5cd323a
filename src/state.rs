use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::config::AppConfig;
use crate::db::{self, queries, Db};
use crate::models::{AcademySettings, Catalog};
use crate::services::ai::LlmProvider;
use crate::services::booking::{AppointmentStore, SqliteAppointmentStore};
use crate::services::dialogue::SchedulingDialogue;

pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
    pub store: Arc<dyn AppointmentStore>,
    pub dialogues: Mutex<DialogueSessions>,
}

impl AppState {
    pub fn new(db: Db, config: AppConfig, llm: Box<dyn LlmProvider>) -> Self {
        let store = Arc::new(SqliteAppointmentStore::new(Arc::clone(&db)));
        Self {
            db,
            config,
            llm,
            store,
            dialogues: Mutex::new(DialogueSessions::default()),
        }
    }

    /// Current academy settings; defaults when the row can't be read.
    pub fn settings(&self) -> AcademySettings {
        let loaded = db::lock(&self.db).and_then(|conn| queries::get_settings(&conn));
        loaded.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to load settings, using defaults");
            AcademySettings::default()
        })
    }

    pub fn catalog(&self, today: NaiveDate) -> Catalog {
        let loaded = db::lock(&self.db).and_then(|conn| queries::load_catalog(&conn, today));
        loaded.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to load catalog");
            Catalog::default()
        })
    }
}

/// Sessions untouched for this long are dropped on the next write.
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Widget dialogues keyed by session id. Only active dialogues are kept.
#[derive(Debug, Default)]
pub struct DialogueSessions {
    entries: HashMap<String, (SchedulingDialogue, Instant)>,
}

impl DialogueSessions {
    pub fn get(&self, session_id: &str) -> Option<&SchedulingDialogue> {
        self.entries.get(session_id).map(|(dialogue, _)| dialogue)
    }

    /// Removes the session, or hands out a fresh idle dialogue.
    pub fn take(&mut self, session_id: &str) -> SchedulingDialogue {
        self.entries
            .remove(session_id)
            .map(|(dialogue, _)| dialogue)
            .unwrap_or_default()
    }

    /// Stores the dialogue back if it is still active and sweeps expired sessions.
    pub fn put(&mut self, session_id: String, dialogue: SchedulingDialogue, now: Instant) {
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, seen)| now.saturating_duration_since(*seen) < SESSION_TTL);
        let expired = before - self.entries.len();
        if expired > 0 {
            tracing::debug!(expired, "expired idle dialogue sessions");
        }

        if dialogue.is_active() {
            self.entries.insert(session_id, (dialogue, now));
        }
    }

    pub fn remove(&mut self, session_id: &str) -> bool {
        self.entries.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
