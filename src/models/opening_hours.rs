use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningSlot {
    pub day: String,
    pub start: String,
    pub end: String,
}

/// Weekly opening hours of the academy. An empty slot list means "always open".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningHours {
    pub slots: Vec<OpeningSlot>,
}

const DAY_KEYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
const DAY_LABELS: [&str; 7] = ["Seg", "Ter", "Qua", "Qui", "Sex", "Sáb", "Dom"];

impl OpeningHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: OpeningHours = serde_json::from_str(s)?;
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for slot in &self.slots {
            day_index(&slot.day)?;
            if parse_time(&slot.start)? >= parse_time(&slot.end)? {
                anyhow::bail!("slot on {} ends before it starts", slot.day);
            }
        }
        Ok(())
    }

    /// True when a class of `duration_minutes` starting at `dt` fits inside one slot.
    pub fn covers(&self, dt: &NaiveDateTime, duration_minutes: i64) -> bool {
        if self.slots.is_empty() {
            return true;
        }

        let key = DAY_KEYS[dt.weekday().num_days_from_monday() as usize];
        let end_dt = *dt + chrono::Duration::minutes(duration_minutes);
        let start_time = dt.format("%H:%M").to_string();
        // A class ending exactly at midnight is still within a slot ending "24:00".
        let end_time = if end_dt.date() != dt.date() {
            "24:00".to_string()
        } else {
            end_dt.format("%H:%M").to_string()
        };

        self.slots.iter().any(|slot| {
            slot.day.to_lowercase() == key && start_time >= slot.start && end_time <= slot.end
        })
    }

    pub fn to_human_readable(&self) -> String {
        let mut sorted_slots = self.slots.clone();
        sorted_slots.sort_by_key(|s| day_index(&s.day).unwrap_or(7));

        sorted_slots
            .iter()
            .map(|s| {
                let label = day_index(&s.day)
                    .map(|i| DAY_LABELS[i])
                    .unwrap_or(s.day.as_str());
                format!("{label}: {}-{}", s.start, s.end)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn day_index(s: &str) -> anyhow::Result<usize> {
    let lower = s.to_lowercase();
    DAY_KEYS
        .iter()
        .position(|d| *d == lower)
        .ok_or_else(|| anyhow::anyhow!("invalid weekday: {s}"))
}

/// Minutes since midnight.
fn parse_time(s: &str) -> anyhow::Result<u32> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("invalid time format: {s}"))?;
    let hour: u32 = h
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    if hour > 24 || minute > 59 || (hour == 24 && minute != 0) {
        return Err(anyhow::anyhow!("time out of range: {s}"));
    }
    Ok(hour * 60 + minute)
}
