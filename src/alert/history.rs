use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

/// Alert attempts kept for display; older entries are dropped
pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Success,
    Failure,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Success => f.write_str("success"),
            AlertStatus::Failure => f.write_str("failure"),
        }
    }
}

/// One alert attempt as shown to the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Wall-clock time in the display timezone, `HH:MM:SS`
    pub timestamp: String,
    pub status: AlertStatus,
    pub message: String,
}

impl AlertRecord {
    pub fn new(created_at: DateTime<Utc>, timezone: &Tz, status: AlertStatus, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            timestamp: created_at.with_timezone(timezone).format("%H:%M:%S").to_string(),
            status,
            message,
        }
    }
}

/// Most-recent-first alert log holding at most [`HISTORY_LIMIT`] entries
#[derive(Debug, Clone, Default)]
pub struct AlertHistory {
    entries: VecDeque<AlertRecord>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_LIMIT + 1),
        }
    }

    /// Insert at the head, dropping the oldest entry when full
    pub fn push(&mut self, record: AlertRecord) {
        self.entries.push_front(record);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn latest(&self) -> Option<&AlertRecord> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlertRecord> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<AlertRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve configured timezone, falling back to UTC on parse errors
pub(crate) fn resolve_timezone(tz_name: &str) -> Tz {
    match tz_name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("Invalid alert timezone '{}', falling back to UTC", tz_name);
            chrono_tz::UTC
        }
    }
}
