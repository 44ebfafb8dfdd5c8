//! Reading history and continue-reading records

use super::Book;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A persisted history record: which document was opened and when
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Document identifier
    pub id: String,

    /// Epoch milliseconds of the most recent open
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn new(id: impl Into<String>, opened_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp: opened_at.timestamp_millis(),
        }
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }
}

/// A history record joined against the current library
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HistoryItem {
    pub book: Book,
    pub timestamp: i64,
}

impl HistoryItem {
    pub fn opened_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }
}

/// History items sharing one calendar-day label
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HistoryGroup {
    /// `Today`, `Yesterday` or a date such as `Oct 16, 2026`
    pub label: String,

    /// Items of that day, newest first
    pub items: Vec<HistoryItem>,
}
