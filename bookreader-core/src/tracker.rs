//! Continue-reading and history tracking
//!
//! Both lists hold identifiers only. They are joined against the current
//! library on every read, so a book deleted by a scan disappears from both
//! views even before [`ReadingTracker::prune`] cleans up the stored ids.

use crate::error::PreferencesError;
use crate::preferences::Preferences;
use crate::types::{Book, HistoryEntry, HistoryGroup, HistoryItem};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Label of the group holding today's entries
pub const TODAY: &str = "Today";

/// Label of the group holding yesterday's entries
pub const YESTERDAY: &str = "Yesterday";

/// Tracks which books were opened, and when
#[derive(Clone)]
pub struct ReadingTracker {
    preferences: Arc<Preferences>,
}

impl ReadingTracker {
    pub fn new(preferences: Arc<Preferences>) -> Self {
        Self { preferences }
    }

    /// Record that a book was opened just now
    pub async fn mark_opened(&self, id: &str) -> Result<(), PreferencesError> {
        self.mark_opened_at(id, Utc::now()).await
    }

    pub async fn mark_opened_at(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), PreferencesError> {
        self.preferences
            .update(|d| record_open(&mut d.continue_reading, &mut d.history, id, at))
            .await
    }

    /// Continue-reading books, in the order they were first opened
    pub async fn continue_reading(&self, books: &[Book]) -> Vec<Book> {
        let ids = self.preferences.continue_reading().await;
        let by_id: HashMap<&str, &Book> = books.iter().map(|b| (b.id.as_str(), b)).collect();
        ids.iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|b| (*b).clone()))
            .collect()
    }

    /// History joined against `books`, newest first
    pub async fn history(&self, books: &[Book]) -> Vec<HistoryItem> {
        let mut entries = self.preferences.history().await;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let by_id: HashMap<&str, &Book> = books.iter().map(|b| (b.id.as_str(), b)).collect();
        entries
            .into_iter()
            .filter_map(|entry| {
                by_id.get(entry.id.as_str()).map(|book| HistoryItem {
                    book: (*book).clone(),
                    timestamp: entry.timestamp,
                })
            })
            .collect()
    }

    /// Drop a finished book from continue reading. Returns false if absent.
    pub async fn remove_from_continue_reading(&self, id: &str) -> Result<bool, PreferencesError> {
        self.preferences
            .update(|d| {
                let before = d.continue_reading.len();
                d.continue_reading.retain(|c| c != id);
                d.continue_reading.len() != before
            })
            .await
    }

    /// Forget every reference to a book not in `known`.
    ///
    /// Returns how many stored references were dropped.
    pub async fn prune(&self, known: &HashSet<String>) -> Result<usize, PreferencesError> {
        self.preferences
            .update(|d| {
                let before = d.continue_reading.len() + d.history.len();
                d.continue_reading.retain(|id| known.contains(id));
                d.history.retain(|e| known.contains(&e.id));
                before - (d.continue_reading.len() + d.history.len())
            })
            .await
    }
}

/// Apply one open to the stored lists
pub(crate) fn record_open(
    continue_reading: &mut Vec<String>,
    history: &mut Vec<HistoryEntry>,
    id: &str,
    at: DateTime<Utc>,
) {
    if !continue_reading.iter().any(|c| c == id) {
        continue_reading.push(id.to_string());
    }
    history.retain(|e| e.id != id);
    history.insert(0, HistoryEntry::new(id, at));
}

/// Group history items by calendar day in `now`'s time zone.
///
/// Groups run newest day first: `Today`, `Yesterday`, then dates such as
/// `Oct 14, 2026`. Items inside a group are newest first.
pub fn group_history<Tz: TimeZone>(items: &[HistoryItem], now: &DateTime<Tz>) -> Vec<HistoryGroup> {
    let tz = now.timezone();
    let today = now.date_naive();
    let yesterday = today.checked_sub_days(Days::new(1));

    let mut sorted: Vec<&HistoryItem> = items.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut groups: Vec<(NaiveDate, HistoryGroup)> = Vec::new();
    for item in sorted {
        let day = item.opened_at().with_timezone(&tz).date_naive();
        match groups.last_mut() {
            Some((last_day, group)) if *last_day == day => group.items.push(item.clone()),
            _ => groups.push((
                day,
                HistoryGroup {
                    label: day_label(day, today, yesterday),
                    items: vec![item.clone()],
                },
            )),
        }
    }

    groups.into_iter().map(|(_, group)| group).collect()
}

fn day_label(day: NaiveDate, today: NaiveDate, yesterday: Option<NaiveDate>) -> String {
    if day == today {
        TODAY.to_string()
    } else if Some(day) == yesterday {
        YESTERDAY.to_string()
    } else {
        day.format("%b %d, %Y").to_string()
    }
}
