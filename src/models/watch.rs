//! Watchlist data structures for the seat monitor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A section to watch, identified by subject code and section number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatchKey {
    pub subject: String,
    pub section: String,
}

impl WatchKey {
    /// Create a key from trimmed parts; both must be non-blank.
    pub fn new(subject: &str, section: &str) -> Result<Self, AppError> {
        let subject = subject.trim();
        let section = section.trim();
        if subject.is_empty() || section.is_empty() {
            return Err(AppError::validation(
                "both subject code and section are required",
            ));
        }
        Ok(Self {
            subject: subject.to_string(),
            section: section.to_string(),
        })
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.subject, self.section)
    }
}

/// Parses `SUBJECT:SECTION`, e.g. `445.206:002`.
impl FromStr for WatchKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (subject, section) = s.rsplit_once(':').ok_or_else(|| {
            AppError::validation(format!("expected SUBJECT:SECTION, got '{s}'"))
        })?;
        Self::new(subject, section)
    }
}

/// Seat counts scraped for one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub title: String,
    pub professor: String,
    pub capacity: u32,
    pub enrolled: u32,
    /// enrolled / capacity; 0.0 when capacity is zero
    pub ratio: f64,
}

impl SeatRecord {
    pub fn new(title: String, professor: String, capacity: u32, enrolled: u32) -> Self {
        let ratio = if capacity > 0 {
            enrolled as f64 / capacity as f64
        } else {
            0.0
        };
        Self {
            title,
            professor,
            capacity,
            enrolled,
            ratio,
        }
    }

    pub fn is_full(&self) -> bool {
        self.enrolled >= self.capacity
    }

    /// Status label shown next to the seat bar.
    pub fn status(&self) -> &'static str {
        if self.is_full() { "만석" } else { "여석 있음" }
    }
}

/// Lifecycle of a watchlist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WatchState {
    Pending,
    Resolved(SeatRecord),
    Error(String),
}

/// One watched section and its last known state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub key: WatchKey,
    pub state: WatchState,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WatchEntry {
    pub fn pending(key: WatchKey) -> Self {
        Self {
            key,
            state: WatchState::Pending,
            updated_at: None,
        }
    }

    pub fn record(&self) -> Option<&SeatRecord> {
        match &self.state {
            WatchState::Resolved(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, WatchState::Pending)
    }
}
