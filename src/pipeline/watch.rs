// src/pipeline/watch.rs

//! Watchlist session: registrations, pending lookups and refresh rounds.

use std::cmp::Ordering;
use std::collections::VecDeque;

use chrono::Utc;

use crate::error::Result;
use crate::models::{WatchEntry, WatchKey, WatchState};
use crate::services::{SearchSession, SeatMonitor};

/// Outcome of [`WatchSession::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Queued,
    Duplicate,
}

/// Watched sections in registration order, plus lookups not yet run.
#[derive(Debug, Default)]
pub struct WatchSession {
    entries: Vec<WatchEntry>,
    pending: VecDeque<WatchKey>,
}

impl WatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn get(&self, key: &WatchKey) -> Option<&WatchEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Add a section to the watchlist. The lookup runs on the next
    /// [`process_pending`](Self::process_pending).
    pub fn register(&mut self, subject: &str, section: &str) -> Result<Registration> {
        let key = WatchKey::new(subject, section)?;
        if self.get(&key).is_some() || self.pending.contains(&key) {
            return Ok(Registration::Duplicate);
        }
        log::info!("Watching {}", key);
        self.pending.push_back(key.clone());
        self.entries.push(WatchEntry::pending(key));
        Ok(Registration::Queued)
    }

    /// Drop a section and any lookup still queued for it.
    pub fn remove(&mut self, key: &WatchKey) -> bool {
        self.pending.retain(|k| k != key);
        let before = self.entries.len();
        self.entries.retain(|e| &e.key != key);
        before != self.entries.len()
    }

    /// Run queued lookups in registration order. Returns how many ran.
    pub async fn process_pending<S: SearchSession>(&mut self, monitor: &SeatMonitor<S>) -> usize {
        let mut processed = 0;
        while let Some(key) = self.pending.pop_front() {
            if self.get(&key).is_none() {
                continue;
            }
            let state = lookup_state(monitor, &key).await;
            self.store(&key, state);
            processed += 1;
        }
        processed
    }

    /// Scrape every settled entry again. Returns how many were refreshed.
    pub async fn refresh_all<S: SearchSession>(&mut self, monitor: &SeatMonitor<S>) -> usize {
        let keys: Vec<WatchKey> = self
            .entries
            .iter()
            .filter(|e| !e.is_pending())
            .map(|e| e.key.clone())
            .collect();

        for key in &keys {
            let state = lookup_state(monitor, key).await;
            self.store(key, state);
        }
        keys.len()
    }

    /// Entries ordered by competition ratio, highest first. Entries without
    /// a seat record keep their relative order at the end.
    pub fn entries_by_ratio(&self) -> Vec<&WatchEntry> {
        let mut view: Vec<&WatchEntry> = self.entries.iter().collect();
        view.sort_by(|a, b| match (a.record(), b.record()) {
            (Some(a), Some(b)) => b.ratio.total_cmp(&a.ratio),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        view
    }

    fn store(&mut self, key: &WatchKey, state: WatchState) {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.key == key) {
            entry.state = state;
            entry.updated_at = Some(Utc::now());
        }
    }
}

async fn lookup_state<S: SearchSession>(monitor: &SeatMonitor<S>, key: &WatchKey) -> WatchState {
    match monitor.lookup(key).await {
        Ok(record) => WatchState::Resolved(record),
        Err(e) => {
            log::warn!("Lookup failed for {}: {}", key, e);
            WatchState::Error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::monitor::tests::{FakeSession, fast_config, result_row};

    fn monitor() -> SeatMonitor<FakeSession> {
        let pages = vec![
            vec![result_row("001", "자료구조", "80 (80)", "80")],
            vec![result_row("002", "자료구조", "40 (40)", "10")],
        ];
        SeatMonitor::new(FakeSession::with_pages(pages), &fast_config())
    }

    fn key(section: &str) -> WatchKey {
        WatchKey::new("445.206", section).unwrap()
    }

    #[test]
    fn test_register_trims_and_rejects_duplicates() {
        let mut session = WatchSession::new();
        assert_eq!(session.register(" 445.206 ", "001 ").unwrap(), Registration::Queued);
        assert_eq!(session.register("445.206", "001").unwrap(), Registration::Duplicate);
        assert_eq!(session.len(), 1);
        assert_eq!(session.pending_count(), 1);
        assert!(session.get(&key("001")).unwrap().is_pending());
    }

    #[test]
    fn test_register_blank_is_validation_error() {
        let mut session = WatchSession::new();
        assert!(session.register("  ", "001").is_err());
        assert!(session.register("445.206", "").is_err());
        assert!(session.is_empty());
    }

    #[test]
    fn test_remove_drops_pending_lookup() {
        let mut session = WatchSession::new();
        session.register("445.206", "001").unwrap();
        assert!(session.remove(&key("001")));
        assert_eq!(session.pending_count(), 0);
        assert!(!session.remove(&key("001")));
    }

    #[tokio::test]
    async fn test_process_pending_resolves_and_records_errors() {
        let monitor = monitor();
        let mut session = WatchSession::new();
        session.register("445.206", "002").unwrap();
        session.register("445.206", "999").unwrap();

        assert_eq!(session.process_pending(&monitor).await, 2);
        assert_eq!(session.pending_count(), 0);

        let found = session.get(&key("002")).unwrap();
        let record = found.record().unwrap();
        assert_eq!(record.capacity, 40);
        assert_eq!(record.enrolled, 10);
        assert!(found.updated_at.is_some());

        let missing = session.get(&key("999")).unwrap();
        assert_eq!(missing.state, WatchState::Error("row not found".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_all_skips_pending() {
        let monitor = monitor();
        let mut session = WatchSession::new();
        session.register("445.206", "001").unwrap();
        session.process_pending(&monitor).await;
        session.register("445.206", "002").unwrap();

        assert_eq!(session.refresh_all(&monitor).await, 1);
        assert!(session.get(&key("002")).unwrap().is_pending());
        assert!(session.get(&key("001")).unwrap().record().unwrap().is_full());
    }

    #[tokio::test]
    async fn test_entries_by_ratio() {
        let monitor = monitor();
        let mut session = WatchSession::new();
        session.register("445.206", "999").unwrap();
        session.register("445.206", "002").unwrap();
        session.register("445.206", "001").unwrap();
        session.process_pending(&monitor).await;

        let order: Vec<&str> = session
            .entries_by_ratio()
            .iter()
            .map(|e| e.key.section.as_str())
            .collect();
        assert_eq!(order, vec!["001", "002", "999"]);
    }
}
