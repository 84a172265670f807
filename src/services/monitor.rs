// src/services/monitor.rs

//! Seat monitor over the paginated course search page.
//!
//! The page itself is driven through a [`SearchSession`]; this module only
//! sees rows of cell text and the ability to move between result pages.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{MonitorConfig, RowColumns, SeatRecord, WatchKey};
use crate::utils::wait_until;

static PAREN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid regex"));
static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// A live search results page.
#[async_trait]
pub trait SearchSession: Send + Sync {
    /// Start a fresh search for a subject code.
    async fn open(&self, subject: &str) -> Result<()>;

    /// Rows currently shown, each a sequence of cell texts.
    async fn rows(&self) -> Result<Vec<Vec<String>>>;

    /// Ask for result page `page` (1-based). Returns once the request is
    /// issued; the caller waits for the content to change.
    async fn goto_page(&self, page: usize) -> Result<()>;
}

/// Content fingerprint of a page of rows.
pub fn fingerprint(rows: &[Vec<String>]) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        for cell in row {
            hasher.update(cell.as_bytes());
            hasher.update([0x1f_u8]);
        }
        hasher.update([0x1e_u8]);
    }
    hex::encode(hasher.finalize())
}

/// First integer in `text`, ignoring thousands separators; 0 if none.
fn first_int(text: &str) -> u32 {
    let text = text.replace(',', "");
    FIRST_NUMBER
        .find(&text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Capacity cells read like `80 (80)`; the number in parentheses wins.
fn capacity(text: &str) -> u32 {
    PAREN_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1)?.as_str().parse().ok())
        .unwrap_or_else(|| first_int(text))
}

/// Find the row for `section` and read its seat counts.
pub fn find_section(rows: &[Vec<String>], section: &str, columns: &RowColumns) -> Option<SeatRecord> {
    let min_cells = columns.min_cells();
    rows.iter()
        .filter(|row| row.len() >= min_cells)
        .find(|row| row.iter().any(|cell| cell.trim() == section))
        .map(|row| {
            SeatRecord::new(
                row[columns.title].trim().to_string(),
                row[columns.professor].trim().to_string(),
                capacity(&row[columns.capacity]),
                first_int(&row[columns.enrolled]),
            )
        })
}

/// Looks up seat counts for watched sections.
pub struct SeatMonitor<S> {
    session: S,
    columns: RowColumns,
    max_pages: usize,
    page_timeout: Duration,
    poll_interval: Duration,
}

impl<S: SearchSession> SeatMonitor<S> {
    pub fn new(session: S, config: &MonitorConfig) -> Self {
        Self {
            session,
            columns: config.columns,
            max_pages: config.max_pages.max(1),
            page_timeout: Duration::from_millis(config.page_timeout_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    /// Scan result pages for the section and return its seat record.
    pub async fn lookup(&self, key: &WatchKey) -> Result<SeatRecord> {
        let session = &self.session;
        log::debug!("Looking up {}", key);

        session.open(&key.subject).await?;
        let loaded = wait_until(self.page_timeout, self.poll_interval, move || async move {
            Ok::<_, AppError>(!session.rows().await?.is_empty())
        })
        .await?;
        if !loaded {
            log::debug!("No result rows for {} within timeout", key.subject);
            return Err(AppError::row_not_found(&key.subject, &key.section));
        }

        for page in 1..=self.max_pages {
            let rows = session.rows().await?;
            if let Some(record) = find_section(&rows, &key.section, &self.columns) {
                log::debug!("Found {} on page {}", key, page);
                return Ok(record);
            }
            if page == self.max_pages {
                break;
            }

            let before = fingerprint(&rows);
            let before = &before;
            session.goto_page(page + 1).await?;
            let changed = wait_until(self.page_timeout, self.poll_interval, move || async move {
                Ok::<_, AppError>(fingerprint(&session.rows().await?) != *before)
            })
            .await?;
            if !changed {
                log::debug!("Page {} never loaded for {}; stopping", page + 1, key.subject);
                break;
            }
        }

        Err(AppError::row_not_found(&key.subject, &key.section))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory search page with fixed result pages; the subject is ignored.
    #[derive(Default)]
    pub(crate) struct FakeSession {
        pub pages: Vec<Vec<Vec<String>>>,
        pub current: Mutex<Option<usize>>,
        pub transitions: Mutex<usize>,
        pub fail_open: bool,
    }

    impl FakeSession {
        pub fn with_pages(pages: Vec<Vec<Vec<String>>>) -> Self {
            Self {
                pages,
                ..Default::default()
            }
        }

        pub fn transitions(&self) -> usize {
            *self.transitions.lock().unwrap()
        }
    }

    #[async_trait]
    impl SearchSession for FakeSession {
        async fn open(&self, _subject: &str) -> Result<()> {
            if self.fail_open {
                return Err(AppError::automation("chrome not reachable"));
            }
            *self.current.lock().unwrap() = Some(0);
            Ok(())
        }

        async fn rows(&self) -> Result<Vec<Vec<String>>> {
            let current = *self.current.lock().unwrap();
            Ok(current
                .and_then(|i| self.pages.get(i).cloned())
                .unwrap_or_default())
        }

        async fn goto_page(&self, page: usize) -> Result<()> {
            // Pages past the end leave the current content in place.
            if page <= self.pages.len() {
                *self.current.lock().unwrap() = Some(page - 1);
                *self.transitions.lock().unwrap() += 1;
            }
            Ok(())
        }
    }

    /// A result row with the cells the monitor reads filled in.
    pub(crate) fn result_row(section: &str, title: &str, capacity: &str, enrolled: &str) -> Vec<String> {
        let mut row = vec![String::new(); 16];
        row[3] = "445.206".to_string();
        row[4] = section.to_string();
        row[6] = title.to_string();
        row[11] = "김교수".to_string();
        row[13] = capacity.to_string();
        row[14] = enrolled.to_string();
        row
    }

    pub(crate) fn fast_config() -> MonitorConfig {
        MonitorConfig {
            max_pages: 5,
            page_timeout_ms: 30,
            poll_interval_ms: 2,
            ..MonitorConfig::default()
        }
    }

    fn three_pages() -> Vec<Vec<Vec<String>>> {
        vec![
            vec![result_row("001", "자료구조", "80 (80)", "75")],
            vec![result_row("004", "자료구조", "40 (40)", "12")],
            vec![result_row("002", "자료구조", "60 (60)", "1,02")],
        ]
    }

    #[test]
    fn test_find_section_reads_cells() {
        let rows = vec![result_row("002", "자료구조", "80 (75)", "1,234")];
        let record = find_section(&rows, "002", &RowColumns::default()).unwrap();
        assert_eq!(record.title, "자료구조");
        assert_eq!(record.professor, "김교수");
        assert_eq!(record.capacity, 75);
        assert_eq!(record.enrolled, 1234);
    }

    #[test]
    fn test_find_section_skips_short_rows() {
        let rows = vec![vec!["002".to_string(); 5]];
        assert!(find_section(&rows, "002", &RowColumns::default()).is_none());
    }

    #[test]
    fn test_capacity_without_parentheses() {
        assert_eq!(capacity("정원 30명"), 30);
        assert_eq!(capacity(""), 0);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = vec![vec!["a".to_string(), "b".to_string()]];
        let b = vec![vec!["ab".to_string()]];
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }

    #[tokio::test]
    async fn test_lookup_on_last_page() {
        let monitor = SeatMonitor::new(FakeSession::with_pages(three_pages()), &fast_config());
        let key = WatchKey::new("445.206", "002").unwrap();

        let record = monitor.lookup(&key).await.unwrap();
        assert_eq!(record.capacity, 60);
        assert_eq!(record.enrolled, 102);
        assert_eq!(monitor.session().transitions(), 2);
    }

    #[tokio::test]
    async fn test_lookup_missing_section() {
        let monitor = SeatMonitor::new(FakeSession::with_pages(three_pages()), &fast_config());
        let key = WatchKey::new("445.206", "999").unwrap();

        let err = monitor.lookup(&key).await.unwrap_err();
        assert!(matches!(err, AppError::RowNotFound { .. }));
        assert_eq!(err.to_string(), "row not found");
        assert_eq!(monitor.session().transitions(), 2);
    }

    #[tokio::test]
    async fn test_lookup_stops_at_max_pages() {
        let config = MonitorConfig {
            max_pages: 2,
            ..fast_config()
        };
        let monitor = SeatMonitor::new(FakeSession::with_pages(three_pages()), &config);
        let key = WatchKey::new("445.206", "002").unwrap();

        assert!(monitor.lookup(&key).await.is_err());
        assert_eq!(monitor.session().transitions(), 1);
    }

    #[tokio::test]
    async fn test_lookup_passes_automation_fault_through() {
        let session = FakeSession {
            fail_open: true,
            ..FakeSession::with_pages(three_pages())
        };
        let monitor = SeatMonitor::new(session, &fast_config());
        let key = WatchKey::new("445.206", "001").unwrap();

        let err = monitor.lookup(&key).await.unwrap_err();
        assert_eq!(err.to_string(), "chrome not reachable");
    }

    #[tokio::test]
    async fn test_lookup_empty_results() {
        let monitor = SeatMonitor::new(FakeSession::default(), &fast_config());
        let key = WatchKey::new("000.000", "001").unwrap();
        assert!(matches!(
            monitor.lookup(&key).await,
            Err(AppError::RowNotFound { .. })
        ));
    }
}
