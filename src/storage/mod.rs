//! Storage for fetched snapshots and exported tables.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Configuration
//! ├── cache/                # Fetched tables, one file per query
//! │   └── <sha256>.json
//! └── exports/              # Default export location
//!     ├── courses.csv
//!     └── courses.xlsx
//! ```

pub mod export;
pub mod local;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::CourseTable;

// Re-export for convenience
pub use export::{to_csv_bytes, to_xlsx_bytes};
pub use local::LocalStorage;

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// A fetched table and the moment it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedFetch {
    pub table: CourseTable,
    pub fetched_at: DateTime<Utc>,
}

impl CachedFetch {
    pub fn new(table: CourseTable) -> Self {
        Self {
            table,
            fetched_at: Utc::now(),
        }
    }

    /// Whether `now` is within `ttl` of the fetch time. A fetch time in the
    /// future counts by its distance from `now`, so skew expires too.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at).abs();
        age.to_std().is_ok_and(|age| age < ttl)
    }

    /// Fetch time in Korea Standard Time, ISO-8601 to the second.
    pub fn fetched_at_kst(&self) -> String {
        let Some(kst) = FixedOffset::east_opt(KST_OFFSET_SECS) else {
            return self.fetched_at.to_rfc3339();
        };
        self.fetched_at
            .with_timezone(&kst)
            .format("%Y-%m-%dT%H:%M:%S%:z")
            .to_string()
    }
}

/// Trait for fetch cache backends, keyed by the exact query string.
#[async_trait]
pub trait FetchCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedFetch>>;

    async fn put(&self, key: &str, entry: &CachedFetch) -> Result<()>;

    /// Drop every cached snapshot.
    async fn clear(&self) -> Result<()>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CachedFetch>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FetchCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CachedFetch>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, entry: &CachedFetch) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_freshness_window() {
        let fetched_at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let entry = CachedFetch {
            table: CourseTable::default(),
            fetched_at,
        };
        let ttl = Duration::from_secs(600);
        assert!(entry.is_fresh(ttl, fetched_at + chrono::Duration::seconds(599)));
        assert!(!entry.is_fresh(ttl, fetched_at + chrono::Duration::seconds(600)));
    }

    #[test]
    fn test_future_fetch_time_expires() {
        let fetched_at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let entry = CachedFetch {
            table: CourseTable::default(),
            fetched_at,
        };
        let ttl = Duration::from_secs(600);
        assert!(entry.is_fresh(ttl, fetched_at - chrono::Duration::seconds(599)));
        assert!(!entry.is_fresh(ttl, fetched_at - chrono::Duration::seconds(600)));
        assert!(!entry.is_fresh(ttl, fetched_at - chrono::Duration::days(365)));
    }

    #[test]
    fn test_fetched_at_kst() {
        let entry = CachedFetch {
            table: CourseTable::default(),
            fetched_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        };
        assert_eq!(entry.fetched_at_kst(), "2026-02-01T09:00:00+09:00");
    }

    #[tokio::test]
    async fn test_memory_cache_roundtrip_and_clear() {
        let cache = MemoryCache::new();
        let entry = CachedFetch::new(CourseTable::default());
        cache.put("q=1", &entry).await.unwrap();
        assert_eq!(cache.get("q=1").await.unwrap(), Some(entry));
        assert_eq!(cache.get("q=2").await.unwrap(), None);

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
    }
}
