//! Local filesystem storage implementation.
//!
//! Persists fetched tables so repeated CLI runs within the cache window
//! skip the export request, and writes CSV/XLSX exports.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml
//! ├── cache/
//! │   └── <sha256 of query>.json
//! └── exports/
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CourseTable;
use crate::storage::{CachedFetch, FetchCache, to_csv_bytes, to_xlsx_bytes};

const CACHE_DIR: &str = "cache";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Cache file key for a query string.
    fn cache_key(query: &str) -> String {
        let digest = Sha256::digest(query.as_bytes());
        format!("{CACHE_DIR}/{}.json", hex::encode(digest))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.write_bytes(&self.path(key), &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of cached snapshots on disk.
    pub async fn cached_count(&self) -> Result<usize> {
        let mut dir = match tokio::fs::read_dir(self.path(CACHE_DIR)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut count = 0;
        while let Some(entry) = dir.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Write a table as UTF-8 (BOM) CSV.
    pub async fn export_csv(&self, table: &CourseTable, path: &Path) -> Result<()> {
        self.write_bytes(path, &to_csv_bytes(table)?).await?;
        log::info!("Wrote {} rows to {}", table.len(), path.display());
        Ok(())
    }

    /// Write a table as an XLSX workbook.
    pub async fn export_xlsx(&self, table: &CourseTable, path: &Path) -> Result<()> {
        self.write_bytes(path, &to_xlsx_bytes(table)?).await?;
        log::info!("Wrote {} rows to {}", table.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl FetchCache for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<CachedFetch>> {
        let file = Self::cache_key(key);
        match self.read_json::<CachedFetch>(&file).await {
            Ok(entry) => Ok(entry),
            Err(AppError::Json(e)) => {
                log::warn!("Ignoring unreadable cache file {}: {}", file, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn put(&self, key: &str, entry: &CachedFetch) -> Result<()> {
        self.write_json(&Self::cache_key(key), entry).await
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(self.path(CACHE_DIR)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_table() -> CourseTable {
        CourseTable::new(
            ["교과목명", "정원"],
            vec![vec![Some("자료구조".to_string()), Some("80".to_string())]],
        )
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes(&tmp.path().join("test.txt"), b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.read_bytes("nope.txt").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_cache_roundtrip_and_clear() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let entry = CachedFetch::new(sample_table());

        storage.put("srchOpenSchyy=2026", &entry).await.unwrap();
        assert_eq!(storage.cached_count().await.unwrap(), 1);

        let loaded = storage.get("srchOpenSchyy=2026").await.unwrap().unwrap();
        assert_eq!(loaded, entry);
        assert!(storage.get("srchOpenSchyy=2025").await.unwrap().is_none());

        storage.clear().await.unwrap();
        assert_eq!(storage.cached_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let key = "q";
        storage
            .write_bytes(&storage.path(&LocalStorage::cache_key(key)), b"{not json")
            .await
            .unwrap();

        assert!(storage.get(key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_export_files() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let csv_path = tmp.path().join("exports/courses.csv");
        let xlsx_path = tmp.path().join("exports/courses.xlsx");

        storage.export_csv(&sample_table(), &csv_path).await.unwrap();
        storage.export_xlsx(&sample_table(), &xlsx_path).await.unwrap();

        assert!(std::fs::read(&csv_path).unwrap().starts_with(b"\xEF\xBB\xBF"));
        assert!(xlsx_path.exists());
    }
}
