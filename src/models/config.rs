//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Semester, SortKey};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Academic year and semester to query
    #[serde(default)]
    pub term: TermConfig,

    /// Bulk export endpoint settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Search-page scraping settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Search output defaults
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if !(2000..=2100).contains(&self.term.year) {
            return Err(AppError::validation("term.year looks wrong"));
        }
        if self.fetch.url.trim().is_empty() {
            return Err(AppError::validation("fetch.url is empty"));
        }
        url::Url::parse(&self.fetch.url)
            .map_err(|e| AppError::validation(format!("fetch.url is invalid: {e}")))?;
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.page_size == 0 {
            return Err(AppError::validation("fetch.page_size must be > 0"));
        }
        url::Url::parse(&self.monitor.search_url)
            .map_err(|e| AppError::validation(format!("monitor.search_url is invalid: {e}")))?;
        if self.monitor.max_pages == 0 {
            return Err(AppError::validation("monitor.max_pages must be > 0"));
        }
        if self.monitor.page_timeout_ms == 0 || self.monitor.poll_interval_ms == 0 {
            return Err(AppError::validation(
                "monitor.page_timeout_ms and monitor.poll_interval_ms must be > 0",
            ));
        }
        if !self.monitor.page_script.contains("{page}") {
            return Err(AppError::validation(
                "monitor.page_script must contain a {page} placeholder",
            ));
        }
        if self.filter.limit == 0 {
            return Err(AppError::validation("filter.limit must be > 0"));
        }
        scraper::Selector::parse(&self.monitor.row_selector)
            .map_err(|e| AppError::selector(&self.monitor.row_selector, format!("{e:?}")))?;
        Ok(())
    }
}

/// Academic term settings shared by both data paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermConfig {
    #[serde(default = "defaults::year")]
    pub year: u16,

    #[serde(default)]
    pub semester: Semester,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            year: defaults::year(),
            semester: Semester::default(),
        }
    }
}

/// Bulk Excel export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Export endpoint URL
    #[serde(default = "defaults::fetch_url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// How long a fetched table stays fresh
    #[serde(default = "defaults::cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Rows requested per export
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Value of the `srchLanguage` form field
    #[serde(default = "defaults::language")]
    pub language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: defaults::fetch_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            cache_ttl_secs: defaults::cache_ttl(),
            page_size: defaults::page_size(),
            language: defaults::language(),
        }
    }
}

/// Search-page scraping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Course search page URL
    #[serde(default = "defaults::search_url")]
    pub search_url: String,

    /// Result pages scanned before giving up
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Wait for a page's rows to appear or change
    #[serde(default = "defaults::page_timeout")]
    pub page_timeout_ms: u64,

    /// Polling interval while waiting
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Delay between watch rounds
    #[serde(default = "defaults::refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Run the browser without a window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary
    #[serde(default)]
    pub chrome_path: Option<String>,

    /// CSS selector for result rows
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// Script that moves to result page `{page}`
    #[serde(default = "defaults::page_script")]
    pub page_script: String,

    /// Cell positions within a result row
    #[serde(default)]
    pub columns: RowColumns,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            search_url: defaults::search_url(),
            max_pages: defaults::max_pages(),
            page_timeout_ms: defaults::page_timeout(),
            poll_interval_ms: defaults::poll_interval(),
            refresh_interval_secs: defaults::refresh_interval(),
            headless: defaults::headless(),
            chrome_path: None,
            row_selector: defaults::row_selector(),
            page_script: defaults::page_script(),
            columns: RowColumns::default(),
        }
    }
}

/// Defaults for the `search` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Sort order when none is given
    #[serde(default)]
    pub sort: SortKey,

    /// Rows printed to the terminal
    #[serde(default = "defaults::limit")]
    pub limit: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sort: SortKey::default(),
            limit: defaults::limit(),
        }
    }
}

/// Zero-based cell indices in a search result row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RowColumns {
    pub title: usize,
    pub professor: usize,
    pub capacity: usize,
    pub enrolled: usize,
}

impl RowColumns {
    /// Minimum cell count for a row to be readable.
    pub fn min_cells(&self) -> usize {
        [self.title, self.professor, self.capacity, self.enrolled]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl Default for RowColumns {
    fn default() -> Self {
        Self {
            title: 6,
            professor: 11,
            capacity: 13,
            enrolled: 14,
        }
    }
}

mod defaults {
    // Term defaults
    pub fn year() -> u16 {
        2026
    }

    // Fetch defaults
    pub fn fetch_url() -> String {
        "https://sugang.snu.ac.kr/sugang/cc/cc100InterfaceExcel.action".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; sugang/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn cache_ttl() -> u64 {
        600
    }
    pub fn page_size() -> u32 {
        9999
    }
    pub fn language() -> String {
        "ko".into()
    }

    // Monitor defaults
    pub fn search_url() -> String {
        "https://shine.snu.ac.kr/uni/sugang/cc/cc100.action".into()
    }
    pub fn max_pages() -> usize {
        10
    }
    pub fn page_timeout() -> u64 {
        10_000
    }
    pub fn poll_interval() -> u64 {
        200
    }
    pub fn refresh_interval() -> u64 {
        2
    }
    pub fn headless() -> bool {
        true
    }
    pub fn row_selector() -> String {
        "table.tbl_basic tbody tr".into()
    }
    pub fn page_script() -> String {
        "fnGotoPage({page})".into()
    }

    // Filter defaults
    pub fn limit() -> usize {
        50
    }
}
