// src/services/fetch.rs

//! Bulk course export fetcher.
//!
//! Posts the search form to the Excel export endpoint and decodes the
//! response. Results are cached by the exact form-encoded query string.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, Semester};
use crate::services::parse_table_bytes;
use crate::storage::{CachedFetch, FetchCache};
use crate::utils::http;

/// Form fields of the export request, in the order the site sends them.
const FORM_FIELDS: [&str; 47] = [
    "workType",
    "pageNo",
    "srchOpenSchyy",
    "srchOpenShtm",
    "srchSbjtNm",
    "srchSbjtCd",
    "seeMore",
    "srchCptnCorsFg",
    "srchOpenShyr",
    "srchOpenUpSbjtFldCd",
    "srchOpenSbjtFldCd",
    "srchOpenUpDeptCd",
    "srchOpenDeptCd",
    "srchOpenMjCd",
    "srchOpenSubmattCorsFg",
    "srchOpenSubmattFgCd1",
    "srchOpenSubmattFgCd2",
    "srchOpenSubmattFgCd3",
    "srchOpenSubmattFgCd4",
    "srchOpenSubmattFgCd5",
    "srchOpenSubmattFgCd6",
    "srchOpenSubmattFgCd7",
    "srchOpenSubmattFgCd8",
    "srchOpenSubmattFgCd9",
    "srchExcept",
    "srchOpenPntMin",
    "srchOpenPntMax",
    "srchCamp",
    "srchBdNo",
    "srchProfNm",
    "srchOpenSbjtTmNm",
    "srchOpenSbjtDayNm",
    "srchOpenSbjtTm",
    "srchOpenSbjtNm",
    "srchTlsnAplyCapaCntMin",
    "srchTlsnAplyCapaCntMax",
    "srchLsnProgType",
    "srchTlsnRcntMin",
    "srchTlsnRcntMax",
    "srchMrksGvMthd",
    "srchIsEngSbjt",
    "srchMrksApprMthdChgPosbYn",
    "srchIsPendingCourse",
    "srchGenrlRemoteLtYn",
    "srchLanguage",
    "srchCurrPage",
    "srchPageSize",
];

/// Parameters of one export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    pub year: u16,
    pub semester: Semester,
    pub page_size: u32,
    pub language: String,
    /// Server-side subject name filter
    pub subject_name: Option<String>,
    /// Server-side subject code filter
    pub subject_code: Option<String>,
}

impl FetchQuery {
    /// Query for the configured term with no server-side filters.
    pub fn from_config(config: &Config) -> Self {
        Self {
            year: config.term.year,
            semester: config.term.semester,
            page_size: config.fetch.page_size,
            language: config.fetch.language.clone(),
            subject_name: None,
            subject_code: None,
        }
    }

    /// Set the server-side subject name filter; blank clears it.
    pub fn with_subject_name(mut self, name: Option<&str>) -> Self {
        self.subject_name = non_blank(name);
        self
    }

    /// Set the server-side subject code filter; blank clears it.
    pub fn with_subject_code(mut self, code: Option<&str>) -> Self {
        self.subject_code = non_blank(code);
        self
    }

    fn field_value(&self, field: &str) -> String {
        let subject_name = self.subject_name.clone().unwrap_or_default();
        match field {
            "workType" => "EX".into(),
            "pageNo" | "srchCurrPage" => "1".into(),
            "srchOpenSchyy" => self.year.to_string(),
            "srchOpenShtm" => self.semester.code().into(),
            "srchSbjtNm" | "srchOpenSbjtNm" => subject_name,
            "srchSbjtCd" => self.subject_code.clone().unwrap_or_default(),
            "srchLanguage" => self.language.clone(),
            "srchPageSize" => self.page_size.to_string(),
            _ => String::new(),
        }
    }

    /// Form fields in request order.
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        FORM_FIELDS
            .iter()
            .map(|field| (*field, self.field_value(field)))
            .collect()
    }

    /// `application/x-www-form-urlencoded` body; also the cache key.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.form_pairs())
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fetches and caches course tables from the export endpoint.
pub struct CourseFetcher {
    config: Arc<Config>,
    client: Client,
    cache: Box<dyn FetchCache>,
}

impl CourseFetcher {
    /// Create a fetcher backed by the given cache.
    pub fn new(config: Arc<Config>, cache: Box<dyn FetchCache>) -> Result<Self> {
        let client = http::create_client(&config.fetch)?;
        Ok(Self {
            config,
            client,
            cache,
        })
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.fetch.cache_ttl_secs)
    }

    /// Return the table for `query`, from cache when still fresh.
    pub async fn fetch(&self, query: &FetchQuery) -> Result<CachedFetch> {
        let key = query.to_query_string();

        if let Some(entry) = self.cache.get(&key).await? {
            if entry.is_fresh(self.ttl(), Utc::now()) {
                log::info!("Using cached course table from {}", entry.fetched_at_kst());
                return Ok(entry);
            }
            log::debug!("Cached course table expired");
        }

        let entry = CachedFetch::new(self.download(&key).await?);
        self.cache.put(&key, &entry).await?;
        Ok(entry)
    }

    /// Drop every cached table.
    pub async fn refresh(&self) -> Result<()> {
        log::info!("Clearing course table cache");
        self.cache.clear().await
    }

    /// Clear the cache, then fetch.
    pub async fn fetch_fresh(&self, query: &FetchQuery) -> Result<CachedFetch> {
        self.refresh().await?;
        self.fetch(query).await
    }

    async fn download(&self, body: &str) -> Result<crate::models::CourseTable> {
        log::info!("Requesting course export from {}", self.config.fetch.url);

        let response = self
            .client
            .post(&self.config.fetch.url)
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::fetch(status.as_u16(), &text));
        }

        let bytes = response.bytes().await?;
        log::debug!("Received {} bytes", bytes.len());
        parse_table_bytes(&bytes)
    }
}
