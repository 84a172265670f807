// src/pipeline/search.rs

//! Course search pipeline: fetch, map columns, filter, enrich, sort.

use crate::error::Result;
use crate::models::{ColumnMap, CourseTable, FilterCriteria, SortKey, guess_columns};
use crate::pipeline::filter::{apply_filters, enrich_seat_metrics, sort_table};
use crate::services::{CourseFetcher, FetchQuery};
use crate::storage::CachedFetch;

/// Inputs of one search run.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: FetchQuery,
    pub criteria: FilterCriteria,
    pub sort: SortKey,
    /// Bypass the cache
    pub refresh: bool,
}

/// Result of one search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The snapshot the results were computed from
    pub fetched: CachedFetch,
    pub columns: ColumnMap,
    /// Filtered, enriched and sorted rows
    pub table: CourseTable,
}

/// Headline numbers for a search run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSummary {
    pub total: usize,
    pub filtered: usize,
    pub fetched_at: String,
    pub columns_detected: usize,
    pub roles_mapped: usize,
}

impl SearchOutcome {
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            total: self.fetched.table.len(),
            filtered: self.table.len(),
            fetched_at: self.fetched.fetched_at_kst(),
            columns_detected: self.fetched.table.headers().len(),
            roles_mapped: self.columns.mapped_count(),
        }
    }
}

/// Map, filter, enrich and sort an already fetched table.
pub fn process_table(
    table: &CourseTable,
    criteria: &FilterCriteria,
    sort: SortKey,
) -> (ColumnMap, CourseTable) {
    let columns = guess_columns(table);
    let filtered = apply_filters(table, &columns, criteria);
    let enriched = enrich_seat_metrics(filtered, &columns);
    let sorted = sort_table(enriched, &columns, sort);
    (columns, sorted)
}

/// Run a full search against the export endpoint.
pub async fn run_search(fetcher: &CourseFetcher, request: &SearchRequest) -> Result<SearchOutcome> {
    let fetched = if request.refresh {
        fetcher.fetch_fresh(&request.query).await?
    } else {
        fetcher.fetch(&request.query).await?
    };
    log::info!(
        "Loaded {} courses ({} columns)",
        fetched.table.len(),
        fetched.table.headers().len()
    );

    let (columns, table) = process_table(&fetched.table, &request.criteria, request.sort);
    log::info!("{} courses match", table.len());

    Ok(SearchOutcome {
        fetched,
        columns,
        table,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::Config;
    use crate::pipeline::filter::RATIO_COLUMN;
    use crate::storage::{FetchCache, MemoryCache};

    fn snapshot() -> CourseTable {
        CourseTable::new(
            ["교과목명", "정원", "신청인원", "학점"],
            vec![
                vec![Some("a".into()), Some("30".into()), Some("30".into()), Some("3".into())],
                vec![Some("b".into()), Some("30".into()), Some("15".into()), Some("3".into())],
                vec![Some("c".into()), Some("10".into()), Some("9".into()), Some("2".into())],
            ],
        )
    }

    #[test]
    fn test_process_table_chains_steps() {
        let criteria = FilterCriteria {
            seats_only: true,
            ..Default::default()
        };
        let (columns, table) = process_table(&snapshot(), &criteria, SortKey::CompetitionRatio);
        assert_eq!(columns.capacity.as_deref(), Some("정원"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "교과목명"), Some("c"));
        assert_eq!(table.cell(0, RATIO_COLUMN), Some("0.9000"));
    }

    #[tokio::test]
    async fn test_run_search_from_cache() {
        let mut config = Config::default();
        config.fetch.url = "http://127.0.0.1:9/never".to_string();
        let config = Arc::new(config);

        let query = FetchQuery::from_config(&config);
        let cache = MemoryCache::new();
        cache
            .put(&query.to_query_string(), &CachedFetch::new(snapshot()))
            .await
            .unwrap();
        let fetcher = CourseFetcher::new(Arc::clone(&config), Box::new(cache)).unwrap();

        let request = SearchRequest {
            query,
            criteria: FilterCriteria::default(),
            sort: SortKey::CourseName,
            refresh: false,
        };
        let outcome = run_search(&fetcher, &request).await.unwrap();
        let summary = outcome.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.filtered, 3);
        assert_eq!(summary.columns_detected, 4);
        assert_eq!(summary.roles_mapped, 4);
        assert!(summary.fetched_at.ends_with("+09:00"));
    }
}
