//! Pipeline entry points.
//!
//! - `run_search`: fetch the export, filter, enrich and sort it
//! - `WatchSession`: watchlist state driven by the seat monitor

pub mod filter;
pub mod search;
pub mod watch;

pub use filter::{RATIO_COLUMN, REMAINING_COLUMN, apply_filters, enrich_seat_metrics, sort_table};
pub use search::{SearchOutcome, SearchRequest, SearchSummary, process_table, run_search};
pub use watch::{Registration, WatchSession};
