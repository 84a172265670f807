//! Service layer for the course search application.
//!
//! - Table decoding (`parse_table_bytes`)
//! - Bulk export download with caching (`CourseFetcher`)
//! - Search-page seat lookup (`SeatMonitor`)
//! - Chrome-backed search session (`BrowserSession`, feature `browser`)

#[cfg(feature = "browser")]
mod browser;
mod fetch;
pub(crate) mod monitor;
mod parse;

#[cfg(feature = "browser")]
pub use browser::BrowserSession;
pub use fetch::{CourseFetcher, FetchQuery};
pub use monitor::{SearchSession, SeatMonitor, find_section, fingerprint};
pub use parse::{parse_html_table, parse_table_bytes};
