// src/models/mod.rs

//! Domain models for the course search application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod columns;
mod config;
mod criteria;
mod table;
mod term;
mod watch;

// Re-export all public types
pub use columns::{ColumnMap, Role, guess_columns};
pub use config::{Config, FetchConfig, FilterConfig, MonitorConfig, RowColumns, TermConfig};
pub use criteria::{DAY_TOKENS, ENGLISH_MARKERS, FilterCriteria, SortKey};
pub use table::{CourseTable, Row};
pub use term::Semester;
pub use watch::{SeatRecord, WatchEntry, WatchKey, WatchState};
