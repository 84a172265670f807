//! Utility functions and helpers.

pub mod coerce;
pub mod display;
pub mod http;
pub mod schedule;
pub mod wait;

pub use coerce::{contains_any, safe_float, safe_int};
pub use schedule::{TimeRange, parse_clock_window, parse_time_ranges, schedule_overlaps};
pub use wait::wait_until;
