//! Schedule text parsing.
//!
//! Schedule cells are free-form, e.g. `화(09:30~10:45) 목(09:30~10:45)`.
//! Only the `H:MM-H:MM` ranges are extracted; day tokens are matched by
//! substring in the filter pipeline.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};

const MINUTES_PER_DAY: u32 = 24 * 60;

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,2}):([0-9]{2})\s*-\s*([0-9]{1,2}):([0-9]{2})").expect("valid regex")
});

/// A time range in minutes from 00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: u32,
    pub end: u32,
}

impl TimeRange {
    /// Closed-interval overlap; touching endpoints count.
    pub fn overlaps(&self, window_start: u32, window_end: u32) -> bool {
        !(self.end < window_start || self.start > window_end)
    }
}

/// Full-width digits (`０`..`９`) as ASCII; other characters unchanged.
fn ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}

/// Extract every valid time range in order of appearance.
///
/// Full-width digits are read as ASCII digits.
pub fn parse_time_ranges(text: &str) -> Vec<TimeRange> {
    let normalized = ascii_digits(text).replace(['~', '–', '—'], "-");

    RANGE
        .captures_iter(&normalized)
        .filter_map(|caps| {
            let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
            let start = num(1)? * 60 + num(2)?;
            let end = num(3)? * 60 + num(4)?;
            (start < MINUTES_PER_DAY && end <= MINUTES_PER_DAY && end > start)
                .then_some(TimeRange { start, end })
        })
        .collect()
}

/// True if any range in `text` overlaps `[window_start, window_end]`.
pub fn schedule_overlaps(text: &str, window_start: u32, window_end: u32) -> bool {
    parse_time_ranges(text)
        .iter()
        .any(|r| r.overlaps(window_start, window_end))
}

/// Parse a user-supplied window such as `09:00-18:00` into minutes.
pub fn parse_clock_window(text: &str) -> Result<(u32, u32)> {
    parse_time_ranges(text)
        .first()
        .map(|r| (r.start, r.end))
        .ok_or_else(|| {
            AppError::validation(format!("invalid time window '{text}', expected HH:MM-HH:MM"))
        })
}

/// Format minutes from 00:00 as `HH:MM`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tilde_ranges() {
        let ranges = parse_time_ranges("화(09:30~10:45) 목(09:30~10:45)");
        assert_eq!(
            ranges,
            vec![
                TimeRange { start: 570, end: 645 },
                TimeRange { start: 570, end: 645 }
            ]
        );
    }

    #[test]
    fn test_parse_dash_variants() {
        assert_eq!(parse_time_ranges("월 9:00 – 10:15").len(), 1);
        assert_eq!(parse_time_ranges("월 9:00—10:15").len(), 1);
        assert_eq!(parse_time_ranges("월 9:00 - 10:15")[0].start, 540);
    }

    #[test]
    fn test_parse_discards_invalid() {
        assert!(parse_time_ranges("10:00-09:00").is_empty());
        assert!(parse_time_ranges("10:00-10:00").is_empty());
        assert!(parse_time_ranges("23:00-25:00").is_empty());
        assert_eq!(parse_time_ranges("23:00-24:00").len(), 1);
        assert!(parse_time_ranges("온라인").is_empty());
    }

    #[test]
    fn test_parse_full_width_digits() {
        assert_eq!(
            parse_time_ranges("화(０9:30~10:45)"),
            vec![TimeRange { start: 570, end: 645 }]
        );
        assert_eq!(parse_time_ranges("목(１３:００-１４:１５)")[0].start, 780);
    }

    #[test]
    fn test_overlap_closed_bounds() {
        let text = "화(09:30~10:45)";
        assert!(schedule_overlaps(text, 540, 600));
        assert!(!schedule_overlaps(text, 480, 540));
        assert!(schedule_overlaps(text, 480, 570));
        assert!(schedule_overlaps(text, 645, 700));
        assert!(!schedule_overlaps("", 0, 1440));
    }

    #[test]
    fn test_parse_clock_window() {
        assert_eq!(parse_clock_window("09:00-18:00").unwrap(), (540, 1080));
        assert!(parse_clock_window("morning").is_err());
        assert_eq!(format_minutes(570), "09:30");
    }
}
