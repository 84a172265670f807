//! Filter and sort selections for one pass over a course table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Markers that flag a course as taught in English.
pub const ENGLISH_MARKERS: [&str; 3] = ["영어", "English", "ENG"];

/// Day tokens as they appear in schedule text.
pub const DAY_TOKENS: [&str; 7] = ["월", "화", "수", "목", "금", "토", "일"];

/// User-selected predicates. Unset fields never narrow the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub keyword: String,
    pub departments: Vec<String>,
    pub professors: Vec<String>,
    pub campuses: Vec<String>,
    pub english_only: bool,
    /// Inclusive credit range
    pub credits: Option<(f64, f64)>,
    pub seats_only: bool,
    pub days: Vec<String>,
    /// Inclusive window in minutes from 00:00
    pub time_window: Option<(u32, u32)>,
}

impl FilterCriteria {
    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Selectable sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    /// Course name, ascending
    #[default]
    #[serde(rename = "name")]
    CourseName,
    /// Competition ratio, descending
    #[serde(rename = "ratio")]
    CompetitionRatio,
    /// Remaining seats, descending
    #[serde(rename = "remaining")]
    RemainingSeats,
    /// Credits, descending
    #[serde(rename = "credits")]
    Credits,
    /// Course code, ascending
    #[serde(rename = "code")]
    CourseCode,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CourseName => "name",
            SortKey::CompetitionRatio => "ratio",
            SortKey::RemainingSeats => "remaining",
            SortKey::Credits => "credits",
            SortKey::CourseCode => "code",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "교과목명" => Ok(SortKey::CourseName),
            "ratio" | "경쟁률(계산)" => Ok(SortKey::CompetitionRatio),
            "remaining" | "잔여석(계산)" => Ok(SortKey::RemainingSeats),
            "credits" | "학점" => Ok(SortKey::Credits),
            "code" | "학수번호/교과목번호" => Ok(SortKey::CourseCode),
            other => Err(AppError::validation(format!(
                "unknown sort key '{other}' (expected name, ratio, remaining, credits or code)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_criteria_is_empty() {
        assert!(FilterCriteria::default().is_empty());
        let criteria = FilterCriteria {
            seats_only: true,
            ..Default::default()
        };
        assert!(!criteria.is_empty());
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("ratio".parse::<SortKey>().unwrap(), SortKey::CompetitionRatio);
        assert_eq!("학점".parse::<SortKey>().unwrap(), SortKey::Credits);
        assert!("random".parse::<SortKey>().is_err());
    }
}
