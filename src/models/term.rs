//! Academic term codes used by the registration endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Semester within an academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    #[default]
    First,
    Summer,
    Second,
    Winter,
}

impl Semester {
    /// Value of the `srchOpenShtm` form field.
    pub fn code(self) -> &'static str {
        match self {
            Semester::First => "U000200001U000300001",
            Semester::Summer => "U000200001U000300002",
            Semester::Second => "U000200002U000300001",
            Semester::Winter => "U000200002U000300002",
        }
    }

    /// Korean display name.
    pub fn display_name(self) -> &'static str {
        match self {
            Semester::First => "1학기",
            Semester::Summer => "여름학기",
            Semester::Second => "2학기",
            Semester::Winter => "겨울학기",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Semester {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "first" | "1학기" => Ok(Semester::First),
            "2" | "summer" | "여름학기" => Ok(Semester::Summer),
            "3" | "second" | "2학기" => Ok(Semester::Second),
            "4" | "winter" | "겨울학기" => Ok(Semester::Winter),
            other => Err(AppError::validation(format!("unknown semester '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Semester::First.code(), "U000200001U000300001");
        assert_eq!(Semester::Second.code(), "U000200002U000300001");
    }

    #[test]
    fn test_parse_numeric_and_named() {
        assert_eq!("3".parse::<Semester>().unwrap(), Semester::Second);
        assert_eq!("Winter".parse::<Semester>().unwrap(), Semester::Winter);
        assert!("fall".parse::<Semester>().is_err());
    }
}
