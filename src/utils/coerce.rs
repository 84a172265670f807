//! Best-effort numeric coercion for spreadsheet cells.
//!
//! Course exports mix numbers with units and separators ("1,234 석",
//! "3.0학점"), so every helper here treats absence as a normal result.

use std::sync::LazyLock;

use regex::Regex;

static NON_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9\-]+").expect("valid regex"));
static NON_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]+").expect("valid regex"));

/// Trimmed cell text, or `None` for blank and "nan"-like markers.
fn meaningful(x: Option<&str>) -> Option<&str> {
    let s = x?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none") {
        return None;
    }
    Some(s)
}

/// Parse an integer after dropping everything except ASCII digits and `-`.
pub fn safe_int(x: Option<&str>) -> Option<i64> {
    let s = meaningful(x)?;
    let digits = NON_INT.replace_all(s, "");
    if digits.is_empty() || digits == "-" {
        return None;
    }
    digits.parse().ok()
}

/// Parse a float after dropping everything except ASCII digits, `.` and `-`.
pub fn safe_float(x: Option<&str>) -> Option<f64> {
    let s = meaningful(x)?;
    let digits = NON_FLOAT.replace_all(s, "");
    if matches!(digits.as_ref(), "" | "-" | "." | "-.") {
        return None;
    }
    digits.parse().ok()
}

/// True if any needle occurs literally in `text`.
pub fn contains_any<S: AsRef<str>>(text: &str, needles: &[S]) -> bool {
    needles.iter().any(|n| text.contains(n.as_ref()))
}
