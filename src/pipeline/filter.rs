// src/pipeline/filter.rs

//! Local filtering, seat metrics and ordering over a fetched course table.

use std::cmp::Ordering;

use crate::models::{ColumnMap, CourseTable, ENGLISH_MARKERS, FilterCriteria, Row, SortKey};
use crate::utils::{contains_any, safe_float, safe_int, schedule_overlaps};

/// Derived remaining-seat column.
pub const REMAINING_COLUMN: &str = "잔여석(계산)";

/// Derived competition-ratio column.
pub const RATIO_COLUMN: &str = "경쟁률(계산)";

fn cell(row: &Row, col: usize) -> Option<&str> {
    row.get(col).and_then(|c| c.as_deref())
}

fn column(table: &CourseTable, label: &Option<String>) -> Option<usize> {
    label.as_deref().and_then(|l| table.column_index(l))
}

/// Capacity minus enrolled, missing cells counted as zero.
fn seats_left(row: &Row, cap: usize, enr: usize) -> i64 {
    safe_int(cell(row, cap))
        .unwrap_or(0)
        .saturating_sub(safe_int(cell(row, enr)).unwrap_or(0))
}

/// Enrolled over capacity, `None` unless finite.
fn seat_ratio(row: &Row, cap: usize, enr: usize) -> Option<f64> {
    let ratio = safe_float(cell(row, enr))? / safe_float(cell(row, cap))?;
    ratio.is_finite().then_some(ratio)
}

/// Rows of `table` satisfying every predicate set in `criteria`.
///
/// Predicates whose column was not mapped are skipped. A missing cell never
/// satisfies a text predicate.
pub fn apply_filters(table: &CourseTable, map: &ColumnMap, criteria: &FilterCriteria) -> CourseTable {
    let mut out = table.clone();
    let before = out.len();

    let keyword = criteria.keyword.trim().to_lowercase();
    if !keyword.is_empty() {
        let cols: Vec<usize> = [
            &map.course_name,
            &map.course_code,
            &map.class_no,
            &map.dept,
            &map.professor,
            &map.schedule,
        ]
        .into_iter()
        .filter_map(|label| column(table, label))
        .collect();

        if !cols.is_empty() {
            out.retain_rows(|row| {
                cols.iter().any(|&c| {
                    cell(row, c).is_some_and(|v| v.to_lowercase().contains(&keyword))
                })
            });
        }
    }

    for (label, selected) in [
        (&map.dept, &criteria.departments),
        (&map.professor, &criteria.professors),
        (&map.campus, &criteria.campuses),
    ] {
        if selected.is_empty() {
            continue;
        }
        if let Some(c) = column(table, label) {
            out.retain_rows(|row| cell(row, c).is_some_and(|v| selected.iter().any(|s| s == v)));
        }
    }

    if criteria.english_only {
        if let Some(c) = column(table, &map.language) {
            out.retain_rows(|row| cell(row, c).is_some_and(|v| contains_any(v, &ENGLISH_MARKERS)));
        }
    }

    if let Some((low, high)) = criteria.credits {
        if let Some(c) = column(table, &map.credits) {
            out.retain_rows(|row| {
                safe_float(cell(row, c)).is_some_and(|credits| low <= credits && credits <= high)
            });
        }
    }

    if criteria.seats_only {
        if let Some(c) = column(table, &map.remaining) {
            out.retain_rows(|row| safe_int(cell(row, c)).unwrap_or(0) > 0);
        } else if let (Some(cap), Some(enr)) =
            (column(table, &map.capacity), column(table, &map.enrolled))
        {
            out.retain_rows(|row| seats_left(row, cap, enr) > 0);
        }
    }

    if let Some(c) = column(table, &map.schedule) {
        if !criteria.days.is_empty() {
            out.retain_rows(|row| cell(row, c).is_some_and(|v| contains_any(v, &criteria.days)));
        }
        if let Some((start, end)) = criteria.time_window {
            out.retain_rows(|row| cell(row, c).is_some_and(|v| schedule_overlaps(v, start, end)));
        }
    }

    log::debug!("Filters kept {} of {} rows", out.len(), before);
    out
}

/// Add remaining-seat and competition-ratio columns unless already present.
pub fn enrich_seat_metrics(mut table: CourseTable, map: &ColumnMap) -> CourseTable {
    let remaining = column(&table, &map.remaining);
    let capacity = column(&table, &map.capacity);
    let enrolled = column(&table, &map.enrolled);

    if !table.has_column(REMAINING_COLUMN) {
        let values: Vec<Option<String>> = table
            .rows()
            .iter()
            .map(|row| match (remaining, capacity, enrolled) {
                (Some(r), _, _) => safe_int(cell(row, r)).map(|n| n.to_string()),
                (None, Some(cap), Some(enr)) => Some(seats_left(row, cap, enr).to_string()),
                _ => None,
            })
            .collect();
        table.push_column(REMAINING_COLUMN, values);
    }

    if !table.has_column(RATIO_COLUMN) {
        let values: Vec<Option<String>> = table
            .rows()
            .iter()
            .map(|row| {
                let ratio = seat_ratio(row, capacity?, enrolled?)?;
                Some(format!("{ratio:.4}"))
            })
            .collect();
        table.push_column(RATIO_COLUMN, values);
    }

    table
}

/// Missing values always order after present ones.
fn missing_last<T>(a: Option<T>, b: Option<T>, present: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => present(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by `key`. Leaves the table untouched if the key column is absent.
///
/// Competition ratio orders on the unrounded enrolled / capacity value when
/// both seat columns are mapped, and on the ratio column otherwise.
pub fn sort_table(mut table: CourseTable, map: &ColumnMap, key: SortKey) -> CourseTable {
    let label = match key {
        SortKey::CourseName => map.course_name.as_deref(),
        SortKey::CourseCode => map.course_code.as_deref(),
        SortKey::Credits => map.credits.as_deref(),
        SortKey::CompetitionRatio => Some(RATIO_COLUMN),
        SortKey::RemainingSeats => Some(REMAINING_COLUMN),
    };
    let Some(col) = label.and_then(|l| table.column_index(l)) else {
        log::debug!("Sort column for '{key}' not present; keeping order");
        return table;
    };

    match key {
        SortKey::CourseName | SortKey::CourseCode => {
            table.sort_rows_by(|a, b| missing_last(cell(a, col), cell(b, col), |x, y| x.cmp(y)));
        }
        SortKey::CompetitionRatio => {
            let seats = column(&table, &map.capacity).zip(column(&table, &map.enrolled));
            let ratio = |row: &Row| match seats {
                Some((cap, enr)) => seat_ratio(row, cap, enr),
                None => safe_float(cell(row, col)),
            };
            table.sort_rows_by(|a, b| missing_last(ratio(a), ratio(b), |x, y| y.total_cmp(&x)));
        }
        SortKey::Credits => {
            table.sort_rows_by(|a, b| {
                missing_last(safe_float(cell(a, col)), safe_float(cell(b, col)), |x, y| {
                    y.total_cmp(&x)
                })
            });
        }
        SortKey::RemainingSeats => {
            table.sort_rows_by(|a, b| {
                missing_last(safe_int(cell(a, col)), safe_int(cell(b, col)), |x, y| y.cmp(&x))
            });
        }
    }
    table
}
