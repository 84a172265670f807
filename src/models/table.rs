//! Course table: rows keyed by the labels the source happened to use.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// One row; cells line up with [`CourseTable::headers`].
pub type Row = Vec<Option<String>>;

/// An ordered table with unique column labels and optional string cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseTable {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl CourseTable {
    /// Build a table, normalizing labels and padding rows to the header width.
    ///
    /// Labels are trimmed; blank labels become `Unnamed: <index>` and repeated
    /// labels get `.1`, `.2`, ... suffixes. Blank cells are stored as missing.
    pub fn new<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = Option<String>>,
    {
        let headers = Self::normalize_headers(headers);
        let width = headers.len();

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells: Row = row
                    .into_iter()
                    .take(width)
                    .map(|cell| cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
                    .collect();
                cells.resize(width, None);
                cells
            })
            .collect();

        Self { headers, rows }
    }

    fn normalize_headers<H>(headers: H) -> Vec<String>
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for (i, raw) in headers.into_iter().enumerate() {
            let base = match raw.as_ref().trim() {
                "" => format!("Unnamed: {i}"),
                s => s.to_string(),
            };
            let mut label = base.clone();
            let mut n = 1;
            while !seen.insert(label.clone()) {
                label = format!("{base}.{n}");
                n += 1;
            }
            out.push(label);
        }
        out
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.column_index(label).is_some()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    /// Cell value by row index and column label.
    pub fn cell(&self, row: usize, label: &str) -> Option<&str> {
        let col = self.column_index(label)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(keep);
    }

    /// Reorder rows with a stable comparison.
    pub fn sort_rows_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Row, &Row) -> std::cmp::Ordering,
    {
        self.rows.sort_by(compare);
    }

    /// Append a derived column. Returns false if the label already exists.
    pub fn push_column<I>(&mut self, label: &str, values: I) -> bool
    where
        I: IntoIterator<Item = Option<String>>,
    {
        if self.has_column(label) {
            return false;
        }
        self.headers.push(label.to_string());

        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().flatten());
        }
        true
    }

    /// Sorted, de-duplicated, non-blank values of one column.
    pub fn distinct_values(&self, label: &str) -> Vec<String> {
        let Some(col) = self.column_index(label) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row[col].as_deref())
            .filter(|v| !v.trim().is_empty() && !v.eq_ignore_ascii_case("nan"))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
