// src/utils/display.rs

//! Plain-text rendering for terminal output.
//!
//! Widths count Hangul and other East Asian wide characters as two columns.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{CourseTable, SeatRecord, WatchEntry, WatchState};

/// Widest a table column is allowed to get.
pub const MAX_COLUMN_WIDTH: usize = 28;

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6)
}

fn grapheme_width(g: &str) -> usize {
    match g.chars().next() {
        Some(c) if is_wide(c) => 2,
        Some(_) => 1,
        None => 0,
    }
}

/// Terminal columns taken by `text`.
pub fn display_width(text: &str) -> usize {
    text.graphemes(true).map(grapheme_width).sum()
}

/// Cut `text` to at most `width` columns, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if display_width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for g in text.graphemes(true) {
        let w = grapheme_width(g);
        if used + w + 1 > width {
            break;
        }
        out.push_str(g);
        used += w;
    }
    out.push('…');
    out
}

/// Truncate or right-pad `text` to exactly `width` columns.
pub fn fit(text: &str, width: usize) -> String {
    let cut = truncate(text, width);
    let pad = width.saturating_sub(display_width(&cut));
    format!("{cut}{}", " ".repeat(pad))
}

/// Render up to `limit` rows of the named columns. Unknown labels are skipped.
pub fn render_table(table: &CourseTable, columns: &[&str], limit: usize) -> String {
    let cols: Vec<(&str, usize)> = columns
        .iter()
        .filter_map(|label| table.column_index(label).map(|i| (*label, i)))
        .collect();
    if cols.is_empty() {
        return String::new();
    }

    let rows = &table.rows()[..table.len().min(limit)];
    let widths: Vec<usize> = cols
        .iter()
        .map(|(label, i)| {
            rows.iter()
                .filter_map(|row| row[*i].as_deref())
                .map(display_width)
                .chain(std::iter::once(display_width(label)))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(text, w)| fit(text, *w))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(cols.iter().map(|(label, _)| *label).collect()));
    out.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for row in rows {
        out.push(line(
            cols.iter()
                .map(|(_, i)| row[*i].as_deref().unwrap_or(""))
                .collect(),
        ));
    }
    if table.len() > limit {
        out.push(format!("… {} more rows", table.len() - limit));
    }
    out.join("\n")
}

/// Fill bar for enrolled / capacity, capped at full.
pub fn seat_bar(record: &SeatRecord, width: usize) -> String {
    let filled = ((record.ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!(
        "[{}{}] {}/{}",
        "█".repeat(filled),
        "░".repeat(width - filled),
        record.enrolled,
        record.capacity
    )
}

/// One line per watch entry.
pub fn render_watchlist(entries: &[&WatchEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let key = fit(&entry.key.to_string(), 16);
            match &entry.state {
                WatchState::Pending => format!("{key} 조회 대기"),
                WatchState::Error(message) => format!("{key} 오류: {message}"),
                WatchState::Resolved(record) => format!(
                    "{key} {} {} {} {:.2} {}",
                    fit(&record.title, 24),
                    fit(&record.professor, 10),
                    seat_bar(record, 20),
                    record.ratio,
                    record.status()
                ),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `key: value` block under a title, in the style of a run summary.
pub fn summary(title: &str, items: &[(&str, String)]) -> String {
    let width = items.iter().map(|(k, _)| display_width(k)).max().unwrap_or(0);
    let mut out = vec![format!("[SUMMARY] {title}")];
    out.extend(
        items
            .iter()
            .map(|(k, v)| format!("    {}: {v}", fit(k, width))),
    );
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchKey;

    #[test]
    fn test_display_width_counts_hangul_double() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("자료구조"), 8);
        assert_eq!(display_width("A반"), 3);
    }

    #[test]
    fn test_truncate_and_fit() {
        assert_eq!(truncate("자료구조", 8), "자료구조");
        assert_eq!(truncate("자료구조", 6), "자료…");
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(display_width(&fit("자료구조와 알고리즘", 10)), 10);
    }

    #[test]
    fn test_render_table_limits_rows() {
        let table = CourseTable::new(
            ["교과목명", "학점", "비고"],
            vec![
                vec![Some("자료구조".to_string()), Some("3".to_string()), None],
                vec![Some("운영체제".to_string()), Some("4".to_string()), None],
            ],
        );
        let out = render_table(&table, &["교과목명", "없음", "학점"], 1);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "교과목명 │ 학점");
        assert_eq!(lines[2], "자료구조 │ 3");
        assert_eq!(lines[3], "… 1 more rows");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_seat_bar() {
        let half = SeatRecord::new("a".into(), "b".into(), 40, 20);
        assert_eq!(seat_bar(&half, 4), "[██░░] 20/40");
        let over = SeatRecord::new("a".into(), "b".into(), 10, 15);
        assert_eq!(seat_bar(&over, 4), "[████] 15/10");
    }

    #[test]
    fn test_render_watchlist_states() {
        let key = WatchKey::new("445.206", "001").unwrap();
        let pending = WatchEntry::pending(key.clone());
        let failed = WatchEntry {
            state: WatchState::Error("row not found".into()),
            ..WatchEntry::pending(key)
        };
        let out = render_watchlist(&[&pending, &failed]);
        assert!(out.lines().next().unwrap().ends_with("조회 대기"));
        assert!(out.ends_with("오류: row not found"));
    }

    #[test]
    fn test_summary_aligns_keys() {
        let out = summary("Search", &[("total", "3".into()), ("fetched at", "now".into())]);
        assert_eq!(out, "[SUMMARY] Search\n    total     : 3\n    fetched at: now");
    }
}
