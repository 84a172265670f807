//! Course table decoding.
//!
//! The export endpoint's content type is unreliable: depending on the
//! deployment it answers with a legacy `.xls`, an `.xlsx`, or an HTML page
//! holding a spreadsheet-like table. Each decoder is tried in order and the
//! first success wins.

use std::fmt;
use std::io::Cursor;

use calamine::{Data, Reader, Xls, Xlsx, open_workbook_from_rs};
use encoding_rs::{Encoding, UTF_8};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::CourseTable;

type ParseFn = fn(&[u8]) -> Result<CourseTable>;

/// Decoders in priority order.
const PARSERS: [(&str, ParseFn); 5] = [
    ("xls", parse_xls),
    ("xlsx", parse_xlsx),
    ("html/utf-8", parse_html_utf8),
    ("html/cp949", parse_html_cp949),
    ("html/euc-kr", parse_html_euc_kr),
];

/// Decode a downloaded export into a course table.
pub fn parse_table_bytes(content: &[u8]) -> Result<CourseTable> {
    let mut failures = Vec::new();

    for (name, parse) in PARSERS {
        match parse(content) {
            Ok(table) => {
                log::debug!(
                    "Parsed {} rows x {} columns as {}",
                    table.len(),
                    table.headers().len(),
                    name
                );
                return Ok(table);
            }
            Err(e) => {
                log::debug!("Decoder {} rejected content: {}", name, e);
                failures.push(format!("{name}: {e}"));
            }
        }
    }

    Err(AppError::parse(format!(
        "not a spreadsheet or HTML table ({})",
        failures.join("; ")
    )))
}

fn parse_xls(content: &[u8]) -> Result<CourseTable> {
    read_first_sheet::<Xls<Cursor<&[u8]>>>(content)
}

fn parse_xlsx(content: &[u8]) -> Result<CourseTable> {
    read_first_sheet::<Xlsx<Cursor<&[u8]>>>(content)
}

fn parse_html_utf8(content: &[u8]) -> Result<CourseTable> {
    parse_html_table(&decode(content, "utf-8")?)
}

fn parse_html_cp949(content: &[u8]) -> Result<CourseTable> {
    parse_html_table(&decode(content, "windows-949")?)
}

fn parse_html_euc_kr(content: &[u8]) -> Result<CourseTable> {
    parse_html_table(&decode(content, "euc-kr")?)
}

/// Read the first worksheet; its first row holds the labels.
fn read_first_sheet<'a, R>(content: &'a [u8]) -> Result<CourseTable>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: fmt::Display,
{
    let mut workbook: R = open_workbook_from_rs(Cursor::new(content)).map_err(parse_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::parse("workbook has no worksheets"))?
        .map_err(parse_err)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| AppError::parse("worksheet is empty"))?
        .iter()
        .map(|cell| cell_text(cell).unwrap_or_default())
        .collect();

    let body = rows.map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    Ok(CourseTable::new(headers, body))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
        other => Some(other.to_string()),
    }
}

/// Decode bytes with the named encoding. UTF-8 is strict so that legacy
/// Korean pages fall through to the CP949 attempt instead of turning into
/// replacement characters.
fn decode(content: &[u8], label: &str) -> Result<String> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| AppError::parse(format!("unknown encoding {label}")))?;

    if encoding == UTF_8 {
        return encoding
            .decode_without_bom_handling_and_without_replacement(content)
            .map(|text| text.into_owned())
            .ok_or_else(|| AppError::parse("content is not valid UTF-8"));
    }

    let (text, _, _) = encoding.decode(content);
    Ok(text.into_owned())
}

/// Extract the first `<table>` of an HTML document.
///
/// The header is the first row containing `<th>` cells (or the first row);
/// data rows are the following rows that contain `<td>` cells.
pub fn parse_html_table(html: &str) -> Result<CourseTable> {
    let document = Html::parse_document(html);
    let table_sel = parse_selector("table")?;
    let row_sel = parse_selector("tr")?;
    let th_sel = parse_selector("th")?;
    let td_sel = parse_selector("td")?;
    let cell_sel = parse_selector("th, td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| AppError::parse("no <table> element"))?;

    let rows: Vec<ElementRef> = table.select(&row_sel).collect();
    let header_pos = rows
        .iter()
        .position(|row| row.select(&th_sel).next().is_some())
        .unwrap_or(0);
    let header_row = rows
        .get(header_pos)
        .ok_or_else(|| AppError::parse("table has no rows"))?;

    let headers: Vec<String> = header_row.select(&cell_sel).map(element_text).collect();
    if headers.is_empty() {
        return Err(AppError::parse("table header has no cells"));
    }

    let body = rows[header_pos + 1..]
        .iter()
        .filter(|row| row.select(&td_sel).next().is_some())
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| Some(element_text(cell)))
                .collect::<Vec<_>>()
        });

    Ok(CourseTable::new(headers, body))
}

fn element_text(element: ElementRef) -> String {
    let raw = element.text().collect::<Vec<_>>().join(" ");
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_err(e: impl fmt::Display) -> AppError {
    AppError::parse(e.to_string())
}
