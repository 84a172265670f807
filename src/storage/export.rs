//! Serializers for filtered tables.

use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::models::CourseTable;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Sheet name used for spreadsheet exports.
pub const SHEET_NAME: &str = "courses";

/// CSV with a UTF-8 byte-order mark so spreadsheet apps detect Korean text.
pub fn to_csv_bytes(table: &CourseTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| crate::error::AppError::Io(e.into_error()))
}

/// Single-sheet XLSX workbook with a header row.
pub fn to_xlsx_bytes(table: &CourseTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers().iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                sheet.write_string(r as u32 + 1, col as u16, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
