//! Output builder: joined rows → dataload rows → xlsx bytes.

use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

use crate::error::ExportError;
use crate::models::{JoinedRow, OutputRow};
use crate::transform::quarter::DateRange;

/// Name of the downloadable file.
pub const DATALOAD_FILE_NAME: &str = "Same_Store_Dataload.xlsx";

/// Office Open XML spreadsheet MIME type.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Output columns, in order.
pub const OUTPUT_HEADERS: [&str; 5] = [
    "Cost_Center__r:Cost_Center__c:Production_Id__c",
    "Reason_for_Same_Store_Status__c",
    "Same_Store__c",
    "Start_Date__c",
    "End_Date__c",
];

/// One output row per joined row, all sharing `range`.
pub fn build_output_rows(joined: &[JoinedRow], range: &DateRange) -> Vec<OutputRow> {
    let start = range.start_date();
    let end = range.end_date();

    joined
        .iter()
        .map(|row| {
            OutputRow::new(
                row.reference_id.clone(),
                row.input.category_label.clone(),
                start.clone(),
                end.clone(),
            )
        })
        .collect()
}

/// Serialize rows to an in-memory xlsx workbook.
///
/// A missing production id is left blank so the importer sees a null.
pub fn write_xlsx(rows: &[OutputRow]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in OUTPUT_HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &bold)
            .map_err(|e| ExportError::xlsx(format!("header '{}'", header), e))?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;

        if let Some(id) = &row.production_id {
            worksheet
                .write_string(r, 0, id)
                .map_err(|e| ExportError::xlsx(format!("production id (row {})", r), e))?;
        }

        worksheet
            .write_string(r, 1, &row.reason)
            .map_err(|e| ExportError::xlsx(format!("reason (row {})", r), e))?;

        worksheet
            .write_boolean(r, 2, row.same_store_flag)
            .map_err(|e| ExportError::xlsx(format!("same store flag (row {})", r), e))?;

        worksheet
            .write_string(r, 3, &row.start_date)
            .map_err(|e| ExportError::xlsx(format!("start date (row {})", r), e))?;

        worksheet
            .write_string(r, 4, &row.end_date)
            .map_err(|e| ExportError::xlsx(format!("end date (row {})", r), e))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ExportError::xlsx("workbook", e))
}

/// Write the workbook to `path`.
pub fn write_xlsx_file(rows: &[OutputRow], path: &Path) -> Result<(), ExportError> {
    let buffer = write_xlsx(rows)?;
    std::fs::write(path, buffer)?;
    Ok(())
}
