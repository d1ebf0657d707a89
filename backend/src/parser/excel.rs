//! Excel workbook reader (first worksheet only).

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Map, Number, Value};
use std::io::Cursor;

use super::{ParseResult, SheetFormat};
use crate::error::{SheetError, SheetResult};

/// Read the first worksheet of an xlsx/xls workbook.
pub fn parse_workbook(bytes: &[u8], format: SheetFormat) -> SheetResult<ParseResult> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SheetError::ExcelError(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::EmptyFile)?
        .map_err(|e| SheetError::ExcelError(e.to_string()))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(SheetError::EmptyFile)?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string().trim().to_string(),
        })
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(SheetError::NoHeaders);
    }

    let mut records = Vec::new();
    for row in rows {
        let cells: Vec<Value> = row.iter().map(cell_to_value).collect();
        if cells.iter().all(Value::is_null) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = cells.get(i).cloned().unwrap_or(Value::Null);
            obj.insert(header.clone(), cell);
        }
        records.push(Value::Object(obj));
    }

    Ok(ParseResult {
        records,
        headers,
        format,
    })
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(_) => Value::Null,
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_bytes;
    use rust_xlsxwriter::Workbook;

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Code").unwrap();
        sheet.write_string(0, 1, "Region").unwrap();
        sheet.write_string(0, 2, "SameStore'25Q3_Qtrly Name").unwrap();
        sheet.write_number(1, 0, 1001.0).unwrap();
        sheet.write_string(1, 1, "West").unwrap();
        sheet.write_string(1, 2, "Same Store").unwrap();
        sheet.write_string(2, 0, "1002-00-00X").unwrap();
        sheet.write_string(2, 1, "East").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_reads_first_sheet() {
        let result = parse_bytes(&workbook_bytes()).unwrap();

        assert_eq!(result.format, SheetFormat::Xlsx);
        assert_eq!(
            result.headers,
            vec!["Code", "Region", "SameStore'25Q3_Qtrly Name"]
        );
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_cells_become_json() {
        let result = parse_bytes(&workbook_bytes()).unwrap();

        assert_eq!(result.records[0]["Code"].as_f64(), Some(1001.0));
        assert_eq!(result.records[0]["SameStore'25Q3_Qtrly Name"], "Same Store");
        assert_eq!(result.records[1]["Code"], "1002-00-00X");
        assert_eq!(result.records[1]["SameStore'25Q3_Qtrly Name"], Value::Null);
    }

    #[test]
    fn test_garbage_zip_is_an_excel_error() {
        let bytes = b"PK\x03\x04not really a workbook";
        assert!(matches!(parse_bytes(bytes), Err(SheetError::ExcelError(_))));
    }
}
