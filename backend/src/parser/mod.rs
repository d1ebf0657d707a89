//! Spreadsheet reader for uploaded status files.
//!
//! Accepts Excel workbooks (xlsx / legacy xls) and delimited text. The format
//! is sniffed from the leading bytes, so callers only hand over raw bytes:
//!
//! ```text
//! ┌───────────────┐   PK\x03\x04   ┌──────────┐
//! │  raw bytes    │──────────────▶│  excel   │──┐
//! │  (upload)     │   D0 CF 11 E0  └──────────┘  │    ┌─────────────┐
//! │               │──────────────▶              ├───▶│ ParseResult │
//! │               │   otherwise    ┌──────────┐  │    └─────────────┘
//! │               │──────────────▶│   csv    │──┘
//! └───────────────┘               └──────────┘
//! ```
//!
//! Every data row becomes a JSON object keyed by header. Empty cells are
//! `null`, so "absent" has one representation regardless of source format.

pub mod excel;

use serde_json::{Map, Number, Value};
use std::path::Path;

use crate::error::{SheetError, SheetResult};

/// Detected source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Xls,
    Csv { encoding: String, delimiter: char },
}

impl std::fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetFormat::Xlsx => write!(f, "xlsx"),
            SheetFormat::Xls => write!(f, "xls"),
            SheetFormat::Csv { encoding, delimiter } => {
                write!(f, "csv ({}, '{}')", encoding, format_delimiter(*delimiter))
            }
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows as JSON objects
    pub records: Vec<Value>,
    /// Column headers, in sheet order
    pub headers: Vec<String>,
    /// Detected format
    pub format: SheetFormat,
}

impl ParseResult {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Read a spreadsheet file from disk.
pub fn parse_file<P: AsRef<Path>>(path: P) -> SheetResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}

/// Parse spreadsheet bytes, picking the reader from the leading bytes.
pub fn parse_bytes(bytes: &[u8]) -> SheetResult<ParseResult> {
    if bytes.is_empty() {
        return Err(SheetError::EmptyFile);
    }

    if bytes.starts_with(ZIP_MAGIC) {
        excel::parse_workbook(bytes, SheetFormat::Xlsx)
    } else if bytes.starts_with(CFB_MAGIC) {
        excel::parse_workbook(bytes, SheetFormat::Xls)
    } else {
        parse_csv_bytes(bytes)
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let text = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Detect the delimiter by counting occurrences in the header line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    [',', ';', '\t', '|']
        .into_iter()
        .map(|sep| (sep, first_line.matches(sep).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(sep, _)| sep)
        .unwrap_or(',')
}

/// Parse delimited text bytes with encoding and delimiter auto-detection.
pub fn parse_csv_bytes(bytes: &[u8]) -> SheetResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let (headers, records) = parse_csv_str(&content, delimiter)?;

    Ok(ParseResult {
        records,
        headers,
        format: SheetFormat::Csv { encoding, delimiter },
    })
}

/// Parse CSV text with an explicit delimiter.
///
/// Headers are trimmed, cell text is kept as written. Short rows are padded
/// with `null`, extra cells are ignored and rows whose cells are all empty are
/// skipped.
pub fn parse_csv_str(content: &str, delimiter: char) -> SheetResult<(Vec<String>, Vec<Value>)> {
    if content.trim().is_empty() {
        return Err(SheetError::EmptyFile);
    }

    let delimiter = u8::try_from(delimiter)
        .map_err(|_| SheetError::ParseError(format!("unsupported delimiter '{}'", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SheetError::ParseError(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(SheetError::NoHeaders);
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let row = result.map_err(|e| SheetError::ParseError(format!("line {}: {}", line, e)))?;

        if row.iter().all(str::is_empty) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let cell = match row.get(i) {
                Some(v) if !v.is_empty() => Value::String(v.to_string()),
                _ => Value::Null,
            };
            obj.insert(header.clone(), cell);
        }
        records.push(Value::Object(obj));
    }

    Ok((headers, records))
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

// =============================================================================
// Cell casting
// =============================================================================

/// Cast a cell to text the way a spreadsheet user reads it.
///
/// `null` is absent. Integral floats lose their `.0` so numeric codes read
/// back as typed (`12345.0` → `"12345"`).
pub fn cell_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(number_to_string(n)),
        other => Some(other.to_string()),
    }
}

fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_csv() {
        let csv = "Code;Status\n1001;Same Store\n1002;Sold";
        let (headers, rows) = parse_csv_str(csv, ';').unwrap();

        assert_eq!(headers, vec!["Code", "Status"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Code"], "1001");
        assert_eq!(rows[1]["Status"], "Sold");
    }

    #[test]
    fn test_quoted_values_keep_delimiters() {
        let csv = "Code,Name\n\"1001\",\"Clinic, North\"";
        let (_, rows) = parse_csv_str(csv, ',').unwrap();

        assert_eq!(rows[0]["Code"], "1001");
        assert_eq!(rows[0]["Name"], "Clinic, North");
    }

    #[test]
    fn test_cells_keep_whitespace() {
        let csv = " Code , Status \nX,\"Non-SS \"\n";
        let (headers, rows) = parse_csv_str(csv, ',').unwrap();

        assert_eq!(headers, vec!["Code", "Status"]);
        assert_eq!(rows[0]["Status"], "Non-SS ");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a;b\n1;2\n\n;\n3;4\n";
        let (_, rows) = parse_csv_str(csv, ';').unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_values_are_null() {
        let csv = "a;b;c\n1;;3\n4";
        let (_, rows) = parse_csv_str(csv, ';').unwrap();

        assert_eq!(rows[0]["b"], Value::Null);
        assert_eq!(rows[1]["a"], "4");
        assert_eq!(rows[1]["c"], Value::Null);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let csv = "a;b\n1;2;3;4";
        let (_, rows) = parse_csv_str(csv, ';').unwrap();

        assert_eq!(rows[0].as_object().unwrap().len(), 2);
        assert_eq!(rows[0]["b"], "2");
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv_str("", ','), Err(SheetError::EmptyFile)));
        assert!(matches!(parse_bytes(b""), Err(SheetError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_parse_csv_with_quarter_header() {
        let csv = "Code,SameStore'25Q4_Qtrly Name\n1001,Same Store\n";
        let result = parse_bytes(csv.as_bytes()).unwrap();

        assert!(matches!(result.format, SheetFormat::Csv { delimiter: ',', .. }));
        assert!(result.has_column("SameStore'25Q4_Qtrly Name"));
        assert_eq!(result.records[0]["SameStore'25Q4_Qtrly Name"], "Same Store");
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let bytes = "\u{feff}Code,Status\n1,Sold".as_bytes();
        let result = parse_bytes(bytes).unwrap();
        assert_eq!(result.headers[0], "Code");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Value::Null), None);
        assert_eq!(cell_to_string(&json!("1001-A")).as_deref(), Some("1001-A"));
        assert_eq!(cell_to_string(&json!(12345)).as_deref(), Some("12345"));
        assert_eq!(cell_to_string(&json!(12345.0)).as_deref(), Some("12345"));
        assert_eq!(cell_to_string(&json!(12.5)).as_deref(), Some("12.5"));
        assert_eq!(cell_to_string(&json!(true)).as_deref(), Some("True"));
    }
}
