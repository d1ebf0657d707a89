//! REST API types for the web client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::parser::ParseResult;
use crate::transform::category::{
    detect_category_columns, select_column, CategoryColumn, ColumnChoice,
};

/// Status columns found in an uploaded sheet, for the column picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    /// Matching headers with their year and quarter, in sheet order
    pub columns: Vec<CategoryColumn>,
    /// Column used when the client does not pick one
    pub latest: Option<String>,
    pub row_count: usize,
    pub format: String,
}

impl From<&ParseResult> for ColumnsResponse {
    fn from(sheet: &ParseResult) -> Self {
        Self {
            columns: detect_category_columns(&sheet.headers),
            latest: select_column(&sheet.headers, &ColumnChoice::Latest)
                .ok()
                .map(|c| c.name),
            row_count: sheet.records.len(),
            format: sheet.format.to_string(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
