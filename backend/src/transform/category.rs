//! Detection of the quarterly status column.
//!
//! Uploaded files carry one column per quarter, named like
//! `SameStore'25Q4_Qtrly Name`. The two digits are the year within the 2000s.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::quarter::Quarter;
use crate::error::{DataloadError, DataloadResult};

/// Column holding the cost center code.
pub const CODE_COLUMN: &str = "Code";

static CATEGORY_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^SameStore['’](\d{2})Q([1-4])_Qtrly Name$").expect("valid category column regex")
});

/// A header recognized as a quarterly status column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryColumn {
    pub name: String,
    pub year: i32,
    pub quarter: Quarter,
}

/// How the status column is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnChoice {
    /// Most recent quarter present in the file.
    #[default]
    Latest,
    /// Exactly this header.
    Named(String),
}

/// Parse a header, returning `None` when it is not a status column.
pub fn parse_category_column(header: &str) -> Option<CategoryColumn> {
    let caps = CATEGORY_COLUMN_RE.captures(header.trim())?;
    let yy: i32 = caps[1].parse().ok()?;
    let quarter = caps[2].parse::<u32>().ok().and_then(Quarter::from_number)?;

    Some(CategoryColumn {
        name: header.to_string(),
        year: 2000 + yy,
        quarter,
    })
}

/// Every status column, in header order.
pub fn detect_category_columns<S: AsRef<str>>(headers: &[S]) -> Vec<CategoryColumn> {
    headers
        .iter()
        .filter_map(|h| parse_category_column(h.as_ref()))
        .collect()
}

/// Pick the status column according to `choice`.
pub fn select_column<S: AsRef<str>>(
    headers: &[S],
    choice: &ColumnChoice,
) -> DataloadResult<CategoryColumn> {
    match choice {
        ColumnChoice::Latest => detect_category_columns(headers)
            .into_iter()
            .max_by_key(|c| (c.year, c.quarter))
            .ok_or(DataloadError::NoCategoryColumn),
        ColumnChoice::Named(name) => {
            if !headers.iter().any(|h| h.as_ref() == name) {
                return Err(DataloadError::UnknownColumn(name.clone()));
            }
            parse_category_column(name).ok_or(DataloadError::NoCategoryColumn)
        }
    }
}
