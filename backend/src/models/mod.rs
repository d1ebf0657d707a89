//! Domain models for the Same Store dataload.
//!
//! ```text
//! ReferenceRecord ─┐
//!                  ├─▶ JoinedRow ─▶ OutputRow
//! InputRow ────────┘
//! ```
//!
//! All records live for a single run; nothing here is persisted.

use serde::{Deserialize, Serialize};

/// Number of leading characters used as the approximate join key.
pub const LOOKUP_KEY_LEN: usize = 10;

/// Derive a lookup key: the first [`LOOKUP_KEY_LEN`] characters of `value`.
///
/// Counts characters, not bytes, so multi-byte names never split mid-codepoint.
pub fn lookup_key(value: &str) -> String {
    value.chars().take(LOOKUP_KEY_LEN).collect()
}

// =============================================================================
// ReferenceRecord
// =============================================================================

/// A cost center as fetched from the CRM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    pub id: String,
    pub name: String,
    pub lookup_key: String,
}

impl ReferenceRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            lookup_key: lookup_key(&name),
            name,
        }
    }
}

// =============================================================================
// InputRow
// =============================================================================

/// One row of the uploaded spreadsheet after normalization.
///
/// `category_label` is either one of the allowed labels or a
/// `"Bad Value: <original>"` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRow {
    pub code: String,
    pub category_label: String,
    pub lookup_key: String,
}

impl InputRow {
    pub fn new(code: impl Into<String>, category_label: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            lookup_key: lookup_key(&code),
            code,
            category_label: category_label.into(),
        }
    }
}

// =============================================================================
// JoinedRow
// =============================================================================

/// An input row paired with its matched reference id, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRow {
    pub input: InputRow,
    pub reference_id: Option<String>,
}

impl JoinedRow {
    pub fn is_matched(&self) -> bool {
        self.reference_id.is_some()
    }
}

// =============================================================================
// OutputRow
// =============================================================================

/// One row of the dataload spreadsheet.
///
/// Construct through [`OutputRow::new`] so that `same_store_flag` always equals
/// `reason == "Same Store"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRow {
    pub production_id: Option<String>,
    pub reason: String,
    pub same_store_flag: bool,
    pub start_date: String,
    pub end_date: String,
}

impl OutputRow {
    pub fn new(
        production_id: Option<String>,
        reason: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            production_id,
            same_store_flag: reason == crate::transform::normalize::SAME_STORE,
            reason,
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_key_truncates_to_ten_chars() {
        assert_eq!(lookup_key("ABCDEFGHIJKLMNOP"), "ABCDEFGHIJ");
        assert_eq!(lookup_key("ABC"), "ABC");
        assert_eq!(lookup_key(""), "");
    }

    #[test]
    fn test_lookup_key_counts_characters() {
        assert_eq!(lookup_key("ÉÉÉÉÉÉÉÉÉÉÉÉ"), "ÉÉÉÉÉÉÉÉÉÉ");
    }

    #[test]
    fn test_reference_record_key() {
        let rec = ReferenceRecord::new("a0B000000000001", "1001-00-00 Downtown Clinic");
        assert_eq!(rec.lookup_key, "1001-00-00");
    }

    #[test]
    fn test_output_row_flag_follows_reason() {
        let yes = OutputRow::new(None, "Same Store", "2025-07-01", "2025-09-30");
        let no = OutputRow::new(None, "same store", "2025-07-01", "2025-09-30");
        let bad = OutputRow::new(None, "Bad Value: Same Store ", "2025-07-01", "2025-09-30");
        assert!(yes.same_store_flag);
        assert!(!no.same_store_flag);
        assert!(!bad.same_store_flag);
    }
}
