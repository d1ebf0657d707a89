//! Input normalizer: project, drop, map synonyms, validate, derive keys.
//!
//! Steps, in order:
//!
//! 1. Keep only the code and status columns.
//! 2. Drop rows whose status cell is empty.
//! 3. Replace known synonyms (exact match).
//! 4. Tag anything outside the allow-list as `"Bad Value: <original>"`.
//! 5. Derive the lookup key from the code.
//!
//! A bad value is not an error. The row flows through the pipeline so the
//! user can see and correct it in the output.

use serde::Serialize;
use serde_json::Value;

use crate::models::InputRow;
use crate::parser::cell_to_string;

/// The one label that sets the same-store flag.
pub const SAME_STORE: &str = "Same Store";

/// Canonical status labels.
pub const ALLOWED_LABELS: [&str; 9] = [
    SAME_STORE,
    "Acquisition",
    "Discontinued",
    "Expansion",
    "Greenfield",
    "Non Same Store",
    "Significant Event",
    "Sold",
    "Unconsolidated JV",
];

/// Spellings seen in uploads and their canonical label.
pub const SYNONYMS: [(&str, &str); 4] = [
    ("2024 - Acquisition", "Acquisition"),
    ("2025 - Acquisition", "Acquisition"),
    ("Non-SS", "Non Same Store"),
    ("Greenfield Excl", "Greenfield"),
];

/// Prefix of a tagged, unrecognized status.
pub const BAD_VALUE_PREFIX: &str = "Bad Value: ";

pub fn is_allowed(label: &str) -> bool {
    ALLOWED_LABELS.contains(&label)
}

/// Apply the synonym map; unknown values pass through unchanged.
pub fn apply_synonym(raw: &str) -> &str {
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == raw)
        .map(|(_, to)| *to)
        .unwrap_or(raw)
}

/// Synonym substitution followed by allow-list validation.
pub fn canonical_label(raw: &str) -> String {
    let label = apply_synonym(raw);
    if is_allowed(label) {
        label.to_string()
    } else {
        format!("{}{}", BAD_VALUE_PREFIX, raw)
    }
}

pub fn is_bad_value(label: &str) -> bool {
    label.starts_with(BAD_VALUE_PREFIX)
}

/// Normalized rows plus what was dropped or tagged on the way.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeResult {
    pub rows: Vec<InputRow>,
    /// Rows without a status value
    pub dropped: usize,
    /// Distinct unrecognized values, in first-seen order
    pub bad_values: Vec<String>,
}

impl NormalizeResult {
    pub fn bad_row_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| is_bad_value(&r.category_label))
            .count()
    }
}

/// Normalize parsed sheet records.
///
/// A missing code becomes the empty string: the row is kept and will not match.
pub fn normalize_rows(records: &[Value], code_column: &str, category_column: &str) -> NormalizeResult {
    let mut result = NormalizeResult::default();

    for record in records {
        let Some(raw) = record
            .get(category_column)
            .and_then(cell_to_string)
            .filter(|s| !s.is_empty())
        else {
            result.dropped += 1;
            continue;
        };

        let label = canonical_label(&raw);
        if is_bad_value(&label) && !result.bad_values.contains(&raw) {
            result.bad_values.push(raw);
        }

        let code = record
            .get(code_column)
            .and_then(cell_to_string)
            .unwrap_or_default();

        result.rows.push(InputRow::new(code, label));
    }

    result
}
