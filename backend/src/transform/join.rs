//! Left join of input rows onto the reference table by lookup key.
//!
//! Input order is kept. An input row whose key is shared by several reference
//! records yields one joined row per record, in reference order. An input
//! row with no match is kept once with no reference id.
//!
//! An empty lookup key never matches: a blank code or a nameless cost center
//! carries no identity to join on.

use std::collections::HashMap;

use crate::models::{InputRow, JoinedRow, ReferenceRecord};

#[derive(Debug, Clone, Default)]
pub struct JoinResult {
    pub rows: Vec<JoinedRow>,
    /// Input rows without a reference match
    pub unmatched: usize,
    /// Lookup keys carried by more than one reference record
    pub ambiguous_keys: Vec<String>,
}

pub fn left_join(inputs: Vec<InputRow>, reference: &[ReferenceRecord]) -> JoinResult {
    let mut index: HashMap<&str, Vec<&ReferenceRecord>> = HashMap::new();
    for record in reference.iter().filter(|r| !r.lookup_key.is_empty()) {
        index.entry(record.lookup_key.as_str()).or_default().push(record);
    }

    let mut ambiguous_keys: Vec<String> = index
        .iter()
        .filter(|(_, records)| records.len() > 1)
        .map(|(key, _)| key.to_string())
        .collect();
    ambiguous_keys.sort();

    let mut result = JoinResult {
        ambiguous_keys,
        ..JoinResult::default()
    };

    for input in inputs {
        let matches = if input.lookup_key.is_empty() {
            None
        } else {
            index.get(input.lookup_key.as_str())
        };

        match matches {
            Some(matches) => {
                for record in matches {
                    result.rows.push(JoinedRow {
                        input: input.clone(),
                        reference_id: Some(record.id.clone()),
                    });
                }
            }
            None => {
                result.unmatched += 1;
                result.rows.push(JoinedRow {
                    input,
                    reference_id: None,
                });
            }
        }
    }

    result
}
