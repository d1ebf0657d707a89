//! Reference fetch: bulk query → cleaned records → reference table.

use serde_json::Value;

use super::{strip_metadata, BulkQuery, ReferenceObject};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::CrmResult;
use crate::models::ReferenceRecord;
use crate::parser::cell_to_string;

/// Run `query` against `object_name` and return the concatenated,
/// metadata-free records.
///
/// The object name is checked against [`ReferenceObject::ALL`] first.
/// Errors propagate unchanged; nothing is retried.
pub async fn fetch_and_clean<Q: BulkQuery>(
    source: &Q,
    object_name: &str,
    query: &str,
) -> CrmResult<Vec<Value>> {
    let object = ReferenceObject::from_name(object_name)?;

    log_info(format!("Querying {}...", object));
    let chunks = source.bulk_query(object, query).await?;

    let chunk_count = chunks.len();
    let records: Vec<Value> = chunks.into_iter().flatten().collect();
    log_success(format!(
        "Fetched {} records in {} chunk(s)",
        records.len(),
        chunk_count
    ));

    Ok(strip_metadata(records))
}

/// Build (id, name, lookup key) rows from cleaned records.
///
/// Records without an `Id` cannot be join targets and are skipped.
pub fn reference_table(records: &[Value]) -> Vec<ReferenceRecord> {
    let mut table = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        let Some(id) = record.get("Id").and_then(cell_to_string) else {
            skipped += 1;
            continue;
        };
        let name = record
            .get("Name")
            .and_then(cell_to_string)
            .unwrap_or_default();
        table.push(ReferenceRecord::new(id, name));
    }

    if skipped > 0 {
        log_warning(format!("{} reference records without Id skipped", skipped));
    }

    table
}

/// Fetch and materialize the reference table in one step.
pub async fn fetch_reference_table<Q: BulkQuery>(
    source: &Q,
    object_name: &str,
    query: &str,
) -> CrmResult<Vec<ReferenceRecord>> {
    let records = fetch_and_clean(source, object_name, query).await?;
    Ok(reference_table(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::testing::FakeConnector;
    use crate::crm::{CrmConnector, Credentials};
    use crate::error::CrmError;
    use serde_json::json;

    #[test]
    fn test_reference_table_keys() {
        let records = vec![
            json!({ "Id": "a01", "Name": "1001-00-00 Downtown" }),
            json!({ "Id": "a02", "Name": "Short" }),
            json!({ "Name": "No id here" }),
            json!({ "Id": "a03", "Name": null }),
        ];

        let table = reference_table(&records);
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].lookup_key, "1001-00-00");
        assert_eq!(table[1].lookup_key, "Short");
        assert_eq!(table[2].name, "");
        assert_eq!(table[2].lookup_key, "");
    }

    #[tokio::test]
    async fn test_fetch_concatenates_chunks_in_order() {
        let connector = FakeConnector::with_cost_centers(
            "pw",
            &[("a01", "AAAAAAAAAA-1"), ("a02", "BBBBBBBBBB-2"), ("a03", "CCCCCCCCCC-3")],
        );
        let conn = connector.connect(&Credentials::new("u", "pw")).await.unwrap();

        let records = fetch_and_clean(&conn, "Cost_Center__c", "SELECT Id, Name FROM Cost_Center__c")
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r["Id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a01", "a02", "a03"]);
        assert!(records.iter().all(|r| r.get("attributes").is_none()));
    }

    #[tokio::test]
    async fn test_fetch_rejects_unknown_object() {
        let connector = FakeConnector::with_cost_centers("pw", &[("a01", "X")]);
        let conn = connector.connect(&Credentials::new("u", "pw")).await.unwrap();

        let err = fetch_and_clean(&conn, "Account", "SELECT Id FROM Account")
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::UnsupportedObject(_)));
    }
}
