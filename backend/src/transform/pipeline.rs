//! High-level dataload pipeline.
//!
//! This module strings the stages together for one run:
//!
//! ```text
//! upload ──parse──▶ select column ──▶ resolve dates
//!                                          │
//! credentials ──login──▶ bulk fetch ──▶ reference table
//!                                          │
//!         normalize ──▶ left join ──▶ output rows ──▶ Dataload
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use samestore::crm::{Credentials, SalesforceConnector};
//! use samestore::session::{Session, Upload};
//! use samestore::transform::pipeline::run_dataload;
//!
//! let mut session = Session::new();
//! session.set_credentials(Credentials::new("user@example.com", "secret"));
//! session.set_upload(Upload::new("status.xlsx", std::fs::read("status.xlsx")?));
//!
//! let dataload = run_dataload(&mut session, &connector, &Default::default()).await?;
//! println!("{} rows", dataload.rows.len());
//! ```

use serde::Serialize;
use serde_json::Value;

use super::category::{select_column, CategoryColumn, CODE_COLUMN};
use super::join::left_join;
use super::normalize::normalize_rows;
use super::quarter::DateRange;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::DataloadOptions;
use crate::crm::{fetch_reference_table, CrmConnector};
use crate::error::{DataloadError, DataloadResult};
use crate::export::build_output_rows;
use crate::models::{OutputRow, ReferenceRecord};
use crate::parser::{parse_bytes, ParseResult};
use crate::session::{Selection, Session};

/// What happened during a run, for display next to the download.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataloadReport {
    /// Status column the labels were read from
    pub column: String,
    pub date_range: DateRange,
    pub reference_count: usize,
    /// Data rows in the uploaded sheet
    pub input_rows: usize,
    /// Rows dropped for an empty status
    pub dropped_rows: usize,
    /// Distinct unrecognized status values
    pub bad_values: Vec<String>,
    pub unmatched_rows: usize,
    pub output_rows: usize,
}

/// Output of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct Dataload {
    pub rows: Vec<OutputRow>,
    pub report: DataloadReport,
}

/// An upload that has been parsed and checked, ready to be joined.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub sheet: ParseResult,
    pub column: CategoryColumn,
    pub date_range: DateRange,
}

/// Parse the upload and resolve column and dates from the user's selection.
///
/// Runs before login so a bad file fails without touching the CRM.
pub fn prepare_upload(bytes: &[u8], selection: &Selection) -> DataloadResult<PreparedUpload> {
    let sheet = parse_bytes(bytes)?;
    log_success(format!(
        "Read {} rows ({}, {} columns)",
        sheet.records.len(),
        sheet.format,
        sheet.headers.len()
    ));

    let column = select_column(&sheet.headers, &selection.column)?;
    if !sheet.has_column(CODE_COLUMN) {
        return Err(DataloadError::UnknownColumn(CODE_COLUMN.to_string()));
    }
    log_info(format!("Using status column \"{}\"", column.name));

    let date_range = selection.dates.resolve(&column)?;
    log_info(format!("Dataload period: {}", date_range));

    Ok(PreparedUpload {
        sheet,
        column,
        date_range,
    })
}

/// Normalize, join and build output rows. No I/O.
pub fn build_dataload(
    records: &[Value],
    column: &CategoryColumn,
    date_range: DateRange,
    reference: &[ReferenceRecord],
) -> Dataload {
    let normalized = normalize_rows(records, CODE_COLUMN, &column.name);
    if normalized.dropped > 0 {
        log_info(format!("{} rows without a status dropped", normalized.dropped));
    }
    if !normalized.bad_values.is_empty() {
        log_warning(format!(
            "{} rows with unrecognized status: {}",
            normalized.bad_row_count(),
            normalized.bad_values.join(", ")
        ));
    }

    let joined = left_join(normalized.rows, reference);
    if !joined.ambiguous_keys.is_empty() {
        log_warning(format!(
            "Lookup keys shared by several cost centers: {}",
            joined.ambiguous_keys.join(", ")
        ));
    }
    if joined.unmatched > 0 {
        log_warning(format!("{} rows matched no cost center", joined.unmatched));
    }

    let rows = build_output_rows(&joined.rows, &date_range);

    let report = DataloadReport {
        column: column.name.clone(),
        date_range,
        reference_count: reference.len(),
        input_rows: records.len(),
        dropped_rows: normalized.dropped,
        bad_values: normalized.bad_values,
        unmatched_rows: joined.unmatched,
        output_rows: rows.len(),
    };

    Dataload { rows, report }
}

/// Run the whole dataload for the session.
///
/// Logs in first if the session has no connection yet. A login failure
/// leaves the session unauthenticated and produces no output.
pub async fn run_dataload<K: CrmConnector>(
    session: &mut Session<K::Connection>,
    connector: &K,
    options: &DataloadOptions,
) -> DataloadResult<Dataload> {
    let (_, upload) = session.require_inputs()?;
    log_info(format!("📖 Reading {}...", upload.file_name));
    let prepared = prepare_upload(&upload.bytes, &session.selection)?;

    if !session.is_authenticated() {
        log_info("🔐 Logging in...");
        session.login(connector).await?;
        log_success("Logged in");
    }
    let connection = session.connection().ok_or(DataloadError::NotAuthenticated)?;

    let reference =
        fetch_reference_table(connection, &options.object_name, &options.query).await?;
    log_success(format!("{} cost centers loaded", reference.len()));

    let dataload = build_dataload(
        &prepared.sheet.records,
        &prepared.column,
        prepared.date_range,
        &reference,
    );
    log_success(format!("✅ {} dataload rows ready", dataload.rows.len()));

    Ok(dataload)
}
