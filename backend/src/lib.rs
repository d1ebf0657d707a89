//! # Same Store - quarterly same-store dataload builder
//!
//! Turns a quarterly status spreadsheet into a dataload file for the
//! `Cost_Center__c` object: statuses are cleaned up, matched to cost centers
//! fetched from the CRM, and exported with the quarter's start and end dates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Status file │────▶│   Parser    │────▶│  Normalize  │────▶│             │
//! │ (xlsx/csv)  │     │ (auto-fmt)  │     │ (allow-list)│     │  Left join  │
//! └─────────────┘     └─────────────┘     └─────────────┘     │ (10 chars)  │
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     │             │
//! │     CRM     │────▶│ Bulk query  │────▶│  Reference  │────▶│             │
//! │   (login)   │     │  (chunks)   │     │    table    │     └──────┬──────┘
//! └─────────────┘     └─────────────┘     └─────────────┘            ▼
//!                                                            ┌─────────────┐
//!                                                            │ Dataload    │
//!                                                            │ .xlsx       │
//!                                                            └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use samestore::{run_dataload, write_xlsx, Credentials, Session, Upload};
//!
//! let mut session = Session::new();
//! session.set_credentials(Credentials::new("user@example.com", "secret"));
//! session.set_upload(Upload::new("status.xlsx", std::fs::read("status.xlsx")?));
//!
//! let dataload = run_dataload(&mut session, &connector, &Default::default()).await?;
//! std::fs::write("Same_Store_Dataload.xlsx", write_xlsx(&dataload.rows)?)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Records flowing through the pipeline
//! - [`parser`] - Spreadsheet reading with format detection
//! - [`crm`] - Login, bulk query and reference table
//! - [`transform`] - Column detection, normalization, join and pipeline
//! - [`export`] - Output rows and xlsx writer
//! - [`session`] - Per-user session state
//! - [`config`] - Secrets store and run options
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;

// Input
pub mod parser;

// CRM
pub mod crm;

// Transformation
pub mod transform;

// Output
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CrmError, DataloadError, DataloadResult, ExportError, ServerError, SheetError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{lookup_key, InputRow, JoinedRow, OutputRow, ReferenceRecord, LOOKUP_KEY_LEN};

// =============================================================================
// Re-exports - Config and session
// =============================================================================

pub use config::{BulkSettings, CrmSecrets, DataloadOptions, SecretsStore};
pub use session::{Selection, Session, Upload};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{parse_bytes, parse_file, ParseResult, SheetFormat};

// =============================================================================
// Re-exports - CRM
// =============================================================================

pub use crm::{
    BulkQuery, CrmConnector, Credentials, ReferenceObject, SalesforceConnection,
    SalesforceConnector,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{run_dataload, Dataload, DataloadReport};
pub use transform::{ColumnChoice, DateRange, DateSource, Quarter};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{write_xlsx, write_xlsx_file, DATALOAD_FILE_NAME};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
