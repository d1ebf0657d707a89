//! Error types for the Same Store dataload pipeline.
//!
//! This module defines one error enum per layer:
//!
//! - [`SheetError`] - spreadsheet reading errors
//! - [`CrmError`] - authentication and bulk query errors
//! - [`ConfigError`] - secrets store errors
//! - [`ExportError`] - xlsx writer errors
//! - [`DataloadError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Spreadsheet Errors
// =============================================================================

/// Errors while reading an uploaded spreadsheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV content.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// Workbook could not be decoded.
    #[error("Invalid Excel workbook: {0}")]
    ExcelError(String),

    /// Empty file.
    #[error("Spreadsheet is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in spreadsheet")]
    NoHeaders,
}

// =============================================================================
// CRM Errors
// =============================================================================

/// Errors from the CRM backend.
#[derive(Debug, Error)]
pub enum CrmError {
    /// Login rejected or token endpoint unusable.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Non-success response from the API.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Bulk job or batch ended in a failed state.
    #[error("Bulk job failed: {0}")]
    BulkJob(String),

    /// Batch did not complete within the polling budget.
    #[error("Bulk batch {batch_id} not complete after {polls} polls")]
    Timeout { batch_id: String, polls: u32 },

    /// Object name not in the known set.
    #[error("Unsupported object: {0}")]
    UnsupportedObject(String),

    /// Response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while loading the secrets store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Secrets file could not be read.
    #[error("Cannot read secrets file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Secrets file is not valid TOML or misses fields.
    #[error("Invalid secrets file: {0}")]
    Invalid(#[from] toml::de::Error),

    /// No secrets for the requested environment.
    #[error("No CRM secrets configured for environment '{0}'")]
    UnknownEnvironment(String),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the output workbook.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writer rejected a cell or failed to save.
    #[error("Failed to write {what}: {message}")]
    Xlsx { what: String, message: String },

    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    pub fn xlsx(what: impl Into<String>, err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Xlsx {
            what: what.into(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Dataload Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_dataload`].
/// Every variant is terminal for the current run.
#[derive(Debug, Error)]
pub enum DataloadError {
    /// Spreadsheet error.
    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] SheetError),

    /// CRM error.
    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    /// Secrets store error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Output workbook error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Credentials or file absent.
    #[error("Please provide {0}")]
    MissingInput(String),

    /// No header matches the category column pattern.
    #[error("No SameStore quarterly column found (expected a header like \"SameStore'25Q4_Qtrly Name\")")]
    NoCategoryColumn,

    /// A required or requested column is absent.
    #[error("Column not found: {0}")]
    UnknownColumn(String),

    /// Quarter selector text is not Q1..Q4.
    #[error("Invalid quarter: {0}")]
    InvalidQuarter(String),

    /// Pipeline reached the fetch step without a CRM connection.
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl DataloadError {
    /// Whether the error is caused by the user's input rather than the backend.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DataloadError::Sheet(_)
                | DataloadError::MissingInput(_)
                | DataloadError::NoCategoryColumn
                | DataloadError::UnknownColumn(_)
                | DataloadError::InvalidQuarter(_)
        )
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Dataload(#[from] DataloadError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for spreadsheet operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;

/// Result type for pipeline operations.
pub type DataloadResult<T> = Result<T, DataloadError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
