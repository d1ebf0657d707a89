//! CRM access: login, bulk query and reference table fetch.
//!
//! ```text
//! ┌─────────────┐  connect   ┌────────────────┐  bulk_query   ┌──────────────┐
//! │ Credentials │──────────▶│ CrmConnection  │─────────────▶│ result chunks│
//! └─────────────┘            └────────────────┘               └──────┬───────┘
//!                                                                    │ strip "attributes"
//!                                                                    ▼
//!                                                          ┌──────────────────┐
//!                                                          │ ReferenceRecord[] │
//!                                                          └──────────────────┘
//! ```
//!
//! The two traits below are the seam between the pipeline and the network:
//! [`salesforce`] implements them over HTTP, tests implement them in memory.

pub mod clean;
pub mod fetch;
pub mod objects;
pub mod salesforce;

use serde_json::Value;
use std::fmt;
use std::future::Future;

use crate::error::CrmResult;

pub use clean::{strip_key, strip_metadata, TRANSPORT_METADATA_KEY};
pub use fetch::{fetch_and_clean, fetch_reference_table, reference_table};
pub use objects::ReferenceObject;
pub use salesforce::{SalesforceConnection, SalesforceConnector};

/// Username and password typed by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields non-blank.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Something that can log a user in.
pub trait CrmConnector {
    type Connection: BulkQuery;

    /// Authenticate and return a live connection.
    fn connect(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = CrmResult<Self::Connection>> + Send;
}

/// An authenticated connection able to run bulk queries.
pub trait BulkQuery {
    /// Run `soql` against `object` and return the result sets in server order.
    fn bulk_query(
        &self,
        object: ReferenceObject,
        soql: &str,
    ) -> impl Future<Output = CrmResult<Vec<Vec<Value>>>> + Send;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory connector used by pipeline and API tests.

    use super::*;
    use crate::error::CrmError;
    use serde_json::json;

    #[derive(Debug, Clone)]
    pub struct FakeConnector {
        pub password: String,
        pub chunks: Vec<Vec<Value>>,
    }

    #[derive(Debug, Clone)]
    pub struct FakeConnection {
        pub chunks: Vec<Vec<Value>>,
    }

    impl FakeConnector {
        /// Accepts `password`; serves the given cost centers as two chunks.
        pub fn with_cost_centers(password: &str, centers: &[(&str, &str)]) -> Self {
            let records: Vec<Value> = centers
                .iter()
                .map(|(id, name)| {
                    json!({
                        "attributes": { "type": "Cost_Center__c", "url": format!("/sobjects/Cost_Center__c/{}", id) },
                        "Id": id,
                        "Name": name
                    })
                })
                .collect();
            let mid = records.len() / 2;
            Self {
                password: password.to_string(),
                chunks: vec![records[..mid].to_vec(), records[mid..].to_vec()],
            }
        }
    }

    impl CrmConnector for FakeConnector {
        type Connection = FakeConnection;

        async fn connect(&self, credentials: &Credentials) -> CrmResult<FakeConnection> {
            if credentials.password != self.password {
                return Err(CrmError::Authentication(
                    "invalid_grant: authentication failure".to_string(),
                ));
            }
            Ok(FakeConnection {
                chunks: self.chunks.clone(),
            })
        }
    }

    impl BulkQuery for FakeConnection {
        async fn bulk_query(&self, _object: ReferenceObject, _soql: &str) -> CrmResult<Vec<Vec<Value>>> {
            Ok(self.chunks.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_complete() {
        assert!(Credentials::new("user@example.com", "pw").is_complete());
        assert!(!Credentials::new("  ", "pw").is_complete());
        assert!(!Credentials::new("user@example.com", "").is_complete());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let text = format!("{:?}", Credentials::new("user@example.com", "hunter2"));
        assert!(text.contains("user@example.com"));
        assert!(!text.contains("hunter2"));
    }
}
