//! Secrets store and run options.
//!
//! CRM connection secrets live in a TOML file with one table per environment:
//!
//! ```toml
//! [salesforce.production]
//! instance_url = "https://example.my.salesforce.com"
//! consumer_key = "3MVG9..."
//! consumer_secret = "..."
//! api_version = "59.0"   # optional
//! ```
//!
//! User credentials are never stored here; they come with each request.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::crm::ReferenceObject;
use crate::error::ConfigError;

/// Default secrets file, relative to the working directory.
pub const DEFAULT_SECRETS_PATH: &str = "secrets.toml";

/// Environment used when none is given.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Bulk API version used when the secrets omit one.
pub const DEFAULT_API_VERSION: &str = "59.0";

/// Connection secrets for one CRM environment.
#[derive(Clone, Deserialize)]
pub struct CrmSecrets {
    pub instance_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl fmt::Debug for CrmSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmSecrets")
            .field("instance_url", &self.instance_url)
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// All configured environments, keyed by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretsStore {
    #[serde(default)]
    salesforce: BTreeMap<String, CrmSecrets>,
}

impl SecretsStore {
    /// Load the store from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse the store from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Secrets for `environment`.
    pub fn environment(&self, environment: &str) -> Result<&CrmSecrets, ConfigError> {
        self.salesforce
            .get(environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(environment.to_string()))
    }

    /// Configured environment names, sorted.
    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.salesforce.keys().map(String::as_str)
    }
}

/// Polling budget for bulk batches.
#[derive(Debug, Clone, Copy)]
pub struct BulkSettings {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 150,
        }
    }
}

/// Options for one dataload run.
#[derive(Debug, Clone)]
pub struct DataloadOptions {
    /// Reference object API name
    pub object_name: String,

    /// Query run against the reference object
    pub query: String,
}

impl Default for DataloadOptions {
    fn default() -> Self {
        let object = ReferenceObject::CostCenter;
        Self {
            object_name: object.api_name().to_string(),
            query: object.default_query(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[salesforce.production]
instance_url = "https://example.my.salesforce.com"
consumer_key = "key"
consumer_secret = "secret"

[salesforce.sandbox]
instance_url = "https://example--uat.sandbox.my.salesforce.com"
consumer_key = "key2"
consumer_secret = "secret2"
api_version = "60.0"
"#;

    #[test]
    fn test_lookup_by_environment() {
        let store = SecretsStore::from_toml(SAMPLE).unwrap();

        let prod = store.environment("production").unwrap();
        assert_eq!(prod.instance_url, "https://example.my.salesforce.com");
        assert_eq!(prod.api_version, DEFAULT_API_VERSION);

        let sandbox = store.environment("sandbox").unwrap();
        assert_eq!(sandbox.api_version, "60.0");

        assert_eq!(store.environments().collect::<Vec<_>>(), vec!["production", "sandbox"]);
    }

    #[test]
    fn test_unknown_environment() {
        let store = SecretsStore::from_toml(SAMPLE).unwrap();
        let err = store.environment("staging").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment(ref e) if e == "staging"));
    }

    #[test]
    fn test_missing_field_is_invalid() {
        let err = SecretsStore::from_toml("[salesforce.production]\ninstance_url = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = SecretsStore::load(file.path()).unwrap();
        assert!(store.environment("production").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = SecretsStore::load("/definitely/not/here/secrets.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let store = SecretsStore::from_toml(SAMPLE).unwrap();
        let text = format!("{:?}", store.environment("production").unwrap());
        assert!(!text.contains("\"secret\""));
        assert!(!text.contains("\"key\""));
        assert!(text.contains("REDACTED"));
    }

    #[test]
    fn test_default_options() {
        let opts = DataloadOptions::default();
        assert_eq!(opts.object_name, "Cost_Center__c");
        assert_eq!(opts.query, "SELECT Id, Name FROM Cost_Center__c");
    }
}
