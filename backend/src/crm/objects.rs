//! Registry of CRM objects the pipeline may query.
//!
//! Object names arrive as strings (options, CLI flags). They are resolved
//! here against a fixed set before any request is made.

use std::fmt;
use std::str::FromStr;

use crate::error::CrmError;

/// A queryable reference object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceObject {
    /// Cost centers: canonical location identifiers and names.
    CostCenter,
}

impl ReferenceObject {
    /// Every supported object.
    pub const ALL: [ReferenceObject; 1] = [ReferenceObject::CostCenter];

    /// API name used in bulk jobs and SOQL.
    pub fn api_name(self) -> &'static str {
        match self {
            ReferenceObject::CostCenter => "Cost_Center__c",
        }
    }

    /// Query selecting the join fields.
    pub fn default_query(self) -> String {
        format!("SELECT Id, Name FROM {}", self.api_name())
    }

    /// Resolve an API name, rejecting anything outside [`Self::ALL`].
    pub fn from_name(name: &str) -> Result<Self, CrmError> {
        Self::ALL
            .into_iter()
            .find(|object| object.api_name() == name.trim())
            .ok_or_else(|| CrmError::UnsupportedObject(name.to_string()))
    }
}

impl FromStr for ReferenceObject {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for ReferenceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_object() {
        let object: ReferenceObject = "Cost_Center__c".parse().unwrap();
        assert_eq!(object, ReferenceObject::CostCenter);
        assert_eq!(object.default_query(), "SELECT Id, Name FROM Cost_Center__c");
    }

    #[test]
    fn test_unsupported_object() {
        let err = ReferenceObject::from_name("Account").unwrap_err();
        assert!(matches!(err, CrmError::UnsupportedObject(ref n) if n == "Account"));
        assert!(err.to_string().contains("Unsupported object"));
    }

    #[test]
    fn test_name_is_case_sensitive() {
        assert!(ReferenceObject::from_name("cost_center__c").is_err());
    }
}
