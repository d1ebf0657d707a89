//! Per-session context.
//!
//! Everything the user provides across interactions (credentials, uploaded
//! file, column and quarter choice) plus the authenticated connection lives
//! here and is passed explicitly to the pipeline. A session is created when
//! the user starts, and [`Session::clear`] drops it all on logout.

use crate::crm::{CrmConnector, Credentials};
use crate::error::{DataloadError, DataloadResult};
use crate::transform::category::ColumnChoice;
use crate::transform::quarter::DateSource;

/// An uploaded spreadsheet.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Column and quarter picked by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub column: ColumnChoice,
    pub dates: DateSource,
}

/// Session state, generic over the connection type.
#[derive(Debug)]
pub struct Session<C> {
    credentials: Option<Credentials>,
    upload: Option<Upload>,
    pub selection: Selection,
    connection: Option<C>,
}

impl<C> Default for Session<C> {
    fn default() -> Self {
        Self {
            credentials: None,
            upload: None,
            selection: Selection::default(),
            connection: None,
        }
    }
}

impl<C> Session<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replacing credentials drops any existing connection.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.connection = None;
        self.credentials = Some(credentials);
    }

    pub fn set_upload(&mut self, upload: Upload) {
        self.upload = Some(upload);
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn upload(&self) -> Option<&Upload> {
        self.upload.as_ref()
    }

    pub fn connection(&self) -> Option<&C> {
        self.connection.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.connection.is_some()
    }

    /// Fail with a user-facing message unless credentials and a file are present.
    pub fn require_inputs(&self) -> DataloadResult<(&Credentials, &Upload)> {
        match (&self.credentials, &self.upload) {
            (Some(c), Some(u)) if c.is_complete() && !u.bytes.is_empty() => Ok((c, u)),
            _ => Err(DataloadError::MissingInput(
                "username, password, and upload a file".to_string(),
            )),
        }
    }

    /// Authenticate with the stored credentials.
    ///
    /// On failure the connection is left unset, so steps that need it refuse
    /// to run.
    pub async fn login<K>(&mut self, connector: &K) -> DataloadResult<&C>
    where
        K: CrmConnector<Connection = C>,
    {
        self.connection = None;

        let credentials = self
            .credentials
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or_else(|| DataloadError::MissingInput("username and password".to_string()))?;

        let connection = connector.connect(credentials).await?;
        Ok(self.connection.insert(connection))
    }

    /// Drop credentials, upload, selection and connection.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::testing::{FakeConnection, FakeConnector};

    fn connector() -> FakeConnector {
        FakeConnector::with_cost_centers("pw", &[("a01", "1001-00-00")])
    }

    #[test]
    fn test_missing_inputs() {
        let mut session: Session<FakeConnection> = Session::new();
        assert!(matches!(session.require_inputs(), Err(DataloadError::MissingInput(_))));

        session.set_credentials(Credentials::new("user", "pw"));
        assert!(session.require_inputs().is_err());

        session.set_upload(Upload::new("empty.xlsx", Vec::new()));
        assert!(session.require_inputs().is_err());

        session.set_upload(Upload::new("s.csv", b"Code\n1".to_vec()));
        assert!(session.require_inputs().is_ok());
    }

    #[tokio::test]
    async fn test_login_success_sets_connection() {
        let mut session = Session::new();
        session.set_credentials(Credentials::new("user", "pw"));

        session.login(&connector()).await.unwrap();
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_connection_unset() {
        let mut session = Session::new();
        session.set_credentials(Credentials::new("user", "pw"));
        session.login(&connector()).await.unwrap();

        session.set_credentials(Credentials::new("user", "wrong"));
        let err = session.login(&connector()).await.unwrap_err();

        assert!(err.to_string().contains("authentication failure"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let mut session = Session::new();
        session.set_credentials(Credentials::new("user", "pw"));
        session.set_upload(Upload::new("s.csv", b"Code\n1".to_vec()));
        session.login(&connector()).await.unwrap();

        session.clear();

        assert!(session.credentials().is_none());
        assert!(session.upload().is_none());
        assert!(!session.is_authenticated());
        assert_eq!(session.selection, Selection::default());
    }
}
