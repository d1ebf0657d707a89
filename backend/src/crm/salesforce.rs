//! Salesforce implementation of the CRM traits.
//!
//! - Login: OAuth2 username-password flow against `/services/oauth2/token`.
//! - Query: Bulk API 1.0 with JSON content. One job, one batch, one chunk per
//!   result set, job closed afterwards whatever the outcome.
//!
//! Nothing here retries. Polling a running batch is bounded by
//! [`BulkSettings`].

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{BulkQuery, CrmConnector, Credentials, ReferenceObject};
use crate::config::{BulkSettings, CrmSecrets};
use crate::error::{CrmError, CrmResult};

/// Logs users in against one configured environment.
#[derive(Debug, Clone)]
pub struct SalesforceConnector {
    secrets: CrmSecrets,
    bulk: BulkSettings,
    client: Client,
}

/// An authenticated session.
#[derive(Clone)]
pub struct SalesforceConnection {
    client: Client,
    access_token: String,
    instance_url: String,
    api_version: String,
    bulk: BulkSettings,
}

impl std::fmt::Debug for SalesforceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceConnection")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchInfo {
    id: String,
    state: String,
    #[serde(default)]
    state_message: Option<String>,
}

impl SalesforceConnector {
    pub fn new(secrets: CrmSecrets) -> Self {
        Self {
            secrets,
            bulk: BulkSettings::default(),
            client: Client::new(),
        }
    }

    /// Override the batch polling budget
    pub fn with_bulk_settings(mut self, bulk: BulkSettings) -> Self {
        self.bulk = bulk;
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/services/oauth2/token",
            self.secrets.instance_url.trim_end_matches('/')
        )
    }
}

impl CrmConnector for SalesforceConnector {
    type Connection = SalesforceConnection;

    async fn connect(&self, credentials: &Credentials) -> CrmResult<SalesforceConnection> {
        tracing::debug!(username = %credentials.username, url = %self.token_url(), "requesting access token");

        let params = [
            ("grant_type", "password"),
            ("client_id", self.secrets.consumer_key.as_str()),
            ("client_secret", self.secrets.consumer_secret.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| CrmError::Authentication(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CrmError::Authentication(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<OAuthError>(&body) {
                Ok(err) if err.error_description.is_empty() => err.error,
                Ok(err) => format!("{}: {}", err.error, err.error_description),
                Err(_) => format!("{} {}", status.as_u16(), body),
            };
            return Err(CrmError::Authentication(message));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CrmError::Authentication(format!("unexpected token response: {}", e)))?;

        Ok(SalesforceConnection {
            client: self.client.clone(),
            access_token: token.access_token,
            instance_url: token
                .instance_url
                .unwrap_or_else(|| self.secrets.instance_url.clone())
                .trim_end_matches('/')
                .to_string(),
            api_version: self.secrets.api_version.clone(),
            bulk: self.bulk,
        })
    }
}

impl SalesforceConnection {
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn bulk_url(&self, path: &str) -> String {
        format!(
            "{}/services/async/{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    async fn send(&self, request: RequestBuilder) -> CrmResult<Response> {
        let response = request
            .header("X-SFDC-Session", &self.access_token)
            .send()
            .await
            .map_err(|e| CrmError::HttpError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "(no body)".to_string());
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("exceptionMessage")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);

        Err(CrmError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> CrmResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| CrmError::InvalidResponse(e.to_string()))
    }

    async fn create_job(&self, object: ReferenceObject) -> CrmResult<String> {
        let body = json!({
            "operation": "query",
            "object": object.api_name(),
            "contentType": "JSON"
        });

        let job: Value = self
            .send_json(self.client.post(self.bulk_url("job")).json(&body))
            .await?;

        job.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CrmError::InvalidResponse("job response without id".to_string()))
    }

    async fn create_batch(&self, job_id: &str, soql: &str) -> CrmResult<BatchInfo> {
        let request = self
            .client
            .post(self.bulk_url(&format!("job/{}/batch", job_id)))
            .header("Content-Type", "application/json")
            .body(soql.to_string());

        self.send_json(request).await
    }

    async fn wait_for_batch(&self, job_id: &str, batch: BatchInfo) -> CrmResult<()> {
        let mut state = batch.state;
        let mut message = batch.state_message;

        for poll in 0..=self.bulk.max_polls {
            match state.as_str() {
                "Completed" => return Ok(()),
                "Failed" | "Not Processed" => {
                    return Err(CrmError::BulkJob(format!(
                        "batch {} {}: {}",
                        batch.id,
                        state,
                        message.unwrap_or_default()
                    )))
                }
                _ if poll == self.bulk.max_polls => break,
                _ => {}
            }

            tracing::debug!(batch = %batch.id, %state, poll, "waiting for bulk batch");
            tokio::time::sleep(self.bulk.poll_interval).await;

            let info: BatchInfo = self
                .send_json(
                    self.client
                        .get(self.bulk_url(&format!("job/{}/batch/{}", job_id, batch.id))),
                )
                .await?;
            state = info.state;
            message = info.state_message;
        }

        Err(CrmError::Timeout {
            batch_id: batch.id,
            polls: self.bulk.max_polls,
        })
    }

    async fn fetch_results(&self, job_id: &str, batch_id: &str) -> CrmResult<Vec<Vec<Value>>> {
        let result_path = format!("job/{}/batch/{}/result", job_id, batch_id);
        let result_ids: Vec<String> = self
            .send_json(self.client.get(self.bulk_url(&result_path)))
            .await?;

        let mut chunks = Vec::with_capacity(result_ids.len());
        for result_id in result_ids {
            let chunk: Vec<Value> = self
                .send_json(
                    self.client
                        .get(self.bulk_url(&format!("{}/{}", result_path, result_id))),
                )
                .await?;
            chunks.push(chunk);
        }

        Ok(chunks)
    }

    async fn close_job(&self, job_id: &str) -> CrmResult<()> {
        let body = json!({ "state": "Closed" });
        self.send(
            self.client
                .post(self.bulk_url(&format!("job/{}", job_id)))
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    async fn run_batch(&self, job_id: &str, soql: &str) -> CrmResult<Vec<Vec<Value>>> {
        let batch = self.create_batch(job_id, soql).await?;
        let batch_id = batch.id.clone();
        self.wait_for_batch(job_id, batch).await?;
        self.fetch_results(job_id, &batch_id).await
    }
}

impl BulkQuery for SalesforceConnection {
    async fn bulk_query(&self, object: ReferenceObject, soql: &str) -> CrmResult<Vec<Vec<Value>>> {
        let job_id = self.create_job(object).await?;
        tracing::debug!(job = %job_id, %object, "bulk job created");

        let result = self.run_batch(&job_id, soql).await;

        if let Err(e) = self.close_job(&job_id).await {
            tracing::warn!(job = %job_id, error = %e, "failed to close bulk job");
        }

        result
    }
}
