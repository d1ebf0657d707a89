//! HTTP Server for the Same Store dataload.
//!
//! Each request carries everything a run needs (credentials, file, column
//! and quarter), so the server keeps no session between requests.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/api/dataload`   | Run the dataload, returns the xlsx file  |
//! | POST   | `/api/columns`    | List the status columns of a sheet       |
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_warning, LOG_BROADCASTER};
use super::types::{error_response, ColumnsResponse};
use crate::config::DataloadOptions;
use crate::crm::{CrmConnector, Credentials};
use crate::error::{CrmError, DataloadError, ServerError, ServerResult};
use crate::export::{write_xlsx, DATALOAD_FILE_NAME, XLSX_MIME};
use crate::parser::parse_bytes;
use crate::session::{Selection, Session, Upload};
use crate::transform::category::ColumnChoice;
use crate::transform::pipeline::run_dataload;
use crate::transform::quarter::{DateSource, Quarter};

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared handler state.
pub struct AppState<K> {
    connector: Arc<K>,
    options: Arc<DataloadOptions>,
}

impl<K> Clone for AppState<K> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            options: Arc::clone(&self.options),
        }
    }
}

/// Build the application router.
pub fn router<K>(connector: K, options: DataloadOptions) -> Router
where
    K: CrmConnector + Send + Sync + 'static,
    K::Connection: Send + Sync,
{
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let state = AppState {
        connector: Arc::new(connector),
        options: Arc::new(options),
    };

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/dataload", post(create_dataload::<K>))
        .route("/api/columns", post(list_columns))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server<K>(port: u16, connector: K, options: DataloadOptions) -> ServerResult<()>
where
    K: CrmConnector + Send + Sync + 'static,
    K::Connection: Send + Sync,
{
    let app = router(connector, options);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(format!("Cannot bind {}: {}", addr, e)))?;

    tracing::info!("🚀 Same Store server running on http://localhost:{}", port);
    tracing::info!("   POST /api/dataload - Build dataload file");
    tracing::info!("   POST /api/columns  - List status columns");
    tracing::info!("   GET  /api/logs     - SSE log stream");
    tracing::info!("   GET  /health       - Health check");

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "samestore",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "dataload": "POST /api/dataload",
            "columns": "POST /api/columns",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

// =============================================================================
// Dataload
// =============================================================================

/// Multipart fields of a dataload request.
#[derive(Debug, Default)]
struct DataloadForm {
    username: Option<String>,
    password: Option<String>,
    file: Option<Upload>,
    quarter: Option<String>,
    year: Option<String>,
    column: Option<String>,
}

impl DataloadForm {
    async fn read(mut multipart: Multipart) -> ServerResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                form.file = Some(Upload::new(file_name, bytes.to_vec()));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;

            match name.as_str() {
                "username" => form.username = Some(value),
                "password" => form.password = Some(value),
                "quarter" => form.quarter = non_blank(value),
                "year" => form.year = non_blank(value),
                "column" => form.column = non_blank(value),
                other => log_warning(format!("Ignoring unknown form field '{}'", other)),
            }
        }

        Ok(form)
    }

    fn selection(&self) -> ServerResult<Selection> {
        let column = match &self.column {
            Some(name) => ColumnChoice::Named(name.clone()),
            None => ColumnChoice::Latest,
        };

        let dates = match &self.quarter {
            Some(q) => {
                let quarter: Quarter = q.parse().map_err(ServerError::Dataload)?;
                let year = self
                    .year
                    .as_deref()
                    .map(|y| {
                        y.parse::<i32>()
                            .map_err(|_| ServerError::BadRequest(format!("Invalid year: {}", y)))
                    })
                    .transpose()?;
                DateSource::Explicit { quarter, year }
            }
            None => DateSource::FromColumn,
        };

        Ok(Selection { column, dates })
    }

    fn into_session<C>(self) -> ServerResult<Session<C>> {
        let mut session = Session::new();
        session.selection = self.selection()?;

        if let (Some(username), Some(password)) = (self.username, self.password) {
            session.set_credentials(Credentials::new(username, password));
        }
        if let Some(upload) = self.file {
            session.set_upload(upload);
        }

        Ok(session)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Run the dataload and return the xlsx as an attachment.
async fn create_dataload<K>(
    State(state): State<AppState<K>>,
    multipart: Multipart,
) -> ServerResult<Response>
where
    K: CrmConnector + Send + Sync + 'static,
    K::Connection: Send + Sync,
{
    let form = DataloadForm::read(multipart).await?;
    let mut session: Session<K::Connection> = form.into_session()?;

    if let Some(upload) = session.upload() {
        log_info(format!(
            "📄 New upload: {} ({} bytes)",
            upload.file_name,
            upload.bytes.len()
        ));
    }

    let dataload = run_dataload(&mut session, state.connector.as_ref(), &state.options).await?;
    let xlsx = write_xlsx(&dataload.rows).map_err(DataloadError::from)?;

    let headers = [
        (header::CONTENT_TYPE, XLSX_MIME.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DATALOAD_FILE_NAME),
        ),
        (
            HeaderName::from_static("x-dataload-rows"),
            dataload.report.output_rows.to_string(),
        ),
        (
            HeaderName::from_static("x-dataload-unmatched"),
            dataload.report.unmatched_rows.to_string(),
        ),
    ];

    Ok((headers, xlsx).into_response())
}

/// List the status columns of an uploaded sheet.
async fn list_columns(mut multipart: Multipart) -> ServerResult<Json<ColumnsResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            let sheet = parse_bytes(&bytes).map_err(DataloadError::from)?;
            return Ok(Json(ColumnsResponse::from(&sheet)));
        }
    }

    Err(ServerError::BadRequest("No file provided".to_string()))
}

// =============================================================================
// Error responses
// =============================================================================

/// HTTP status for an error.
pub fn status_code(error: &ServerError) -> StatusCode {
    match error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Dataload(DataloadError::MissingInput(_)) => StatusCode::BAD_REQUEST,
        ServerError::Dataload(e) if e.is_user_error() => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Dataload(
            DataloadError::NotAuthenticated | DataloadError::Crm(CrmError::Authentication(_)),
        ) => StatusCode::UNAUTHORIZED,
        ServerError::Dataload(DataloadError::Crm(_)) => StatusCode::BAD_GATEWAY,
        ServerError::Dataload(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let message = self.to_string();
        log_error(format!("❌ {}", message));
        (status, Json(error_response(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::testing::FakeConnector;
    use crate::error::ExportError;
    use crate::parser::parse_bytes;
    use reqwest::multipart::{Form, Part};

    const CSV: &str = "\
Code,SameStore'25Q3_Qtrly Name
1001-00-00-A,Same Store
9999-00-00-Z,Non-SS
";

    async fn spawn_app() -> String {
        let connector = FakeConnector::with_cost_centers(
            "pw",
            &[("a01", "1001-00-00 Downtown"), ("a02", "1002-00-00 Airport")],
        );
        let app = router(connector, DataloadOptions::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn file_part() -> Part {
        Part::bytes(CSV.as_bytes().to_vec()).file_name("status.csv")
    }

    async fn post_form(base: &str, path: &str, form: Form) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}{}", base, path))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dataload_returns_xlsx() {
        let base = spawn_app().await;
        let form = Form::new()
            .text("username", "user@example.com")
            .text("password", "pw")
            .part("file", file_part());

        let response = post_form(&base, "/api/dataload", form).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_MIME);
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(DATALOAD_FILE_NAME));
        assert_eq!(response.headers()["x-dataload-unmatched"], "1");

        let bytes = response.bytes().await.unwrap();
        let sheet = parse_bytes(&bytes).unwrap();
        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.records[0]["Same_Store__c"], Value::Bool(true));
        assert_eq!(sheet.records[0]["Start_Date__c"], "2025-07-01");
        assert_eq!(sheet.records[1]["Reason_for_Same_Store_Status__c"], "Non Same Store");
    }

    #[tokio::test]
    async fn test_explicit_quarter() {
        let base = spawn_app().await;
        let form = Form::new()
            .text("username", "user@example.com")
            .text("password", "pw")
            .text("quarter", "Q2")
            .text("year", "2024")
            .part("file", file_part());

        let response = post_form(&base, "/api/dataload", form).await;
        assert_eq!(response.status(), StatusCode::OK);

        let sheet = parse_bytes(&response.bytes().await.unwrap()).unwrap();
        assert_eq!(sheet.records[0]["Start_Date__c"], "2024-04-01");
        assert_eq!(sheet.records[0]["End_Date__c"], "2024-06-30");
    }

    #[tokio::test]
    async fn test_missing_inputs_is_bad_request() {
        let base = spawn_app().await;
        let form = Form::new().text("username", "user@example.com").part("file", file_part());

        let response = post_form(&base, "/api/dataload", form).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["error"],
            "Please provide username, password, and upload a file"
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let base = spawn_app().await;
        let form = Form::new()
            .text("username", "user@example.com")
            .text("password", "nope")
            .part("file", file_part());

        let response = post_form(&base, "/api/dataload", form).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_quarter_is_unprocessable() {
        let base = spawn_app().await;
        let form = Form::new()
            .text("username", "user@example.com")
            .text("password", "pw")
            .text("quarter", "Q7")
            .part("file", file_part());

        let response = post_form(&base, "/api/dataload", form).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_columns_endpoint() {
        let base = spawn_app().await;
        let form = Form::new().part("file", file_part());

        let response = post_form(&base, "/api/columns", form).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: ColumnsResponse = response.json().await.unwrap();
        assert_eq!(body.columns.len(), 1);
        assert_eq!(body.columns[0].name, "SameStore'25Q3_Qtrly Name");
        assert_eq!(body.columns[0].quarter, Quarter::Q3);
        assert_eq!(body.row_count, 2);
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_app().await;
        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_status_codes() {
        let auth: ServerError = DataloadError::from(CrmError::Authentication("bad".into())).into();
        assert_eq!(status_code(&auth), StatusCode::UNAUTHORIZED);

        let upstream: ServerError = DataloadError::from(CrmError::BulkJob("Failed".into())).into();
        assert_eq!(status_code(&upstream), StatusCode::BAD_GATEWAY);

        let column: ServerError = DataloadError::NoCategoryColumn.into();
        assert_eq!(status_code(&column), StatusCode::UNPROCESSABLE_ENTITY);

        let quarter: ServerError = DataloadError::InvalidQuarter("Q5".into()).into();
        assert_eq!(status_code(&quarter), StatusCode::UNPROCESSABLE_ENTITY);

        let missing: ServerError = DataloadError::MissingInput("a file".into()).into();
        assert_eq!(status_code(&missing), StatusCode::BAD_REQUEST);

        let export: ServerError =
            DataloadError::from(ExportError::from(std::io::Error::other("disk full"))).into();
        assert_eq!(status_code(&export), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
