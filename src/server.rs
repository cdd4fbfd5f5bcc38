//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness plus a database check |
//! | `POST` | `/api/v1/works` | Multipart upload; runs the plagiarism check |
//! | `GET`  | `/api/v1/works/{work_id}/reports` | Latest report of a work |
//! | `GET`  | `/api/v1/works/{work_id}/wordcloud` | Word-cloud URL for a work |
//! | `GET`  | `/api/v1/reports?assignment_id=` | Latest report of each work in an assignment |
//!
//! # Envelope
//!
//! Every `/api/v1` response is wrapped:
//!
//! ```json
//! { "success": false,
//!   "error": { "code": "VALIDATION_ERROR", "message": "Invalid assignment_id format" },
//!   "timestamp": "2024-01-01T00:00:00Z" }
//! ```
//!
//! Error codes: `VALIDATION_ERROR` (400), `NOT_FOUND` (404),
//! `FILE_TOO_LARGE` (413), `UNSUPPORTED_FORMAT` (415), `CANCELLED` (503),
//! `INTERNAL_ERROR` (500).
//!
//! # Shutdown
//!
//! The server stops when its [`CancellationToken`] fires. Each submission
//! runs under a child token, so in-flight submissions are abandoned without
//! writing a report.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use copycheck_core::extract::{
    resolve_media_type, MIME_OCTET_STREAM, MIME_TEXT_MARKDOWN, MIME_TEXT_PLAIN,
};
use copycheck_core::models::{ReportResponse, SubmissionReceipt};
use copycheck_core::Error;

use crate::config::Config;
use crate::services::Services;
use crate::submission::SubmitRequest;
use crate::wordcloud::WordCloud;

/// Room for multipart boundaries and the id fields on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Media types accepted at upload time.
const ACCEPTED_MEDIA_TYPES: &[&str] = &[MIME_TEXT_PLAIN, MIME_TEXT_MARKDOWN, MIME_OCTET_STREAM];

#[derive(Clone)]
struct AppState {
    services: Services,
    max_upload_bytes: usize,
    shutdown: CancellationToken,
}

/// Serve until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
        on_signal.cancel();
    });
    run_server_with_shutdown(config, shutdown).await
}

/// Serve until `shutdown` is cancelled.
pub async fn run_server_with_shutdown(
    config: &Config,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let services = Services::open(config).await?;
    let app = router(services.clone(), config.server.max_upload_bytes, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    services.close().await;
    info!("server stopped");
    Ok(())
}

/// Build the router over already-opened services.
pub fn router(services: Services, max_upload_bytes: usize, shutdown: CancellationToken) -> Router {
    let state = AppState {
        services,
        max_upload_bytes,
        shutdown,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/v1/works", post(handle_submit))
        .route("/api/v1/works/{work_id}/reports", get(handle_work_report))
        .route("/api/v1/works/{work_id}/wordcloud", get(handle_word_cloud))
        .route("/api/v1/reports", get(handle_assignment_reports))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Envelope ============

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetail>,
    timestamp: DateTime<Utc>,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data: Some(data),
        error: None,
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            success: false,
            data: None,
            error: Some(ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            }),
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

fn validation(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
}

fn file_too_large(limit: usize) -> AppError {
    AppError::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        "FILE_TOO_LARGE",
        format!("File exceeds maximum size of {} bytes", limit),
    )
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(what) => {
                AppError::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what))
            }
            Error::UnsupportedFormat(msg) => {
                AppError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT", msg)
            }
            Error::Validation(msg) => validation(msg),
            Error::Cancelled => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "CANCELLED",
                "Server is shutting down",
            ),
            Error::Storage(msg) => {
                error!(error = %msg, "request failed");
                AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred",
                )
            }
        }
    }
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| validation(format!("Invalid {} format", field)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.services.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            warn!(error = %e, "database ping failed");
            "error"
        }
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

// ============ POST /api/v1/works ============

struct UploadedFile {
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn handle_submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Envelope<SubmissionReceipt>>), AppError> {
    let limit = state.max_upload_bytes;
    let multipart_err = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            file_too_large(limit)
        } else {
            validation("Malformed multipart body").with_details(e.body_text())
        }
    };

    let mut assignment_id = None;
    let mut student_id = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("assignment_id") => {
                assignment_id = Some(field.text().await.map_err(multipart_err)?);
            }
            Some("student_id") => {
                student_id = Some(field.text().await.map_err(multipart_err)?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_err)?;
                file = Some(UploadedFile {
                    name: file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let assignment_id = parse_id(
        assignment_id
            .as_deref()
            .ok_or_else(|| validation("Missing assignment_id"))?,
        "assignment_id",
    )?;
    let student_id = parse_id(
        student_id
            .as_deref()
            .ok_or_else(|| validation("Missing student_id"))?,
        "student_id",
    )?;
    let file = file.ok_or_else(|| validation("Missing file"))?;

    if file.bytes.len() > limit {
        return Err(file_too_large(limit));
    }

    let media_type = resolve_media_type(file.content_type.as_deref(), &file.name);
    if !ACCEPTED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(AppError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_FORMAT",
            "Unsupported file format",
        )
        .with_details(format!("Got: {}", media_type)));
    }

    let request = SubmitRequest {
        assignment_id,
        student_id,
        file_name: file.name,
        media_type,
        bytes: file.bytes,
    };
    let cancel = state.shutdown.child_token();
    let outcome = state.services.submissions.submit(request, &cancel).await?;

    Ok((StatusCode::ACCEPTED, ok(outcome.receipt())))
}

// ============ GET /api/v1/works/{work_id}/... ============

async fn handle_work_report(
    State(state): State<AppState>,
    Path(work_id): Path<String>,
) -> Result<Json<Envelope<ReportResponse>>, AppError> {
    let work_id = parse_id(&work_id, "work_id")?;
    let report = state.services.reports.get_report(work_id).await?;
    Ok(ok(report))
}

async fn handle_word_cloud(
    State(state): State<AppState>,
    Path(work_id): Path<String>,
) -> Result<Json<Envelope<WordCloud>>, AppError> {
    let work_id = parse_id(&work_id, "work_id")?;
    let cloud = state.services.word_clouds.for_work(work_id).await?;
    Ok(ok(cloud))
}

// ============ GET /api/v1/reports ============

#[derive(Deserialize)]
struct AssignmentQuery {
    assignment_id: Option<String>,
}

async fn handle_assignment_reports(
    State(state): State<AppState>,
    Query(query): Query<AssignmentQuery>,
) -> Result<Json<Envelope<Vec<ReportResponse>>>, AppError> {
    let raw = query
        .assignment_id
        .ok_or_else(|| validation("Missing assignment_id"))?;
    let assignment_id = parse_id(&raw, "assignment_id")?;
    let reports = state
        .services
        .reports
        .list_for_assignment(assignment_id)
        .await?;
    Ok(ok(reports))
}
