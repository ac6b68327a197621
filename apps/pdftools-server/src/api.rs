//! API handlers for the PDF tools server
//!
//! Provides:
//! - `POST /api/pdf/process`: run a tool over uploaded files
//! - `GET /health`: liveness probe

use std::path::Path;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    handler::HandlerWithoutStateExt,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use pdftools_core::upload::FILES_FIELD;
use pdftools_core::{
    package, PdfToolError, Tool, UploadError, UploadForm, UploadPolicy, UploadedFile,
};

use crate::error::ApiError;
use crate::AppState;

/// Build the application router. Unmatched routes fall through to
/// `static_dir` when one is given, and to a JSON 404 otherwise.
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let body_limit = state.policy.body_limit();

    let router = Router::new()
        .route("/health", get(handle_health))
        .route(
            "/api/pdf/process",
            post(handle_process).layer(DefaultBodyLimit::max(body_limit)),
        );

    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).not_found_service(handle_not_found.into_service()),
        ),
        None => router.fallback(handle_not_found),
    };

    router.with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdftools-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: any unmatched route
pub async fn handle_not_found() -> ApiError {
    ApiError::NotFound
}

/// A finished result, ready to send.
struct Download {
    content_type: &'static str,
    filename: String,
    disposition: String,
    body: Bytes,
}

/// Handler: POST /api/pdf/process
pub async fn handle_process(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(&state.policy, multipart).await?;
    let request = state.policy.admit(form)?;
    let tool = request.tool;

    info!(
        "Processing {} with {} file(s): {:?}",
        tool,
        request.files.len(),
        request
            .files
            .iter()
            .map(|file| file.name.as_str())
            .collect::<Vec<_>>()
    );

    let dispatcher = state.dispatcher.clone();
    let download = tokio::task::spawn_blocking(move || -> Result<Download, PdfToolError> {
        let artifact = dispatcher.dispatch(&request)?;
        let package = package(tool, artifact, Utc::now());
        let content_type = package.content_type;
        let filename = package.filename.clone();
        let disposition = package.content_disposition();
        let body = Bytes::from(package.into_bytes()?);
        Ok(Download {
            content_type,
            filename,
            disposition,
            body,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))?
    .map_err(|e| ApiError::from_tool(tool, e))?;

    info!(
        "{} finished: {} ({} bytes)",
        tool,
        download.filename,
        download.body.len()
    );

    if let Some(dir) = state.debug_dump_dir.clone() {
        let filename = download.filename.clone();
        let body = download.body.clone();
        tokio::spawn(async move { dump_result(&dir, tool, &filename, &body).await });
    }

    let length = download.body.len().to_string();
    Ok((
        [
            (header::CONTENT_TYPE, download.content_type.to_string()),
            (header::CONTENT_DISPOSITION, download.disposition),
            (header::CONTENT_LENGTH, length),
        ],
        download.body,
    )
        .into_response())
}

/// Read the multipart body, enforcing count and size limits as parts
/// arrive so an oversized upload is never fully buffered.
async fn read_form(
    policy: &UploadPolicy,
    mut multipart: Multipart,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if field_name != FILES_FIELD {
            if file_name.is_some() {
                return Err(UploadError::UnexpectedFileField(field_name).into());
            }
            let value = field.text().await.map_err(malformed)?;
            match field_name.as_str() {
                "tool" => form.tool = Some(value),
                "options" => form.options = Some(value),
                other => debug!("Ignoring form field '{}'", other),
            }
            continue;
        }

        policy.check_file_count(form.files.len() + 1)?;

        let name = file_name.unwrap_or_else(|| format!("file_{}", form.files.len() + 1));
        let media_type = field.content_type().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            policy.check_file_size(&name, (bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }

        debug!(
            "Received '{}' ({} bytes, {})",
            name,
            bytes.len(),
            media_type.as_deref().unwrap_or("no content type")
        );
        form.files.push(UploadedFile {
            name,
            media_type,
            bytes,
        });
    }

    Ok(form)
}

fn malformed(err: MultipartError) -> ApiError {
    warn!("Failed to read multipart field: {}", err);
    UploadError::Malformed(err.body_text()).into()
}

/// Best-effort copy of a result for diagnostics. Runs detached from the
/// response, so it can neither fail nor delay the request.
async fn dump_result(dir: &Path, tool: Tool, filename: &str, body: &[u8]) {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin");
    let path = dir.join(format!(
        "result_{}_{}.{}",
        tool,
        Utc::now().timestamp_millis(),
        extension
    ));

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!("Could not create dump directory {}: {}", dir.display(), e);
        return;
    }
    match tokio::fs::write(&path, body).await {
        Ok(()) => debug!("Wrote result copy to {}", path.display()),
        Err(e) => warn!("Could not write result copy to {}: {}", path.display(), e),
    }
}
