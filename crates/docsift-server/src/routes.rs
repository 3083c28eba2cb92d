//! Route handlers.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use docsift_core::{DocumentSummary, ScoredChunk, SearchService, ServiceError, UploadError};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

type AppState = State<Arc<SearchService>>;

/// Successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document: String,
    pub chunks: usize,
    pub message: String,
}

/// Query string for `GET /query`.
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub k: Option<usize>,
}

struct UploadedFile {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

pub(crate) async fn health() -> &'static str {
    "OK"
}

/// Takes the part named `file`, or failing that the first part with a filename.
pub(crate) async fn upload_pdf(
    State(service): AppState,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<UploadedFile> = None;
    while let Some(field) = multipart.next_field().await? {
        let named_file = field.name() == Some("file");
        if !named_file && (field.file_name().is_none() || upload.is_some()) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        upload = Some(UploadedFile {
            filename,
            content_type,
            bytes,
        });
        if named_file {
            break;
        }
    }

    let file = upload.ok_or(ServiceError::Upload(UploadError::MissingFile))?;
    let report = service
        .ingest_upload(file.filename.as_deref(), file.content_type.as_deref(), file.bytes)
        .await?;
    Ok(Json(UploadResponse {
        message: format!(
            "Uploaded and processed {}. Total chunks: {}",
            report.document_id, report.chunk_count
        ),
        document: report.document_id,
        chunks: report.chunk_count,
    }))
}

pub(crate) async fn query(
    State(service): AppState,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<ScoredChunk>>, ApiError> {
    if params.k == Some(0) {
        return Err(ApiError::BadRequest("k must be at least 1".into()));
    }
    let q = params.q.unwrap_or_default();
    let results = service.query(&q, params.k).await?;
    Ok(Json(results))
}

pub(crate) async fn list_documents(State(service): AppState) -> Json<Vec<DocumentSummary>> {
    Json(service.store().documents().await)
}

pub(crate) async fn delete_document(
    State(service): AppState,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if service.store().remove(&id).await {
        tracing::info!(document = %id, "removed document");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(id))
    }
}
