//! File metadata and chunked download handlers.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cv_core::{Error, FileId, RangeSpec};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::context::AppContext;
use crate::error::AppError;

/// File metadata response.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FileMetadataResponse {
    pub id: String,
    pub size: u64,
    pub content_type: String,
    pub transaction_id: String,
    pub created_at: String,
}

impl FileMetadataResponse {
    pub fn from_model(meta: &cv_db::models::FileMetadata) -> Self {
        Self {
            id: meta.id.to_string(),
            size: meta.size,
            content_type: meta.content_type.clone(),
            transaction_id: meta.transaction_id.to_string(),
            created_at: meta.created_at.clone(),
        }
    }
}

/// Query parameters for batch lookup.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Comma-separated file IDs.
    pub ids: Option<String>,
}

/// GET /api/files?ids=a,b,c
#[utoipa::path(
    get,
    path = "/api/files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Metadata for every known ID", body = Vec<FileMetadataResponse>),
        (status = 400, description = "Malformed ID")
    )
)]
pub async fn list_files(
    State(ctx): State<AppContext>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileMetadataResponse>>, AppError> {
    let ids = query
        .ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_id::<FileId>(s, "file"))
        .collect::<cv_core::Result<Vec<_>>>()?;

    if ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let found = ctx.vault.find_all_by_ids(&ids).await?;
    Ok(Json(found.iter().map(FileMetadataResponse::from_model).collect()))
}

/// GET /api/files/{id}
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = FileMetadataResponse),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<FileMetadataResponse>, AppError> {
    let file_id: FileId = parse_id(&id, "file")?;
    let meta = ctx.vault.find_by_id(file_id).await?;
    Ok(Json(FileMetadataResponse::from_model(&meta)))
}

/// GET /api/files/{id}/stream
///
/// Without a `Range` header the whole file is returned with 200; any
/// explicit or suffix range yields 206 with `Content-Range`. The body is
/// streamed from the byte store, never buffered whole.
#[utoipa::path(
    get,
    path = "/api/files/{id}/stream",
    params(
        ("id" = String, Path, description = "File ID"),
        ("Range" = Option<String>, Header, description = "bytes=start-end, bytes=start- or bytes=-n")
    ),
    responses(
        (status = 200, description = "Whole file"),
        (status = 206, description = "Requested byte range"),
        (status = 404, description = "File not found"),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let file_id: FileId = parse_id(&id, "file")?;

    let spec = match parse_range(&headers) {
        Ok(spec) => spec,
        Err(Error::InvalidRange { reason, size: None }) => {
            // Look the file up so the 416 can carry its size (or 404 first).
            let meta = ctx.vault.find_by_id(file_id).await?;
            return Err(Error::invalid_range(reason, Some(meta.size)).into());
        }
        Err(e) => return Err(e.into()),
    };

    let chunk = ctx.vault.open_chunk(file_id, &spec).await?;

    let mut response_headers = vec![
        (header::CONTENT_TYPE, chunk.metadata.content_type.clone()),
        (header::CONTENT_LENGTH, chunk.range.len().to_string()),
        (header::ACCEPT_RANGES, "bytes".to_string()),
    ];

    let status = if spec == RangeSpec::Unspecified {
        StatusCode::OK
    } else {
        response_headers.push((header::CONTENT_RANGE, chunk.content_range()));
        StatusCode::PARTIAL_CONTENT
    };

    let mut response = (status, Body::from_stream(chunk.body)).into_response();
    for (name, value) in response_headers {
        let value: HeaderValue = value
            .parse()
            .map_err(|_| Error::Internal(format!("invalid {name} header value")))?;
        response.headers_mut().insert(name, value);
    }
    Ok(response)
}

fn parse_range(headers: &HeaderMap) -> cv_core::Result<RangeSpec> {
    let value = headers
        .get(header::RANGE)
        .map(|v| {
            v.to_str()
                .map_err(|_| Error::invalid_range("range header is not ASCII", None))
        })
        .transpose()?;
    RangeSpec::parse_header(value)
}
