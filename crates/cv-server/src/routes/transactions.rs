//! Upload batch handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cv_core::media::effective_content_type;
use cv_core::{Error, TransactionId};
use cv_db::queries::{files, transactions};
use serde::{Deserialize, Serialize};

use super::files::FileMetadataResponse;
use super::parse_id;
use crate::context::AppContext;
use crate::error::AppError;
use crate::spool::spool;

/// Request body for creating a batch.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub label: Option<String>,
}

/// Batch response.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TransactionResponse {
    pub id: String,
    pub label: Option<String>,
    pub created_at: String,
}

impl TransactionResponse {
    fn from_model(tx: &cv_db::models::Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            label: tx.label.clone(),
            created_at: tx.created_at.clone(),
        }
    }
}

/// Batch plus the files uploaded into it.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TransactionDetailResponse {
    #[serde(flatten)]
    pub transaction: TransactionResponse,
    pub files: Vec<FileMetadataResponse>,
}

/// IDs assigned to an uploaded batch, in part order.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub ids: Vec<String>,
}

/// POST /api/transactions
#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Batch created", body = TransactionResponse)
    )
)]
pub async fn create_transaction(
    State(ctx): State<AppContext>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tx = ctx
        .with_db(move |conn| transactions::create_transaction(conn, payload.label.as_deref()))
        .await?;
    tracing::info!("Created batch {}", tx.id);
    Ok((StatusCode::CREATED, Json(TransactionResponse::from_model(&tx))))
}

/// GET /api/transactions/{id}
#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Batch with its files", body = TransactionDetailResponse),
        (status = 404, description = "Batch not found")
    )
)]
pub async fn get_transaction(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<TransactionDetailResponse>, AppError> {
    let tx_id: TransactionId = parse_id(&id, "transaction")?;
    let (tx, files) = ctx
        .with_db(move |conn| {
            let tx = transactions::get_transaction(conn, tx_id)?
                .ok_or_else(|| Error::not_found("transaction", tx_id))?;
            let files = files::list_files_by_transaction(conn, tx_id)?;
            Ok((tx, files))
        })
        .await?;

    Ok(Json(TransactionDetailResponse {
        transaction: TransactionResponse::from_model(&tx),
        files: files.iter().map(FileMetadataResponse::from_model).collect(),
    }))
}

/// POST /api/transactions/{id}/files
///
/// Every multipart part is one file. The batch is stored atomically: either
/// all parts get an ID or none are kept.
#[utoipa::path(
    post,
    path = "/api/transactions/{id}/files",
    params(("id" = String, Path, description = "Transaction ID")),
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "One part per file"
    ),
    responses(
        (status = 201, description = "All files stored", body = UploadResponse),
        (status = 400, description = "No parts or malformed body"),
        (status = 404, description = "Batch not found"),
        (status = 500, description = "Storage failure; nothing was kept")
    )
)]
pub async fn upload_files(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let tx_id: TransactionId = parse_id(&id, "transaction")?;
    ctx.with_db(move |conn| transactions::get_transaction(conn, tx_id))
        .await?
        .ok_or_else(|| Error::not_found("transaction", tx_id))?;

    let spool_dir = ctx.config.upload.spool_dir.as_deref();
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?
    {
        let content_type = effective_content_type(field.content_type(), field.file_name());
        let part = spool(field, content_type, spool_dir).await?;
        tracing::debug!(
            "Spooled part {} ({} bytes, {})",
            parts.len() + 1,
            part.size(),
            part.content_type()
        );
        parts.push(part);
    }

    if parts.is_empty() {
        return Err(Error::Validation("upload contains no files".into()).into());
    }

    let files = parts.into_iter().map(|p| p.into_upload_file()).collect();
    let ids = ctx.vault.save(files, tx_id).await?;
    tracing::info!("Stored {} file(s) in batch {tx_id}", ids.len());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            ids: ids.iter().map(ToString::to_string).collect(),
        }),
    ))
}
