//! Axum router construction.
//!
//! Builds the full application router with all route groups, middleware
//! layers, and the OpenAPI document.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::transactions::create_transaction,
        routes::transactions::get_transaction,
        routes::transactions::upload_files,
        routes::files::list_files,
        routes::files::get_file,
        routes::files::stream_file,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::transactions::CreateTransactionRequest,
        routes::transactions::TransactionResponse,
        routes::transactions::TransactionDetailResponse,
        routes::transactions::UploadResponse,
        routes::files::FileMetadataResponse,
    ))
)]
pub struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(ctx.config.upload.max_body_bytes).unwrap_or(usize::MAX);

    let api = Router::new()
        // Transactions
        .route(
            "/transactions",
            post(routes::transactions::create_transaction),
        )
        .route(
            "/transactions/{id}",
            get(routes::transactions::get_transaction),
        )
        .route(
            "/transactions/{id}/files",
            post(routes::transactions::upload_files).layer(DefaultBodyLimit::max(body_limit)),
        )
        // Files
        .route("/files", get(routes::files::list_files))
        .route("/files/{id}", get(routes::files::get_file))
        .route("/files/{id}/stream", get(routes::files::stream_file));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
