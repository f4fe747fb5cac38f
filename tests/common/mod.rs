//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires an in-memory DB and an in-memory
//! byte store into a full [`AppContext`], plus helpers for driving the
//! router with `oneshot` and building multipart upload bodies.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use cv_core::config::Config;
use cv_db::pool::{init_memory_pool, DbPool};
use cv_server::context::AppContext;
use cv_server::router::build_router;
use cv_storage::{ByteStore, MemoryStore};
use cv_vault::SequentialIds;

pub const BOUNDARY: &str = "clipvault-test-boundary";

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and byte store.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub bytes: Arc<MemoryStore>,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let bytes = Arc::new(MemoryStore::new());
        let ctx = AppContext::new(config, db.clone(), bytes.clone());
        Self { ctx, db, bytes }
    }

    /// Harness over a caller-supplied byte store, with sequential file IDs.
    pub fn with_byte_store(store: Arc<dyn ByteStore>) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::with_ids(
            Config::default(),
            db.clone(),
            store,
            Arc::new(SequentialIds::new()),
        );
        Self {
            ctx,
            db,
            bytes: Arc::new(MemoryStore::new()),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.ctx.clone())
    }

    /// Send one request through a fresh router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Start an Axum server on a random port.
    pub async fn serve(&self) -> SocketAddr {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> cv_db::pool::PooledConnection {
        cv_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Create a batch over HTTP and return its ID.
    pub async fn create_transaction(&self, label: Option<&str>) -> String {
        let body = serde_json::json!({ "label": label }).to_string();
        let resp = self
            .send(
                Request::post("/api/transactions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.status(), 201);
        let json = body_json(resp).await;
        json["id"].as_str().unwrap().to_string()
    }

    /// Upload `parts` into batch `tx` and return the raw response.
    pub async fn upload(&self, tx: &str, parts: &[Part<'_>]) -> Response<Body> {
        self.send(upload_request(tx, parts)).await
    }
}

/// One multipart part: file name, declared content type, payload.
pub struct Part<'a> {
    pub file_name: &'a str,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn new(file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            file_name,
            content_type: Some(content_type),
            data,
        }
    }
}

/// Encode `parts` as a `multipart/form-data` body.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                part.file_name
            )
            .as_bytes(),
        );
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(tx: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::post(format!("/api/transactions/{tx}/files"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Payload of `size` bytes where byte `i` is `i % 251`.
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    resp.into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(resp).await;
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

/// Extract the `ids` array of an upload response.
pub async fn uploaded_ids(resp: Response<Body>) -> Vec<String> {
    let json = body_json(resp).await;
    json["ids"]
        .as_array()
        .expect("ids array")
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}
