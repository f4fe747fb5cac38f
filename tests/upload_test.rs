//! Multipart batch upload: ID assignment, content types and all-or-nothing
//! behaviour when a store fails mid-batch.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use common::{body_bytes, body_json, payload, upload_request, uploaded_ids, Part, TestHarness};
use cv_core::{Error, FileId, Result};
use cv_storage::{ByteStore, ByteStream, MemoryStore};

#[tokio::test]
async fn upload_assigns_ids_in_part_order() {
    let h = TestHarness::new();
    let tx = h.create_transaction(Some("batch")).await;
    let first = payload(300);
    let second = payload(7);

    let resp = h
        .upload(
            &tx,
            &[
                Part::new("one.mp4", "video/mp4", &first),
                Part::new("two.webm", "video/webm", &second),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let ids = uploaded_ids(resp).await;
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(h.bytes.len(), 2);

    for (id, expected) in ids.iter().zip([&first, &second]) {
        let resp = h
            .send(
                Request::get(format!("/api/files/{id}/stream"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&body_bytes(resp).await, expected);
    }

    let detail = body_json(
        h.send(
            Request::get(format!("/api/transactions/{tx}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    )
    .await;
    let files = detail["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    let sizes: Vec<u64> = files.iter().map(|f| f["size"].as_u64().unwrap()).collect();
    assert!(sizes.contains(&300) && sizes.contains(&7));
}

#[tokio::test]
async fn content_type_falls_back_to_file_name_then_default() {
    let h = TestHarness::new();
    let tx = h.create_transaction(None).await;

    let ids = uploaded_ids(
        h.upload(
            &tx,
            &[
                Part {
                    file_name: "clip.mkv",
                    content_type: None,
                    data: b"mkv",
                },
                Part {
                    file_name: "mystery",
                    content_type: None,
                    data: b"???",
                },
            ],
        )
        .await,
    )
    .await;

    let mut types = Vec::new();
    for id in &ids {
        let json = body_json(
            h.send(
                Request::get(format!("/api/files/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await,
        )
        .await;
        types.push(json["content_type"].as_str().unwrap().to_string());
    }
    assert_eq!(types, ["video/x-matroska", "application/octet-stream"]);
}

#[tokio::test]
async fn empty_part_is_stored() {
    let h = TestHarness::new();
    let tx = h.create_transaction(None).await;
    let ids = uploaded_ids(
        h.upload(&tx, &[Part::new("empty.bin", "application/octet-stream", b"")])
            .await,
    )
    .await;

    let json = body_json(
        h.send(
            Request::get(format!("/api/files/{}", ids[0]))
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    )
    .await;
    assert_eq!(json["size"], 0);
}

#[tokio::test]
async fn upload_without_parts_is_400() {
    let h = TestHarness::new();
    let tx = h.create_transaction(None).await;
    let resp = h.upload(&tx, &[]).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "validation_error");
}

#[tokio::test]
async fn upload_to_unknown_transaction_is_404() {
    let h = TestHarness::new();
    let resp = h
        .upload(
            "00000000-0000-0000-0000-000000000000",
            &[Part::new("a.mp4", "video/mp4", b"abc")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(h.bytes.is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = cv_core::config::Config::default();
    config.upload.max_body_bytes = 64;
    let h = TestHarness::with_config(config);
    let tx = h.create_transaction(None).await;

    let big = payload(4096);
    let resp = h
        .send(upload_request(&tx, &[Part::new("big.bin", "application/octet-stream", &big)]))
        .await;
    assert!(resp.status().is_client_error());
    assert!(h.bytes.is_empty());
}

/// Memory store whose n-th write fails after consuming the body.
struct FailNthWrite {
    inner: MemoryStore,
    fail_on: usize,
    writes: AtomicUsize,
}

#[async_trait]
impl ByteStore for FailNthWrite {
    fn name(&self) -> &'static str {
        "fail-nth"
    }

    async fn write(&self, id: FileId, body: ByteStream) -> Result<u64> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(Error::Internal("disk full".into()));
        }
        self.inner.write(id, body).await
    }

    async fn read(&self, id: FileId, offset: u64, length: u64) -> Result<Bytes> {
        self.inner.read(id, offset, length).await
    }

    async fn delete(&self, id: FileId) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn exists(&self, id: FileId) -> Result<bool> {
        self.inner.exists(id).await
    }
}

#[tokio::test]
async fn failed_batch_keeps_nothing() {
    let store = Arc::new(FailNthWrite {
        inner: MemoryStore::new(),
        fail_on: 3,
        writes: AtomicUsize::new(0),
    });
    let h = TestHarness::with_byte_store(store.clone());
    let tx = h.create_transaction(None).await;

    let resp = h
        .upload(
            &tx,
            &[
                Part::new("1.mp4", "video/mp4", b"one"),
                Part::new("2.mp4", "video/mp4", b"two"),
                Part::new("3.mp4", "video/mp4", b"three"),
                Part::new("4.mp4", "video/mp4", b"four"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(resp).await;
    assert_eq!(json["code"], "storage_failure");
    assert!(json["request_id"].is_string());

    assert!(store.inner.is_empty());
    assert_eq!(store.writes.load(Ordering::SeqCst), 3);

    let detail = body_json(
        h.send(
            Request::get(format!("/api/transactions/{tx}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    )
    .await;
    assert_eq!(detail["files"].as_array().unwrap().len(), 0);

    let count: i64 = h
        .conn()
        .query_row("SELECT COUNT(*) FROM file_metadata", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
