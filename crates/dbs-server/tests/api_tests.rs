//! HTTP surface tests
//!
//! Requests go through the full router with `oneshot`:
//! - `POST /api/v1/bulkblocks` success and error bodies
//! - Read endpoints for blocks, files, parents, children and lumis
//! - `/health`

use axum::http::StatusCode;
use dbs_common::types::FileParent;
use serde_json::json;
use sqlx::PgPool;

mod helpers;

use helpers::{count, TestApp, TestBulkBlock};

#[sqlx::test]
async fn test_health(pool: PgPool) {
    let app = TestApp::new(pool);
    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test]
async fn test_post_bulkblock_returns_empty_list(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let fixture = TestBulkBlock::new("api").with_files(3).with_lumis(2);

    let (status, body) = app
        .post_json("/api/v1/bulkblocks", &fixture.build(), Some("carol"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = app
        .get(&format!("/api/v1/files?block_name={}", urlencoding::encode(&fixture.block_name())))
        .await;
    assert_eq!(status, StatusCode::OK);
    let files = body.as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0]["create_by"], "carol");

    let (status, body) = app
        .get(&format!("/api/v1/blocks?dataset={}", urlencoding::encode(&fixture.dataset_path())))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["file_count"], 3);

    let (status, body) = app
        .get(&format!("/api/v1/filelumis?logical_file_name={}", urlencoding::encode(&fixture.lfn(2))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[sqlx::test]
async fn test_parent_and_child_lookups(pool: PgPool) {
    let app = TestApp::new(pool);
    let parent = TestBulkBlock::new("p");
    let child = TestBulkBlock::new("c");

    let (status, _) = app.post_json("/api/v1/bulkblocks", &parent.build(), None).await;
    assert_eq!(status, StatusCode::OK);

    let mut submission = child.build();
    submission.files[0].file_parent_list.push(FileParent {
        parent_logical_file_name: parent.lfn(0),
    });
    let (status, _) = app.post_json("/api/v1/bulkblocks", &submission, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .get(&format!("/api/v1/filechildren?logical_file_name={}", urlencoding::encode(&parent.lfn(0))))
        .await;
    assert_eq!(body[0]["child_logical_file_name"], child.lfn(0));

    let (_, body) = app
        .get(&format!("/api/v1/fileparents?logical_file_name={}", urlencoding::encode(&child.lfn(0))))
        .await;
    assert_eq!(body[0]["parent_logical_file_name"], parent.lfn(0));
}

#[sqlx::test]
async fn test_malformed_document_is_unmarshal_error(pool: PgPool) {
    let app = TestApp::new(pool.clone());

    let (status, body) = app
        .post_raw("/api/v1/bulkblocks", r#"{"files": [ "#, None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 122);
    assert_eq!(count(&pool, "datasets").await, 0);
}

#[sqlx::test]
async fn test_incomplete_document_is_validation_error(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let mut submission = TestBulkBlock::new("novalid").build();
    submission.dataset = None;

    let (status, body) = app.post_json("/api/v1/bulkblocks", &submission, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 113);
    assert_eq!(count(&pool, "primary_datasets").await, 0);
}

#[sqlx::test]
async fn test_missing_parent_is_bad_request(pool: PgPool) {
    let app = TestApp::new(pool.clone());
    let mut submission = TestBulkBlock::new("lost").build();
    submission.files[0].file_parent_list.push(FileParent {
        parent_logical_file_name: "/store/data/gone.root".to_string(),
    });

    let (status, body) = app.post_json("/api/v1/bulkblocks", &submission, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 109);
    assert_eq!(count(&pool, "files").await, 0);
}

#[sqlx::test]
async fn test_read_endpoints_require_a_filter(pool: PgPool) {
    let app = TestApp::new(pool);

    let (status, body) = app.get("/api/v1/blocks").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 113);

    let (status, _) = app.get("/api/v1/files").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
