//! Bulk block ingestion against a real database
//!
//! Covers the commit path, dependency reuse, rollback on failure,
//! resubmission, cancellation and concurrent submissions.

use dbs_common::types::{BulkBlock, FileParent, FileParentLink};
use dbs_server::ingest::{ErrorKind, IdStrategy, IngestConfig, LumiStrategy};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

mod helpers;

use helpers::{block_scoped_counts, count, TestApp, TestBulkBlock};

fn small_units() -> IngestConfig {
    IngestConfig {
        file_chunk_size: 3,
        max_concurrent_units: 2,
        ..Default::default()
    }
}

/// Same dataset as `fixture`, under another block name and other lfns.
fn sibling_block(fixture: &TestBulkBlock, suffix: &str) -> BulkBlock {
    let mut submission = fixture.build();
    if let Some(block) = submission.block.as_mut() {
        block.block_name = format!("{}#block-{suffix}", fixture.dataset_path());
    }
    let rename = |lfn: &str| lfn.replace("file_", &format!("{suffix}_"));
    for file in submission.files.iter_mut() {
        file.logical_file_name = rename(&file.logical_file_name);
    }
    for conf in submission.file_conf_list.iter_mut() {
        conf.logical_file_name = rename(&conf.logical_file_name);
    }
    submission
}

#[sqlx::test]
async fn test_block_with_files_lumis_and_parent_commits(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());

    let parent = TestBulkBlock::new("parent").with_files(1);
    app.ingestor
        .insert_bulk_block(parent.build(), Some("alice"))
        .await
        .unwrap();

    let child = TestBulkBlock::new("child").with_files(3).with_lumis(3);
    let mut submission = child.build();
    submission.files[0].file_parent_list.push(FileParent {
        parent_logical_file_name: parent.lfn(0),
    });
    submission.dataset_parent_list.push(parent.dataset_path());

    let report = app
        .ingestor
        .insert_bulk_block(submission, Some("alice"))
        .await
        .unwrap();

    assert!(report.block_created);
    assert_eq!(report.files_inserted, 3);
    assert_eq!(report.files_reused, 0);
    assert_eq!(report.lumis_written, 9);
    assert_eq!(report.links.file_parents, 1);
    assert_eq!(report.links.dataset_parents, 1);
    assert_eq!(report.links.file_configs, 3);

    let files_in_block: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM files f JOIN blocks b ON b.block_id = f.block_id WHERE b.block_name = $1",
    )
    .bind(child.block_name())
    .fetch_one(&pool)
    .await?;
    assert_eq!(files_in_block, 3);

    let (file_count, block_size, create_by): (i64, i64, Option<String>) = sqlx::query_as(
        "SELECT file_count, block_size, create_by FROM blocks WHERE block_name = $1",
    )
    .bind(child.block_name())
    .fetch_one(&pool)
    .await?;
    assert_eq!(file_count, 3);
    assert_eq!(block_size, 2_000_000 * 3 + 3);
    assert_eq!(create_by.as_deref(), Some("alice"));

    let children: Vec<String> = sqlx::query_scalar(
        "SELECT c.logical_file_name FROM file_parents fp \
         JOIN files c ON c.file_id = fp.this_file_id \
         JOIN files p ON p.file_id = fp.parent_file_id \
         WHERE p.logical_file_name = $1",
    )
    .bind(parent.lfn(0))
    .fetch_all(&pool)
    .await?;
    assert_eq!(children, vec![child.lfn(0)]);

    Ok(())
}

#[sqlx::test]
async fn test_second_block_reuses_reference_entities(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());
    let fixture = TestBulkBlock::new("shared").with_files(2);

    app.ingestor.insert_bulk_block(fixture.build(), None).await.unwrap();

    let report = app
        .ingestor
        .insert_bulk_block(sibling_block(&fixture, "second"), None)
        .await
        .unwrap();

    assert!(report.block_created);
    assert_eq!(count(&pool, "blocks").await, 2);
    assert_eq!(count(&pool, "files").await, 4);
    for table in [
        "primary_ds_types",
        "primary_datasets",
        "processing_eras",
        "acquisition_eras",
        "data_tiers",
        "physics_groups",
        "processed_datasets",
        "datasets",
        "file_data_types",
        "output_module_configs",
    ] {
        assert_eq!(count(&pool, table).await, 1, "{table} should hold one row");
    }

    Ok(())
}

#[sqlx::test]
async fn test_failed_file_rolls_back_the_whole_block(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::with_config(pool.clone(), small_units());
    let mut submission = TestBulkBlock::new("broken").with_files(7).with_lumis(2).build();
    submission.files[4].logical_file_name = String::new();
    submission.file_conf_list.clear();

    let err = app
        .ingestor
        .insert_bulk_block(submission, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Concurrency);
    assert_eq!(block_scoped_counts(&pool).await, [0, 0, 0, 0]);
    // Reference entities are committed before the block transaction.
    assert_eq!(count(&pool, "datasets").await, 1);

    Ok(())
}

#[sqlx::test]
async fn test_resubmission_changes_nothing(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());
    let fixture = TestBulkBlock::new("again").with_files(4).with_lumis(5);

    app.ingestor.insert_bulk_block(fixture.build(), None).await.unwrap();
    let before = block_scoped_counts(&pool).await;

    let report = app.ingestor.insert_bulk_block(fixture.build(), None).await.unwrap();

    assert!(!report.block_created);
    assert_eq!(report.files_inserted, 0);
    assert_eq!(report.files_reused, 4);
    assert_eq!(report.lumis_written, 0);
    assert_eq!(block_scoped_counts(&pool).await, before);

    Ok(())
}

#[sqlx::test]
async fn test_unknown_parent_file_is_rejected(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());
    let fixture = TestBulkBlock::new("orphan").with_files(2);
    let mut submission = fixture.build();
    submission.file_parent_list.push(FileParentLink {
        logical_file_name: fixture.lfn(1),
        parent_logical_file_name: "/store/data/nowhere/file.root".to_string(),
    });

    let err = app
        .ingestor
        .insert_bulk_block(submission, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GetId);
    assert_eq!(err.code(), 109);
    assert!(err.is_client_error());
    assert_eq!(block_scoped_counts(&pool).await, [0, 0, 0, 0]);

    Ok(())
}

#[sqlx::test]
async fn test_cancelled_submission_writes_no_block(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = app
        .ingestor
        .insert_bulk_block_until(TestBulkBlock::new("late").with_files(2).build(), None, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(block_scoped_counts(&pool).await, [0, 0, 0, 0]);

    Ok(())
}

#[sqlx::test]
async fn test_file_ids_follow_input_order(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::with_config(pool.clone(), small_units());
    let fixture = TestBulkBlock::new("order").with_files(10);

    app.ingestor.insert_bulk_block(fixture.build(), None).await.unwrap();

    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT file_id, logical_file_name FROM files ORDER BY file_id")
            .fetch_all(&pool)
            .await?;
    let base = rows[0].0;
    for (i, (id, lfn)) in rows.iter().enumerate() {
        assert_eq!(*id, base + i as i64);
        assert_eq!(lfn, &fixture.lfn(i));
    }

    Ok(())
}

#[sqlx::test]
async fn test_max_id_strategy_commits(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::with_config(
        pool.clone(),
        IngestConfig {
            id_strategy: IdStrategy::MaxId,
            ..small_units()
        },
    );

    let report = app
        .ingestor
        .insert_bulk_block(TestBulkBlock::new("maxid").with_files(5).with_lumis(2).build(), None)
        .await
        .unwrap();

    assert_eq!(report.files_inserted, 5);
    assert_eq!(count(&pool, "file_lumis").await, 10);

    Ok(())
}

#[sqlx::test]
async fn test_large_lumi_lists_use_bulk_strategies(pool: PgPool) -> sqlx::Result<()> {
    for (tag, strategy) in [("chunked", LumiStrategy::Chunked), ("staging", LumiStrategy::Staging)] {
        let app = TestApp::with_config(
            pool.clone(),
            IngestConfig {
                lumi_threshold: 10,
                lumi_chunk_size: 7,
                lumi_strategy: strategy,
                ..Default::default()
            },
        );
        let report = app
            .ingestor
            .insert_bulk_block(TestBulkBlock::new(tag).with_files(2).with_lumis(40).build(), None)
            .await
            .unwrap();
        assert_eq!(report.lumis_written, 80, "{strategy}");
    }

    assert_eq!(count(&pool, "file_lumis").await, 160);

    Ok(())
}

#[sqlx::test]
async fn test_concurrent_blocks_share_one_dataset(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());
    let fixture = TestBulkBlock::new("race").with_files(2);

    let first = fixture.build();
    let second = sibling_block(&fixture, "other");

    let (a, b) = tokio::join!(
        app.ingestor.insert_bulk_block(first, None),
        app.ingestor.insert_bulk_block(second, None),
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.dataset_id, b.dataset_id);
    assert_eq!(count(&pool, "datasets").await, 1);
    assert_eq!(count(&pool, "blocks").await, 2);
    assert_eq!(count(&pool, "files").await, 4);

    Ok(())
}

#[sqlx::test]
async fn test_file_owned_by_other_block_fails_the_submission(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());
    let fixture = TestBulkBlock::new("owner").with_files(2);
    app.ingestor.insert_bulk_block(fixture.build(), None).await.unwrap();

    let mut intruder = fixture.build();
    if let Some(block) = intruder.block.as_mut() {
        block.block_name = format!("{}#block-intruder", fixture.dataset_path());
    }

    let err = app
        .ingestor
        .insert_bulk_block(intruder, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Concurrency);
    assert!(err.to_string().contains("already belongs to block"), "{err}");
    assert_eq!(count(&pool, "blocks").await, 1);
    assert_eq!(count(&pool, "files").await, 2);

    Ok(())
}

#[sqlx::test]
async fn test_missing_is_file_valid_is_stored_as_valid(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::new(pool.clone());
    let fixture = TestBulkBlock::new("validity").with_files(3);
    let mut submission = fixture.build();
    submission.files[2].is_file_valid = Some(0);

    app.ingestor.insert_bulk_block(submission, None).await.unwrap();

    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT logical_file_name, is_file_valid FROM files ORDER BY logical_file_name")
            .fetch_all(&pool)
            .await?;
    assert_eq!(
        rows,
        vec![
            (fixture.lfn(0), 1),
            (fixture.lfn(1), 1),
            (fixture.lfn(2), 0),
        ]
    );

    Ok(())
}

#[sqlx::test]
async fn test_timeout_stops_a_stage_waiting_on_a_lock(pool: PgPool) -> sqlx::Result<()> {
    let app = TestApp::with_config(
        pool.clone(),
        IngestConfig {
            submission_timeout_secs: 1,
            ..Default::default()
        },
    );
    let fixture = TestBulkBlock::new("stuck").with_files(2);

    // Creates the dataset the blocking row below points at.
    app.ingestor
        .insert_bulk_block(sibling_block(&fixture, "first"), None)
        .await
        .unwrap();
    let dataset_id: i64 = sqlx::query_scalar("SELECT dataset_id FROM datasets WHERE dataset = $1")
        .bind(fixture.dataset_path())
        .fetch_one(&pool)
        .await?;

    // An uncommitted writer of the same block name holds the unique key.
    let mut blocker = pool.begin().await?;
    sqlx::query("INSERT INTO blocks (block_id, block_name, dataset_id) VALUES (999999, $1, $2)")
        .bind(fixture.block_name())
        .bind(dataset_id)
        .execute(&mut *blocker)
        .await?;

    let started = Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        app.ingestor.insert_bulk_block(fixture.build(), None),
    )
    .await;
    let elapsed = started.elapsed();
    blocker.rollback().await?;

    let err = outcome
        .expect("submission should stop at its own deadline")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.code(), 143);
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");

    let names: Vec<String> = sqlx::query_scalar("SELECT block_name FROM blocks")
        .fetch_all(&pool)
        .await?;
    assert_eq!(names, vec![format!("{}#block-first", fixture.dataset_path())]);
    assert_eq!(count(&pool, "files").await, 2);

    Ok(())
}
