//! Integration tests for `StorageAdapter` persistence and reorg rewind logic.
//!
//! These tests require a running PostgreSQL database and the `DATABASE_URL`
//! environment variable to be set. Run with:
//!
//! ```bash
//! DATABASE_URL="postgresql://..." cargo test -p indexer-core --test integration -- --ignored --nocapture
//! ```

use chrono::Utc;
use sqlx::PgPool;

use indexer_common::models::DecodedEvent;
use indexer_common::storage::StorageAdapter;

const CONTRACT: &str = "0x1111111111111111111111111111111111111111";

async fn setup(pool: &PgPool) -> StorageAdapter {
    sqlx::migrate!("../../migrations").run(pool).await.unwrap();

    sqlx::query("DELETE FROM events WHERE contract_address = $1")
        .bind(CONTRACT)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM indexer_state WHERE contract_address = $1")
        .bind(CONTRACT)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM contracts WHERE address = $1")
        .bind(CONTRACT)
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        r#"
        INSERT INTO contracts (address, abi, name, start_block, current_block, confirm_blocks)
        VALUES ($1, '[]', 'test', 100, 99, 6)
        "#,
    )
    .bind(CONTRACT)
    .execute(pool)
    .await
    .unwrap();

    StorageAdapter::new(pool.clone())
}

fn make_event(block_number: i64, log_index: i32, tx_hash: &str) -> DecodedEvent {
    DecodedEvent {
        contract_address: CONTRACT.to_string(),
        event_name: "Transfer".to_string(),
        block_number,
        block_hash: format!("0xblock{block_number}"),
        transaction_hash: tx_hash.to_string(),
        transaction_index: 0,
        log_index,
        args: serde_json::json!({"value": "1000"}),
        timestamp: Utc::now(),
    }
}

#[sqlx::test]
#[ignore]
async fn test_commit_batch_inserts_correctly(pool: PgPool) {
    let storage = setup(&pool).await;

    let events = vec![
        make_event(100, 0, "0xaaa"),
        make_event(100, 1, "0xbbb"),
    ];

    let inserted = storage
        .commit_batch(CONTRACT, &events, 100, "0xblock100")
        .await
        .unwrap();
    assert_eq!(inserted, 2, "expected 2 events inserted");

    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM events WHERE block_number = 100 AND contract_address = $1",
    )
    .bind(CONTRACT)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count.0, 2);

    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT event_name FROM events WHERE block_number = 100 ORDER BY log_index",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(names[0].0, "Transfer");
    assert_eq!(names[1].0, "Transfer");
}

#[sqlx::test]
#[ignore]
async fn test_commit_batch_deduplication(pool: PgPool) {
    let storage = setup(&pool).await;

    let events = vec![make_event(200, 0, "0xccc")];

    let first = storage
        .commit_batch(CONTRACT, &events, 200, "0xblock200")
        .await
        .unwrap();
    assert_eq!(first, 1);

    // Re-committing the same (transaction_hash, log_index) — as happens
    // when a batch is retried after a mid-commit crash — must not error
    // and must not double-insert.
    let second = storage
        .commit_batch(CONTRACT, &events, 200, "0xblock200")
        .await
        .unwrap();
    assert_eq!(second, 0, "duplicate insert should be ignored");

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE block_number = 200")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[sqlx::test]
#[ignore]
async fn test_get_and_advance_indexer_state(pool: PgPool) {
    let storage = setup(&pool).await;

    let initial = storage.get_state(CONTRACT).await.unwrap();
    assert!(initial.is_none(), "expected no initial state row");

    storage
        .commit_batch(CONTRACT, &[make_event(500, 0, "0xddd")], 500, "0xblock500")
        .await
        .unwrap();
    let state = storage.get_state(CONTRACT).await.unwrap().unwrap();
    assert_eq!(state.last_indexed_block, 500);

    storage
        .commit_batch(CONTRACT, &[make_event(1000, 0, "0xeee")], 1000, "0xblock1000")
        .await
        .unwrap();
    let state = storage.get_state(CONTRACT).await.unwrap().unwrap();
    assert_eq!(state.last_indexed_block, 1000);
}

#[sqlx::test]
#[ignore]
async fn test_rewind_for_reorg_deletes_events_above_fork_point(pool: PgPool) {
    let storage = setup(&pool).await;

    let events = vec![
        make_event(300, 0, "0xfff"),
        make_event(301, 0, "0x111"),
        make_event(302, 0, "0x222"),
        make_event(303, 0, "0x333"),
    ];
    storage
        .commit_batch(CONTRACT, &events, 303, "0xblock303")
        .await
        .unwrap();

    // Chain reorged back to block 301; rows at or below the fork point stay,
    // everything above is hard-deleted so a re-fetch can't collide with them.
    storage
        .rewind_for_reorg(CONTRACT, 301, "0xblock301-canonical")
        .await
        .unwrap();

    let safe: Vec<(i64,)> = sqlx::query_as(
        "SELECT block_number FROM events WHERE contract_address = $1 ORDER BY block_number",
    )
    .bind(CONTRACT)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(safe.len(), 2, "only blocks 300 and 301 should remain");
    assert_eq!(safe[0].0, 300);
    assert_eq!(safe[1].0, 301);

    let state = storage.get_state(CONTRACT).await.unwrap().unwrap();
    assert_eq!(state.last_indexed_block, 301);
    assert_eq!(state.last_block_hash.as_deref(), Some("0xblock301-canonical"));
    assert_eq!(state.status, "active");
}

#[sqlx::test]
#[ignore]
async fn test_record_error_increments_and_sets_status(pool: PgPool) {
    let storage = setup(&pool).await;

    storage.record_error(CONTRACT, "rpc timeout").await.unwrap();
    storage.record_error(CONTRACT, "rpc timeout again").await.unwrap();

    let state = storage.get_state(CONTRACT).await.unwrap().unwrap();
    assert_eq!(state.status, "error");
    assert_eq!(state.error_count, 2);
    assert_eq!(state.last_error.as_deref(), Some("rpc timeout again"));
}

#[sqlx::test]
#[ignore]
async fn test_successful_commit_clears_prior_error(pool: PgPool) {
    let storage = setup(&pool).await;

    storage.record_error(CONTRACT, "rpc timeout").await.unwrap();
    storage
        .commit_batch(CONTRACT, &[make_event(100, 0, "0x444")], 100, "0xblock100")
        .await
        .unwrap();

    let state = storage.get_state(CONTRACT).await.unwrap().unwrap();
    assert_eq!(state.status, "active");
    assert_eq!(state.error_count, 0);
    assert!(state.last_error.is_none());
}

#[sqlx::test]
#[ignore]
async fn test_remove_contract_cascades(pool: PgPool) {
    let storage = setup(&pool).await;

    storage
        .commit_batch(CONTRACT, &[make_event(100, 0, "0x555")], 100, "0xblock100")
        .await
        .unwrap();

    let removed = storage.remove_contract(CONTRACT).await.unwrap();
    assert!(removed);
    let removed_again = storage.remove_contract(CONTRACT).await.unwrap();
    assert!(!removed_again, "second removal should find nothing to delete");

    assert!(storage.get_state(CONTRACT).await.unwrap().is_none());

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE contract_address = $1")
        .bind(CONTRACT)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}
