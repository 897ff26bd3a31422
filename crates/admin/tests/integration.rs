//! Exercises the admin HTTP surface end to end against a real Postgres.
//! Run with `cargo test -p indexer-admin -- --ignored` and `DATABASE_URL` set.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use indexer_admin::routes::create_router;
use indexer_admin::state::AdminState;
use indexer_common::config::AppConfig;
use sqlx::PgPool;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "test-admin-token";

fn test_config() -> AppConfig {
    AppConfig {
        rpc_endpoint: "http://localhost:8545".to_string(),
        rpc_fallbacks: vec![],
        database_url: "postgres://localhost/test".to_string(),
        poll_interval_secs: 6,
        batch_size: 100,
        default_confirm_blocks: 6,
        block_cache_size: 100,
        health_port: 8081,
        db_max_connections: 5,
        db_min_connections: 1,
        admin_token: ADMIN_TOKEN.to_string(),
        log_format: "json".to_string(),
    }
}

#[sqlx::test]
#[ignore]
async fn register_remove_round_trip(pool: PgPool) {
    sqlx::query("DELETE FROM contracts WHERE address = '0x1111111111111111111111111111111111111111'")
        .execute(&pool)
        .await
        .unwrap();

    let state = AdminState::new(pool, test_config(), Arc::new(AtomicBool::new(true)));
    let app = create_router(state);

    let body = serde_json::json!({
        "address": "0x1111111111111111111111111111111111111111",
        "abi": "[]",
        "name": "test",
        "start_block": 100,
        "confirm_blocks": 6
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/contracts")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/contracts/0x1111111111111111111111111111111111111111")
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

