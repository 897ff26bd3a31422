//! Shared state for the admin/health HTTP surface.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use indexer_common::config::AppConfig;
use indexer_common::storage::StorageAdapter;
use sqlx::PgPool;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AdminState {
    pub storage: StorageAdapter,
    pub config: AppConfig,
    pub ready: Arc<AtomicBool>,
}

impl AdminState {
    pub fn new(pool: PgPool, config: AppConfig, ready: Arc<AtomicBool>) -> Self {
        Self {
            storage: StorageAdapter::new(pool),
            config,
            ready,
        }
    }
}
