pub mod contracts;
pub mod health;

use axum::Router;

use crate::state::AdminState;

/// Build the complete admin/health router.
pub fn create_router(state: AdminState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(contracts::router())
        .with_state(state)
}
