//! `register_contract` / `remove_contract` / `pause` / `resume` (§6's admin
//! interface), reachable over HTTP and guarded by [`AdminAuth`].

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use indexer_common::error::IndexerError;
use indexer_common::models::checksum_address;
use indexer_decoder::AbiRegistry;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AdminAuth;
use crate::state::AdminState;

pub fn router() -> Router<AdminState> {
    Router::new()
        .route("/contracts", post(register_contract))
        .route("/contracts/{address}", delete(remove_contract))
        .route("/contracts/{address}/pause", post(pause))
        .route("/contracts/{address}/resume", post(resume))
}

#[derive(Debug, Deserialize)]
pub struct RegisterContractRequest {
    pub address: String,
    pub abi: String,
    pub name: String,
    #[serde(default)]
    pub start_block: i64,
    pub confirm_blocks: Option<i32>,
}

async fn register_contract(
    State(state): State<AdminState>,
    _auth: AdminAuth,
    Json(req): Json<RegisterContractRequest>,
) -> Result<Json<serde_json::Value>, IndexerError> {
    if !(1..=64).contains(&req.confirm_blocks.unwrap_or(state.config.default_confirm_blocks as i32))
    {
        return Err(IndexerError::Validation(
            "confirm_blocks must be between 1 and 64".to_string(),
        ));
    }

    // Reject a malformed ABI here, before it ever reaches storage — never
    // store a registration we can't build a worker from later.
    AbiRegistry::parse(&req.abi)?;

    let address = checksum_address(&req.address);
    let confirm_blocks = req
        .confirm_blocks
        .unwrap_or(state.config.default_confirm_blocks as i32);

    let (contract, was_new) = state
        .storage
        .upsert_contract(&address, &req.abi, &req.name, req.start_block, confirm_blocks)
        .await?;

    Ok(Json(json!({ "was_new": was_new, "contract_id": contract.id })))
}

async fn remove_contract(
    State(state): State<AdminState>,
    _auth: AdminAuth,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, IndexerError> {
    let address = checksum_address(&address);
    let removed = state.storage.remove_contract(&address).await?;
    if !removed {
        return Err(IndexerError::NotFound(format!(
            "no contract registered at {address}"
        )));
    }
    Ok(Json(json!({ "removed": true })))
}

async fn pause(
    State(state): State<AdminState>,
    _auth: AdminAuth,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, IndexerError> {
    let address = checksum_address(&address);
    state.storage.set_status(&address, "paused").await?;
    Ok(Json(json!({ "status": "paused" })))
}

async fn resume(
    State(state): State<AdminState>,
    _auth: AdminAuth,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, IndexerError> {
    let address = checksum_address(&address);
    state.storage.set_status(&address, "active").await?;
    Ok(Json(json!({ "status": "active" })))
}
