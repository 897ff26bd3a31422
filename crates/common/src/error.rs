use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// How the retry/circuit-breaker layer should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying with backoff; may trip a circuit breaker.
    Transient,
    /// Not worth retrying; surface to operator, halt the affected contract.
    Permanent,
    /// Halt the whole indexing loop for that contract, do not retry.
    Fatal,
}

/// Crate-wide error type for the indexing core.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("rpc transient error: {0}")]
    RpcTransient(String),

    #[error("rpc permanent error: {0}")]
    RpcPermanent(String),

    #[error("decode error (skippable): {0}")]
    DecodeSkippable(String),

    #[error("decode error (fatal): {0}")]
    DecodeFatal(String),

    #[error("storage error (transient): {0}")]
    StorageTransient(String),

    #[error("storage error (permanent): {0}")]
    StoragePermanent(String),

    #[error("reorg beyond cache window, recovered conservatively: {0}")]
    ReorgBeyondWindow(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IndexerError {
    /// Classify this error for the retry/circuit-breaker layer (C8).
    pub fn classify(&self) -> ErrorClass {
        match self {
            IndexerError::Database(_) => ErrorClass::Transient,
            IndexerError::RpcTransient(_) => ErrorClass::Transient,
            IndexerError::StorageTransient(_) => ErrorClass::Transient,
            IndexerError::ReorgBeyondWindow(_) => ErrorClass::Transient,
            IndexerError::RpcPermanent(_) => ErrorClass::Permanent,
            IndexerError::DecodeSkippable(_) => ErrorClass::Permanent,
            IndexerError::StoragePermanent(_) => ErrorClass::Permanent,
            IndexerError::Validation(_) => ErrorClass::Permanent,
            IndexerError::NotFound(_) => ErrorClass::Permanent,
            IndexerError::DecodeFatal(_) => ErrorClass::Fatal,
            IndexerError::Config(_) => ErrorClass::Fatal,
            IndexerError::Auth(_) => ErrorClass::Permanent,
            IndexerError::Internal(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.classify() == ErrorClass::Transient
    }
}

impl IntoResponse for IndexerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            IndexerError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            IndexerError::RpcTransient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            IndexerError::RpcPermanent(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            IndexerError::DecodeSkippable(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            IndexerError::DecodeFatal(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            IndexerError::StorageTransient(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            IndexerError::StoragePermanent(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            IndexerError::ReorgBeyondWindow(msg) => (StatusCode::OK, msg.clone()),
            IndexerError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            IndexerError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            IndexerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            IndexerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            IndexerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_transient_classifies_transient() {
        let err = IndexerError::RpcTransient("timeout".into());
        assert_eq!(err.classify(), ErrorClass::Transient);
        assert!(err.is_transient());
    }

    #[test]
    fn decode_fatal_classifies_fatal() {
        let err = IndexerError::DecodeFatal("malformed abi".into());
        assert_eq!(err.classify(), ErrorClass::Fatal);
    }

    #[test]
    fn decode_skippable_classifies_permanent() {
        let err = IndexerError::DecodeSkippable("unknown topic0".into());
        assert_eq!(err.classify(), ErrorClass::Permanent);
    }
}
