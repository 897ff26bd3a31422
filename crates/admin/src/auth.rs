//! Bearer-token guard for mutating admin routes.
//!
//! There is no user-account concept in this system — contracts are
//! registered by whoever operates the indexer, not by end users — so a
//! single shared token is enough, unlike the JWT/session machinery a
//! user-facing API would need.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use indexer_common::error::IndexerError;

use crate::state::AdminState;

pub struct AdminAuth;

impl FromRequestParts<AdminState> for AdminAuth {
    type Rejection = IndexerError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AdminState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let expected = state.config.admin_token.clone();
        let provided = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);

        async move {
            match provided {
                Some(token) if token == expected => Ok(AdminAuth),
                _ => Err(IndexerError::Auth(
                    "missing or invalid Authorization bearer token".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_compiles() {
        let _ = AdminAuth;
    }
}
