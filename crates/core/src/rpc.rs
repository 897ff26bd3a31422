//! RPC gateway (C1).
//!
//! Wraps a primary endpoint plus an ordered list of fallbacks behind one
//! `latest_block` / `get_logs` / `get_block` / `health_check` surface.
//! Transient failures rotate to the next endpoint; an endpoint with too many
//! consecutive failures is skipped for a cooldown window but stays in
//! rotation rather than being dropped permanently.

use std::time::{Duration, Instant};

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use indexer_common::error::IndexerError;

const MAX_CONSECUTIVE_FAILURES: u32 = 3;
const ENDPOINT_COOLDOWN: Duration = Duration::from_secs(30);

struct Endpoint {
    url: String,
    provider: DynProvider,
    consecutive_failures: u32,
    cooled_down_until: Option<Instant>,
}

pub struct RpcGateway {
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
}

impl RpcGateway {
    pub fn new(primary: &str, fallbacks: &[String]) -> Result<Self, IndexerError> {
        let mut endpoints = Vec::with_capacity(1 + fallbacks.len());
        for url in std::iter::once(primary).chain(fallbacks.iter().map(String::as_str)) {
            let parsed = url
                .parse()
                .map_err(|e| IndexerError::Config(format!("invalid RPC url {url}: {e}")))?;
            let provider = ProviderBuilder::new().connect_http(parsed).erased();
            endpoints.push(Endpoint {
                url: url.to_string(),
                provider,
                consecutive_failures: 0,
                cooled_down_until: None,
            });
        }
        Ok(Self { endpoints })
    }

    fn available_indices(&self) -> Vec<usize> {
        let now = Instant::now();
        self.endpoints
            .iter()
            .enumerate()
            .filter(|(_, e)| e.cooled_down_until.is_none_or(|until| now >= until))
            .map(|(i, _)| i)
            .collect()
    }

    fn record_failure(&mut self, idx: usize) {
        let endpoint = &mut self.endpoints[idx];
        endpoint.consecutive_failures += 1;
        if endpoint.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            tracing::warn!(
                url = %endpoint.url,
                failures = endpoint.consecutive_failures,
                "rpc endpoint exceeded failure threshold, cooling down"
            );
            endpoint.cooled_down_until = Some(Instant::now() + ENDPOINT_COOLDOWN);
        }
    }

    fn record_success(&mut self, idx: usize) {
        let endpoint = &mut self.endpoints[idx];
        endpoint.consecutive_failures = 0;
        endpoint.cooled_down_until = None;
    }

    /// Try each available endpoint in order until one succeeds or all fail.
    async fn with_failover<T, F, Fut>(&mut self, op: F) -> Result<T, IndexerError>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: std::future::Future<Output = Result<T, IndexerError>>,
    {
        let candidates = self.available_indices();
        if candidates.is_empty() {
            return Err(IndexerError::RpcTransient(
                "all rpc endpoints are cooling down".to_string(),
            ));
        }

        let mut last_err = None;
        for idx in candidates {
            let provider = self.endpoints[idx].provider.clone();
            match op(provider).await {
                Ok(value) => {
                    self.record_success(idx);
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(url = %self.endpoints[idx].url, error = %e, "rpc call failed, trying next endpoint");
                    self.record_failure(idx);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            IndexerError::RpcTransient("no rpc endpoint available".to_string())
        }))
    }

    pub async fn latest_block(&mut self) -> Result<u64, IndexerError> {
        self.with_failover(|provider| async move {
            provider
                .get_block_number()
                .await
                .map_err(|e| IndexerError::RpcTransient(e.to_string()))
        })
        .await
    }

    pub async fn get_block(&mut self, number: u64) -> Result<BlockHeader, IndexerError> {
        self.with_failover(move |provider| async move {
            let block = provider
                .get_block_by_number(BlockNumberOrTag::Number(number))
                .await
                .map_err(|e| IndexerError::RpcTransient(e.to_string()))?
                .ok_or_else(|| IndexerError::RpcPermanent(format!("block {number} not found")))?;
            Ok(BlockHeader {
                number,
                hash: block.header.hash,
                parent_hash: block.header.parent_hash,
                timestamp: block.header.timestamp,
            })
        })
        .await
    }

    /// Fetch logs for an inclusive block range, optionally filtered to one
    /// contract address. Caller is responsible for capping the range to
    /// `BATCH_SIZE`.
    pub async fn get_logs(
        &mut self,
        from_block: u64,
        to_block: u64,
        address: Address,
    ) -> Result<Vec<Log>, IndexerError> {
        self.with_failover(move |provider| async move {
            let filter = Filter::new()
                .from_block(from_block)
                .to_block(to_block)
                .address(address);
            provider
                .get_logs(&filter)
                .await
                .map_err(|e| IndexerError::RpcTransient(e.to_string()))
        })
        .await
    }

    pub async fn health_check(&mut self) -> bool {
        self.latest_block().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_url() {
        let result = RpcGateway::new("not a url", &[]);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_primary_and_fallbacks() {
        let gateway = RpcGateway::new(
            "http://localhost:8545",
            &["http://localhost:8546".to_string()],
        )
        .unwrap();
        assert_eq!(gateway.endpoints.len(), 2);
    }
}
