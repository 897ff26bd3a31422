//! Per-contract indexing loop (C7).
//!
//! One [`ContractWorker`] runs for the lifetime of one registered contract:
//! poll tip, gate by confirmations, fetch a batch-sized range of logs,
//! decode, persist, advance state, repeat. Reorg recovery and retry/backoff
//! are handled inline; an unrecoverable error marks the contract `error` and
//! returns without taking down the supervisor.

use std::time::Duration;

use alloy::primitives::Address;
use chrono::{TimeZone, Utc};
use indexer_common::error::IndexerError;
use indexer_common::models::DecodedEvent;
use indexer_decoder::AbiRegistry;
use tokio_util::sync::CancellationToken;

use crate::cache::RecentBlockCache;
use crate::confirmation::{has_confirmed_work, safe_block};
use crate::reorg::{ReorgCheck, check_for_reorg};
use crate::retry::{CircuitBreaker, retry_transient};
use crate::rpc::RpcGateway;
use indexer_common::storage::StorageAdapter;

pub struct WorkerConfig {
    pub address: Address,
    pub checksummed_address: String,
    pub abi: String,
    pub start_block: u64,
    pub confirm_blocks: u32,
    pub batch_size: u64,
    pub poll_interval: Duration,
    pub block_cache_size: usize,
}

pub struct ContractWorker {
    config: WorkerConfig,
    rpc: RpcGateway,
    registry: AbiRegistry,
    cache: RecentBlockCache,
    storage: StorageAdapter,
    rpc_breaker: CircuitBreaker,
    storage_breaker: CircuitBreaker,
}

impl ContractWorker {
    pub fn new(
        config: WorkerConfig,
        rpc: RpcGateway,
        storage: StorageAdapter,
    ) -> Result<Self, IndexerError> {
        let registry = AbiRegistry::parse(&config.abi)?;
        let cache = RecentBlockCache::new(config.block_cache_size);
        Ok(Self {
            config,
            rpc,
            registry,
            cache,
            storage,
            rpc_breaker: CircuitBreaker::new(5, Duration::from_secs(30)),
            storage_breaker: CircuitBreaker::new(5, Duration::from_secs(30)),
        })
    }

    /// Run until cancelled. Errors that can't be classified as transient
    /// mark the contract `error` in indexer_state and return `Ok(())` — the
    /// supervisor keeps other workers running.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), IndexerError> {
        loop {
            if cancel.is_cancelled() {
                tracing::info!(contract = %self.config.checksummed_address, "worker cancelled, exiting cleanly");
                return Ok(());
            }

            if self.is_paused().await? {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => continue,
                    _ = cancel.cancelled() => return Ok(()),
                }
            }

            match self.step().await {
                Ok(WorkOutcome::Idle) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = cancel.cancelled() => return Ok(()),
                    }
                }
                Ok(WorkOutcome::Progressed) => {}
                Err(e) if e.classify() == indexer_common::error::ErrorClass::Fatal => {
                    tracing::error!(contract = %self.config.checksummed_address, error = %e, "fatal error, halting worker");
                    let _ = self
                        .storage
                        .record_error(&self.config.checksummed_address, &e.to_string())
                        .await;
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(contract = %self.config.checksummed_address, error = %e, "step failed, will retry next iteration");
                    let _ = self
                        .storage
                        .record_error(&self.config.checksummed_address, &e.to_string())
                        .await;
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = cancel.cancelled() => return Ok(()),
                    }
                }
            }
        }
    }

    async fn is_paused(&self) -> Result<bool, IndexerError> {
        let state = self.storage.get_state(&self.config.checksummed_address).await?;
        Ok(state.map(|s| s.status == "paused").unwrap_or(false))
    }

    async fn step(&mut self) -> Result<WorkOutcome, IndexerError> {
        let state = self.storage.get_state(&self.config.checksummed_address).await?;
        let last_indexed_block = state
            .map(|s| s.last_indexed_block)
            .unwrap_or(self.config.start_block as i64 - 1);

        if !self.rpc_breaker.allow_call() {
            return Err(IndexerError::RpcTransient(
                "rpc circuit breaker open".to_string(),
            ));
        }

        let tip = match retry_transient(|| self.rpc.latest_block()).await {
            Ok(tip) => {
                self.rpc_breaker.on_success();
                tip
            }
            Err(e) => {
                self.rpc_breaker.on_failure();
                return Err(e);
            }
        };

        if !has_confirmed_work(tip, self.config.confirm_blocks, last_indexed_block) {
            return Ok(WorkOutcome::Idle);
        }

        let from = (last_indexed_block + 1) as u64;
        let safe = safe_block(tip, self.config.confirm_blocks);
        let to = safe.min(from + self.config.batch_size - 1);

        match check_for_reorg(&mut self.rpc, &mut self.cache, from, self.config.start_block).await?
        {
            ReorgCheck::Recovered { fork_point } => {
                let header = self.rpc.get_block(fork_point).await?;
                if !self.storage_breaker.allow_call() {
                    return Err(IndexerError::StorageTransient(
                        "storage circuit breaker open".to_string(),
                    ));
                }
                self.storage
                    .rewind_for_reorg(
                        &self.config.checksummed_address,
                        fork_point as i64,
                        &header.hash.to_string(),
                    )
                    .await?;
                tracing::warn!(
                    contract = %self.config.checksummed_address,
                    fork_point,
                    "reorg recovered, resuming from fork point"
                );
                return Ok(WorkOutcome::Progressed);
            }
            ReorgCheck::Continue => {}
        }

        let logs = retry_transient(|| self.rpc.get_logs(from, to, self.config.address)).await?;

        // Fetch and cache a header for every block in the range, not just
        // the ones with logs — the reorg detector's fork-point walk-back
        // needs a populated cache entry at each block number it checks, or
        // it degrades straight to the conservative floor on any multi-block
        // batch.
        let mut headers = std::collections::HashMap::with_capacity((to - from + 1) as usize);
        for block_number in from..=to {
            let header = self.rpc.get_block(block_number).await?;
            self.cache.put(block_number, header.hash, header.parent_hash);
            headers.insert(block_number, header);
        }

        let mut events = Vec::with_capacity(logs.len());

        for log in &logs {
            let block_number = log.block_number.ok_or_else(|| {
                IndexerError::DecodeSkippable("log missing block_number".to_string())
            })?;
            let decoded = match self.registry.decode_log(&log.inner) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(contract = %self.config.checksummed_address, error = %e, "skipping undecodable log");
                    continue;
                }
            };

            let timestamp = headers
                .get(&block_number)
                .map(|h| h.timestamp)
                .ok_or_else(|| {
                    IndexerError::DecodeSkippable("log references block outside fetched range".to_string())
                })?;

            let block_hash = log
                .block_hash
                .ok_or_else(|| IndexerError::DecodeSkippable("log missing block_hash".to_string()))?;
            let tx_hash = log
                .transaction_hash
                .ok_or_else(|| IndexerError::DecodeSkippable("log missing tx_hash".to_string()))?;

            events.push(DecodedEvent {
                contract_address: self.config.checksummed_address.clone(),
                event_name: decoded.event_name,
                block_number: block_number as i64,
                block_hash: block_hash.to_string(),
                transaction_hash: tx_hash.to_string(),
                transaction_index: log.transaction_index.unwrap_or_default() as i32,
                log_index: log.log_index.unwrap_or_default() as i32,
                args: decoded.args,
                timestamp: Utc
                    .timestamp_opt(timestamp as i64, 0)
                    .single()
                    .unwrap_or_else(Utc::now),
            });
        }

        let to_header = &headers[&to];

        if !self.storage_breaker.allow_call() {
            return Err(IndexerError::StorageTransient(
                "storage circuit breaker open".to_string(),
            ));
        }
        match self
            .storage
            .commit_batch(
                &self.config.checksummed_address,
                &events,
                to as i64,
                &to_header.hash.to_string(),
            )
            .await
        {
            Ok(inserted) => {
                self.storage_breaker.on_success();
                tracing::info!(
                    contract = %self.config.checksummed_address,
                    from, to, inserted,
                    "batch committed"
                );
                Ok(WorkOutcome::Progressed)
            }
            Err(e) => {
                self.storage_breaker.on_failure();
                Err(e)
            }
        }
    }
}

enum WorkOutcome {
    Idle,
    Progressed,
}
