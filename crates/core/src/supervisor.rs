//! Lifecycle supervisor (C9).
//!
//! Loads every registered contract at startup, spawns one [`ContractWorker`]
//! task per contract, and owns graceful shutdown: on cancellation each
//! worker finishes its in-flight batch (or aborts it) before the supervisor
//! waits out a grace period and returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indexer_common::config::AppConfig;
use indexer_common::error::IndexerError;
use indexer_common::models::checksum_address;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::rpc::RpcGateway;
use indexer_common::storage::StorageAdapter;
use crate::worker::{ContractWorker, WorkerConfig};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

pub struct Supervisor {
    config: AppConfig,
    storage: StorageAdapter,
    ready: Arc<AtomicBool>,
}

impl Supervisor {
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        Self {
            config,
            storage: StorageAdapter::new(pool),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn readiness_flag(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    /// Start a worker for every registered contract and run until
    /// cancelled. Returns once every worker has exited.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), IndexerError> {
        let contracts = self.storage.list_contracts().await?;
        tracing::info!(count = contracts.len(), "loaded registered contracts");

        let mut handles = Vec::with_capacity(contracts.len());

        for contract in contracts {
            let rpc = RpcGateway::new(&self.config.rpc_endpoint, &self.config.rpc_fallbacks)?;
            let storage = self.storage.clone();
            let cancel = cancel.clone();
            let address: alloy::primitives::Address = contract
                .address
                .parse()
                .map_err(|e| IndexerError::Validation(format!("invalid contract address: {e}")))?;

            let worker_config = WorkerConfig {
                address,
                checksummed_address: checksum_address(&contract.address),
                abi: contract.abi.clone(),
                start_block: contract.start_block.max(0) as u64,
                confirm_blocks: contract.confirm_blocks.max(1) as u32,
                batch_size: self.config.batch_size,
                poll_interval: Duration::from_secs(self.config.poll_interval_secs),
                block_cache_size: self.config.block_cache_size,
            };

            let handle = tokio::spawn(async move {
                let mut worker = match ContractWorker::new(worker_config, rpc, storage) {
                    Ok(worker) => worker,
                    Err(e) => {
                        tracing::error!(contract = %contract.address, error = %e, "failed to start worker");
                        return;
                    }
                };
                if let Err(e) = worker.run(cancel).await {
                    tracing::error!(contract = %contract.address, error = %e, "worker exited with fatal error");
                }
            });
            handles.push(handle);
        }

        let primary_reachable = {
            let mut probe = RpcGateway::new(&self.config.rpc_endpoint, &self.config.rpc_fallbacks)?;
            probe.health_check().await
        };
        self.ready.store(primary_reachable, Ordering::SeqCst);

        cancel.cancelled().await;
        tracing::info!("shutdown signal received, draining workers");

        let drain = await_all(handles);
        match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, drain).await {
            Ok(_) => tracing::info!("all workers drained cleanly"),
            Err(_) => tracing::warn!("grace period elapsed before all workers finished"),
        }

        Ok(())
    }
}

async fn await_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}
