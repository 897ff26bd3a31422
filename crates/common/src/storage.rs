//! Storage adapter (C6).
//!
//! Every write to `contracts`, `events`, and `indexer_state` goes through
//! here so the idempotency and ordering invariants in the schema contract
//! are enforced in one place.

use crate::error::IndexerError;
use crate::models::{Contract, DecodedEvent, IndexerState};
use sqlx::PgPool;

#[derive(Clone)]
pub struct StorageAdapter {
    pool: PgPool,
}

impl StorageAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_contracts(&self) -> Result<Vec<Contract>, IndexerError> {
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn upsert_contract(
        &self,
        address: &str,
        abi: &str,
        name: &str,
        start_block: i64,
        confirm_blocks: i32,
    ) -> Result<(Contract, bool), IndexerError> {
        let existing: Option<Contract> =
            sqlx::query_as("SELECT * FROM contracts WHERE address = $1")
                .bind(address)
                .fetch_optional(&self.pool)
                .await?;
        let was_new = existing.is_none();

        let contract = sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO contracts (address, abi, name, start_block, current_block, confirm_blocks)
            VALUES ($1, $2, $3, $4, $4 - 1, $5)
            ON CONFLICT (address) DO UPDATE SET
                abi = EXCLUDED.abi,
                name = EXCLUDED.name,
                confirm_blocks = EXCLUDED.confirm_blocks,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(address)
        .bind(abi)
        .bind(name)
        .bind(start_block)
        .bind(confirm_blocks)
        .fetch_one(&self.pool)
        .await?;

        Ok((contract, was_new))
    }

    pub async fn remove_contract(&self, address: &str) -> Result<bool, IndexerError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM events WHERE contract_address = $1")
            .bind(address)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM indexer_state WHERE contract_address = $1")
            .bind(address)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM contracts WHERE address = $1")
            .bind(address)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_state(&self, contract_address: &str) -> Result<Option<IndexerState>, IndexerError> {
        sqlx::query_as("SELECT * FROM indexer_state WHERE contract_address = $1")
            .bind(contract_address)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn set_status(&self, contract_address: &str, status: &str) -> Result<(), IndexerError> {
        sqlx::query(
            r#"
            INSERT INTO indexer_state (contract_address, last_indexed_block, status)
            VALUES ($1, -1, $2)
            ON CONFLICT (contract_address) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(contract_address)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a batch of decoded events and advance state in one
    /// transaction. Returns the number of rows actually inserted (events
    /// already seen via `(transaction_hash, log_index)` are silently
    /// skipped).
    pub async fn commit_batch(
        &self,
        contract_address: &str,
        events: &[DecodedEvent],
        last_indexed_block: i64,
        last_block_hash: &str,
    ) -> Result<u64, IndexerError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for event in events {
            let result = sqlx::query(
                r#"
                INSERT INTO events (
                    contract_address, event_name, block_number, block_hash,
                    transaction_hash, transaction_index, log_index, args, timestamp, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
                ON CONFLICT (transaction_hash, log_index) DO NOTHING
                "#,
            )
            .bind(&event.contract_address)
            .bind(&event.event_name)
            .bind(event.block_number)
            .bind(&event.block_hash)
            .bind(&event.transaction_hash)
            .bind(event.transaction_index)
            .bind(event.log_index)
            .bind(&event.args)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        sqlx::query(
            r#"
            INSERT INTO indexer_state (contract_address, last_indexed_block, last_block_hash, last_processed_at, status, error_count, last_error)
            VALUES ($1, $2, $3, now(), 'active', 0, NULL)
            ON CONFLICT (contract_address) DO UPDATE SET
                last_indexed_block = EXCLUDED.last_indexed_block,
                last_block_hash = EXCLUDED.last_block_hash,
                last_processed_at = EXCLUDED.last_processed_at,
                status = EXCLUDED.status,
                error_count = 0,
                last_error = NULL
            "#,
        )
        .bind(contract_address)
        .bind(last_indexed_block)
        .bind(last_block_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE contracts SET current_block = $2, updated_at = now() WHERE address = $1")
            .bind(contract_address)
            .bind(last_indexed_block)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn record_error(&self, contract_address: &str, message: &str) -> Result<(), IndexerError> {
        sqlx::query(
            r#"
            INSERT INTO indexer_state (contract_address, last_indexed_block, status, error_count, last_error)
            VALUES ($1, -1, 'error', 1, $2)
            ON CONFLICT (contract_address) DO UPDATE SET
                status = 'error',
                error_count = indexer_state.error_count + 1,
                last_error = EXCLUDED.last_error
            "#,
        )
        .bind(contract_address)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reorg recovery: delete events at/after the fork point and rewind
    /// state, atomically.
    pub async fn rewind_for_reorg(
        &self,
        contract_address: &str,
        fork_point: i64,
        fork_hash: &str,
    ) -> Result<(), IndexerError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM events WHERE contract_address = $1 AND block_number > $2")
            .bind(contract_address)
            .bind(fork_point)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE indexer_state
            SET last_indexed_block = $2, last_block_hash = $3, status = 'active'
            WHERE contract_address = $1
            "#,
        )
        .bind(contract_address)
        .bind(fork_point)
        .bind(fork_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
