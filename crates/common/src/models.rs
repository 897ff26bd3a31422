//! Shared persisted types: the shapes written and read across the
//! contracts / events / indexer_state tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered contract the indexer tails.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contract {
    pub id: i32,
    pub address: String,
    pub abi: String,
    pub name: String,
    pub start_block: i64,
    pub current_block: i64,
    pub confirm_blocks: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One decoded log, ready for idempotent persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub contract_address: String,
    pub event_name: String,
    pub block_number: i64,
    pub block_hash: String,
    pub transaction_hash: String,
    pub transaction_index: i32,
    pub log_index: i32,
    pub args: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Per-contract progress and health, one row per contract.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndexerState {
    pub contract_address: String,
    pub last_indexed_block: i64,
    pub last_block_hash: Option<String>,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub error_count: i32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerStatus {
    Active,
    Paused,
    Error,
}

impl IndexerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexerStatus::Active => "active",
            IndexerStatus::Paused => "paused",
            IndexerStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for IndexerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EIP-55 checksum-encode a 20-byte address given as a `0x`-prefixed hex string
/// (case-insensitive input). Returns the input unchanged (lowercased 0x form)
/// if it is not a well-formed 40-hex-digit address.
pub fn checksum_address(address: &str) -> String {
    let stripped = address.strip_prefix("0x").unwrap_or(address);
    if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return address.to_string();
    }
    let lower = stripped.to_lowercase();
    let hash = keccak256_hex(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        if c.is_ascii_digit() {
            out.push(c);
            continue;
        }
        let nibble = hash_nibble(&hash, i);
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn hash_nibble(hash: &[u8], char_index: usize) -> u8 {
    let byte = hash[char_index / 2];
    if char_index % 2 == 0 {
        byte >> 4
    } else {
        byte & 0x0f
    }
}

fn keccak256_hex(data: &[u8]) -> Vec<u8> {
    alloy::primitives::keccak256(data).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_known_address() {
        // Canonical EIP-55 test vector.
        let input = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let expected = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert_eq!(checksum_address(input), expected);
    }

    #[test]
    fn checksum_passes_through_malformed_input() {
        assert_eq!(checksum_address("not-an-address"), "not-an-address");
    }
}
