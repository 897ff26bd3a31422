use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Primary EVM JSON-RPC endpoint.
    pub rpc_endpoint: String,

    /// Ordered fallback RPC endpoints, tried in order after the primary.
    pub rpc_fallbacks: Vec<String>,

    /// PostgreSQL connection string.
    pub database_url: String,

    /// Poll interval between indexing iterations, in seconds.
    pub poll_interval_secs: u64,

    /// Maximum number of blocks fetched per `eth_getLogs` call.
    pub batch_size: u64,

    /// Default confirmation depth assigned to newly registered contracts.
    pub default_confirm_blocks: u32,

    /// Capacity of the per-contract recent-block cache.
    pub block_cache_size: usize,

    /// Port for the liveness/readiness/admin HTTP surface.
    pub health_port: u16,

    /// Maximum PostgreSQL pool size.
    pub db_max_connections: u32,

    /// Minimum (idle) PostgreSQL pool size.
    pub db_min_connections: u32,

    /// Bearer token required on mutating admin routes.
    pub admin_token: String,

    /// `json` or `pretty`.
    pub log_format: String,
}

impl AppConfig {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let rpc_endpoint = std::env::var("RPC_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("RPC_ENDPOINT environment variable is required"))?;

        let rpc_fallbacks = std::env::var("RPC_FALLBACKS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let poll_interval_secs = parse_env_or("POLL_INTERVAL", 6)?;
        let batch_size = parse_env_or("BATCH_SIZE", 100)?;
        let default_confirm_blocks: u32 = parse_env_or("DEFAULT_CONFIRM_BLOCKS", 6)?;
        if !(1..=64).contains(&default_confirm_blocks) {
            anyhow::bail!("DEFAULT_CONFIRM_BLOCKS must be between 1 and 64");
        }
        let block_cache_size = parse_env_or("BLOCK_CACHE_SIZE", 100)?;
        let health_port = parse_env_or("HEALTH_PORT", 8081)?;
        let db_max_connections = parse_env_or("DB_MAX_CONNECTIONS", 20)?;
        let db_min_connections = parse_env_or("DB_MIN_CONNECTIONS", 5)?;

        let admin_token = std::env::var("ADMIN_TOKEN")
            .map_err(|_| anyhow::anyhow!("ADMIN_TOKEN environment variable is required"))?;

        let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
        if log_format != "json" && log_format != "pretty" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'pretty'");
        }

        Ok(Self {
            rpc_endpoint,
            rpc_fallbacks,
            database_url,
            poll_interval_secs,
            batch_size,
            default_confirm_blocks,
            block_cache_size,
            health_port,
            db_max_connections,
            db_min_connections,
            admin_token,
            log_format,
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_or_uses_default_when_unset() {
        // SAFETY: test-only env mutation, no concurrent access in this process.
        unsafe {
            std::env::remove_var("__INDEXER_TEST_UNSET_KEY__");
        }
        let value: u64 = parse_env_or("__INDEXER_TEST_UNSET_KEY__", 42).unwrap();
        assert_eq!(value, 42);
    }
}
