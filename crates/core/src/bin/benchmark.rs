//! Indexer pipeline benchmark.
//!
//! Measures RPC fetch + decode latency against a live (or recorded) RPC
//! endpoint to verify block processing keeps up with `POLL_INTERVAL`. Does
//! not require a database — it only measures the fetch/decode critical path.
//!
//! ```bash
//! RPC_ENDPOINT="https://..." CONTRACT_ADDRESS=0x... CONTRACT_ABI_PATH=./abi.json cargo run --bin benchmark
//! BENCHMARK_BLOCKS=100 cargo run --bin benchmark
//! ```

use std::time::{Duration, Instant};

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Filter;

use indexer_decoder::AbiRegistry;

struct BlockMetrics {
    fetch_logs_ms: f64,
    decode_ms: f64,
    total_ms: f64,
    log_count: usize,
    decoded_event_count: usize,
}

struct AggregateStats {
    block_count: usize,
    total_logs: usize,
    total_decoded_events: usize,
    avg_total_ms: f64,
    p50_total_ms: f64,
    p95_total_ms: f64,
    p99_total_ms: f64,
    max_total_ms: f64,
}

fn compute_percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn compute_stats(metrics: &[BlockMetrics]) -> AggregateStats {
    let n = metrics.len();
    let total_logs: usize = metrics.iter().map(|m| m.log_count).sum();
    let total_decoded: usize = metrics.iter().map(|m| m.decoded_event_count).sum();
    let avg_total = metrics.iter().map(|m| m.total_ms).sum::<f64>() / n as f64;

    let mut totals: Vec<f64> = metrics.iter().map(|m| m.total_ms).collect();
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap());

    AggregateStats {
        block_count: n,
        total_logs,
        total_decoded_events: total_decoded,
        avg_total_ms: avg_total,
        p50_total_ms: compute_percentile(&totals, 50.0),
        p95_total_ms: compute_percentile(&totals, 95.0),
        p99_total_ms: compute_percentile(&totals, 99.0),
        max_total_ms: *totals.last().unwrap_or(&0.0),
    }
}

fn print_report(stats: &AggregateStats, wall_elapsed: Duration, rpc_url: &str) {
    let target_ms = 2000.0;
    let pass = stats.p95_total_ms < target_ms;

    println!();
    println!("Indexer Core Benchmark Report");
    println!("────────────────────────────────────────");
    println!("RPC Endpoint:       {rpc_url}");
    println!("Blocks Processed:   {}", stats.block_count);
    println!("Total Logs:         {}", stats.total_logs);
    println!("Decoded Events:     {}", stats.total_decoded_events);
    println!("Wall Clock Time:    {:.1}s", wall_elapsed.as_secs_f64());
    println!();
    println!("p50: {:.1}ms  p95: {:.1}ms  p99: {:.1}ms  max: {:.1}ms",
        stats.p50_total_ms, stats.p95_total_ms, stats.p99_total_ms, stats.max_total_ms);
    println!();
    println!("Target: p95 < {target_ms:.0}ms    {}", if pass { "PASS" } else { "FAIL" });
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("benchmark=info,warn").init();

    let rpc_url = std::env::var("RPC_ENDPOINT")
        .map_err(|_| anyhow::anyhow!("RPC_ENDPOINT environment variable is required"))?;
    let address: Address = std::env::var("CONTRACT_ADDRESS")
        .map_err(|_| anyhow::anyhow!("CONTRACT_ADDRESS environment variable is required"))?
        .parse()?;
    let abi_path = std::env::var("CONTRACT_ABI_PATH")
        .map_err(|_| anyhow::anyhow!("CONTRACT_ABI_PATH environment variable is required"))?;
    let abi_json = std::fs::read_to_string(&abi_path)?;
    let registry = AbiRegistry::parse(&abi_json)?;

    let block_count: u64 = std::env::var("BENCHMARK_BLOCKS")
        .unwrap_or_else(|_| "50".to_string())
        .parse()
        .expect("BENCHMARK_BLOCKS must be a valid number");

    let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?);

    let latest = provider.get_block_number().await?;
    let start_block = latest.saturating_sub(block_count);

    println!("Chain tip: #{latest}  range: #{start_block} -> #{latest}  events in ABI: {}", registry.len());

    let mut metrics = Vec::with_capacity(block_count as usize);
    let wall_start = Instant::now();

    for block_num in start_block..latest {
        let block_start = Instant::now();

        let fetch_logs_start = Instant::now();
        let filter = Filter::new()
            .from_block(block_num)
            .to_block(block_num)
            .address(address);
        let logs = provider.get_logs(&filter).await?;
        let fetch_logs_ms = fetch_logs_start.elapsed().as_secs_f64() * 1000.0;

        let decode_start = Instant::now();
        let mut decoded_count = 0;
        for log in &logs {
            if matches!(registry.decode_log(&log.inner), Ok(Some(_))) {
                decoded_count += 1;
            }
        }
        let decode_ms = decode_start.elapsed().as_secs_f64() * 1000.0;

        metrics.push(BlockMetrics {
            fetch_logs_ms,
            decode_ms,
            total_ms: block_start.elapsed().as_secs_f64() * 1000.0,
            log_count: logs.len(),
            decoded_event_count: decoded_count,
        });
    }

    let wall_elapsed = wall_start.elapsed();
    if metrics.is_empty() {
        println!("No blocks processed, nothing to report.");
        return Ok(());
    }

    let stats = compute_stats(&metrics);
    print_report(&stats, wall_elapsed, &rpc_url);

    if stats.p95_total_ms >= 2000.0 {
        std::process::exit(1);
    }

    Ok(())
}
