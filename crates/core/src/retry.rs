//! Retry with exponential backoff, and a per-resource circuit breaker (C8).

use std::time::{Duration, Instant};

use indexer_common::error::IndexerError;
use rand::Rng;

const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 5;

/// `delay = min(base * 2^(attempt-1), cap) + jitter`, jitter in `[0, 0.25*delay]`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    let exp = BASE_DELAY.saturating_mul(1u32 << shift);
    let capped = exp.min(MAX_DELAY);

    let jitter_max_ms = (capped.as_millis() as f64 * 0.25) as u64;
    let jitter_ms = if jitter_max_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_max_ms)
    };

    capped + Duration::from_millis(jitter_ms)
}

/// Retry `f` up to `MAX_ATTEMPTS` times, sleeping with [`backoff_delay`]
/// between attempts, as long as the error classifies as transient.
pub async fn retry_transient<T, F, Fut>(mut f: F) -> Result<T, IndexerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, IndexerError>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying after transient error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Per-(contract, resource) circuit breaker. `threshold` consecutive
/// failures trip the breaker; it recovers via a single half-open probe
/// after `cooldown`.
pub struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    threshold: u32,
    cooldown: Duration,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            threshold,
            cooldown,
            opened_at: None,
        }
    }

    /// Whether a call should be allowed right now. Transitions `Open` ->
    /// `HalfOpen` once the cooldown has elapsed.
    pub fn allow_call(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cooldown {
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn on_success(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.opened_at = None;
    }

    pub fn on_failure(&mut self) {
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                self.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.threshold {
                    self.state = CircuitState::Open;
                    self.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let d1 = backoff_delay(1);
        let d5 = backoff_delay(10);
        assert!(d1 >= BASE_DELAY);
        assert!(d5 <= MAX_DELAY + MAX_DELAY.mul_f64(0.25));
    }

    #[test]
    fn circuit_opens_after_threshold_failures() {
        let mut cb = CircuitBreaker::new(3, Duration::from_secs(30));
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.on_failure();
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_call());
    }

    #[test]
    fn circuit_recovers_via_half_open_probe() {
        let mut cb = CircuitBreaker::new(1, Duration::from_millis(0));
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.allow_call());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.on_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_circuit() {
        let mut cb = CircuitBreaker::new(1, Duration::from_millis(0));
        cb.on_failure();
        assert!(cb.allow_call());
        cb.on_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
