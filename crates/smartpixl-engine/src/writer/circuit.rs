//! Circuit breaker (spec §4.7): three states guarding the bulk writer
//! against a persistently failing store. `Closed` writes normally;
//! `Open` pauses writes and dead-letters every batch while exponential
//! backoff ticks toward a `HalfOpen` probe; `HalfOpen` tries one batch and
//! either resets to `Closed` or falls back to `Open`.
//!
//! Grounded in the teacher's `resource_governor` pattern
//! (`daemon/src/resource_governor.rs`): a small `Mutex`-guarded state enum
//! with explicit transition methods, no hidden state beyond what a test can
//! assert on directly.

use std::sync::Mutex;
use std::time::{Duration, Instant};

const MAX_BACKOFF_SECS: u64 = 30;
const MAX_BACKOFF_SHIFT: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Backoff before an `Open` circuit allows its next `HalfOpen` probe:
/// `1 << min(failures, 14)` seconds, capped at 30s (spec §4.7).
fn backoff_for(consecutive_failures: u32) -> Duration {
    let shift = consecutive_failures.min(MAX_BACKOFF_SHIFT);
    Duration::from_secs((1u64 << shift).min(MAX_BACKOFF_SECS))
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("circuit breaker mutex poisoned").state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().expect("circuit breaker mutex poisoned").consecutive_failures
    }

    /// Whether a write should even be attempted right now. `Open` only
    /// allows an attempt once its backoff has elapsed, at which point it
    /// transitions to `HalfOpen` for exactly one probe attempt.
    pub fn should_attempt(&self) -> bool {
        let mut guard = self.inner.lock().expect("circuit breaker mutex poisoned");
        match guard.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = guard.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= backoff_for(guard.consecutive_failures) {
                    guard.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful batch write. `HalfOpen` -> `Closed`, counters
    /// reset (spec §8.1 "circuit idempotence").
    pub fn record_success(&self) {
        let mut guard = self.inner.lock().expect("circuit breaker mutex poisoned");
        guard.state = CircuitState::Closed;
        guard.consecutive_failures = 0;
        guard.opened_at = None;
    }

    /// Record a failure that should retry under the normal policy
    /// (deadlock, unknown-after-retries) without tripping the circuit
    /// immediately.
    pub fn record_failure(&self) {
        let mut guard = self.inner.lock().expect("circuit breaker mutex poisoned");
        guard.consecutive_failures += 1;
        if guard.state != CircuitState::Open {
            guard.state = CircuitState::Open;
            guard.opened_at = Some(Instant::now());
        }
    }

    /// Trip the circuit open immediately — no retries — for fatal store
    /// errors (filegroup/log full, spec §4.7).
    pub fn trip_immediately(&self) {
        let mut guard = self.inner.lock().expect("circuit breaker mutex poisoned");
        guard.consecutive_failures += 1;
        guard.state = CircuitState::Open;
        guard.opened_at = Some(Instant::now());
    }

    /// Operator override via `/internal/circuit-reset` (spec §4.7).
    pub fn force_closed(&self) {
        let mut guard = self.inner.lock().expect("circuit breaker mutex poisoned");
        guard.state = CircuitState::Closed;
        guard.consecutive_failures = 0;
        guard.opened_at = None;
    }
}
