//! Per-provider circuit breaking for upstream calls.
//!
//! The breaker trips after a run of consecutive failures and fails fast
//! until the open timeout passes. At that point a single probe request is
//! let through: its success resets the circuit, its failure re-trips it.
//! Other callers keep failing fast while the probe is outstanding, so a
//! still-broken upstream sees one request per recovery window rather than
//! a thundering herd.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Observable state of a provider circuit, derived from its failure
/// window rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Trip threshold and recovery timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed.
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Default)]
struct CircuitWindow {
    consecutive_failures: u32,
    tripped_at: Option<Instant>,
    probe_outstanding: bool,
}

/// Thread-safe circuit breaker guarding one provider's network requests.
/// A provider-wide outage trips the breaker so subsequent jobs fail fast
/// instead of burning their retry budget against a dead upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    window: Mutex<CircuitWindow>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            window: Mutex::new(CircuitWindow::default()),
        }
    }

    /// Whether an upstream call may proceed right now.
    ///
    /// Granting a request in the half-open window marks the probe as
    /// outstanding; further callers are refused until `record_success` or
    /// `record_failure` settles it.
    pub fn allow_request(&self) -> bool {
        let mut window = self.lock();
        match state_of(&window, self.config.open_timeout) {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if window.probe_outstanding {
                    false
                } else {
                    window.probe_outstanding = true;
                    true
                }
            }
        }
    }

    /// A call came back healthy; the failure window resets entirely.
    pub fn record_success(&self) {
        let mut window = self.lock();
        *window = CircuitWindow::default();
    }

    /// A call failed. Trips the circuit when the threshold is met, and
    /// immediately when the failing call was a half-open probe.
    pub fn record_failure(&self) {
        let mut window = self.lock();
        window.consecutive_failures = window.consecutive_failures.saturating_add(1);
        let failed_probe = window.probe_outstanding;
        window.probe_outstanding = false;

        if failed_probe || window.consecutive_failures >= self.config.failure_threshold {
            window.tripped_at = Some(Instant::now());
        }
    }

    pub fn state(&self) -> CircuitState {
        let window = self.lock();
        state_of(&window, self.config.open_timeout)
    }

    fn lock(&self) -> MutexGuard<'_, CircuitWindow> {
        self.window
            .lock()
            .expect("circuit breaker lock is not poisoned")
    }
}

fn state_of(window: &CircuitWindow, open_timeout: Duration) -> CircuitState {
    match window.tripped_at {
        None => CircuitState::Closed,
        Some(tripped_at) if tripped_at.elapsed() < open_timeout => CircuitState::Open,
        Some(_) => CircuitState::HalfOpen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_breaker(failure_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            open_timeout: Duration::from_millis(1),
        })
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            open_timeout: Duration::from_secs(60),
        });

        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn a_success_below_the_threshold_resets_the_window() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            open_timeout: Duration::from_secs(60),
        });

        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_closes_on_success() {
        let breaker = fast_breaker(1);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow_request());

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());
    }

    #[test]
    fn half_open_probe_reopens_on_failure() {
        let breaker = fast_breaker(3);

        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(2));
        assert!(breaker.allow_request());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_open_lets_exactly_one_probe_through() {
        let breaker = fast_breaker(1);

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(2));

        assert!(breaker.allow_request());
        assert!(
            !breaker.allow_request(),
            "second caller fails fast while the probe is outstanding"
        );

        breaker.record_success();
        assert!(breaker.allow_request());
    }
}
