//! Circuit breaker shared by every forge call in the process

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed (normal operation)
    Closed,
    /// Circuit is open (failing fast)
    Open,
    /// Circuit is half-open (testing recovery)
    HalfOpen,
}

impl CircuitState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// Tuning for the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// How long to stay open before allowing a probe
    pub cooldown: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Point-in-time view of the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures recorded while closed
    pub consecutive_failures: u32,
    /// Time of the last recorded failure, relative to breaker creation
    pub last_failure: Option<Duration>,
}

/// Whether a call may go ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Breaker closed
    Allowed,
    /// The single half-open trial call; its outcome decides the next state
    Probe,
    /// Open, or half-open with a probe already in flight
    Rejected,
}

const NO_FAILURE: u64 = u64::MAX;

/// Circuit breaker for preventing cascade failures
///
/// All fields are atomics so concurrent enrichment workers can record
/// outcomes without a lock. Transitions use compare-and-swap, so exactly one
/// racing caller performs each transition:
/// closed → open after `failure_threshold` consecutive failures,
/// open → half-open once `cooldown` has elapsed since the last failure,
/// half-open → closed on success, half-open → open on failure.
///
/// While half-open only one probe call is admitted at a time; everyone else
/// is rejected until the probe's outcome is recorded.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    epoch: Instant,
    state: AtomicU8,
    failures: AtomicU32,
    last_failure_ms: AtomicU64,
    probe_in_flight: AtomicBool,
}

impl CircuitBreaker {
    /// Create a closed breaker
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            epoch: Instant::now(),
            state: AtomicU8::new(CircuitState::Closed.to_u8()),
            failures: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(NO_FAILURE),
            probe_in_flight: AtomicBool::new(false),
        }
    }

    /// Current state, without applying the cool-down transition
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Snapshot of state, counter and last failure time
    pub fn snapshot(&self) -> BreakerSnapshot {
        let last = self.last_failure_ms.load(Ordering::Acquire);
        BreakerSnapshot {
            state: self.state(),
            consecutive_failures: self.failures.load(Ordering::Acquire),
            last_failure: (last != NO_FAILURE).then(|| Duration::from_millis(last)),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX - 1)
    }

    fn transition(&self, from: CircuitState, to: CircuitState) -> bool {
        self.state
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Check if a call is allowed
    pub fn allow(&self) -> bool {
        self.admit() != Admission::Rejected
    }

    /// Decide whether a call may go ahead
    ///
    /// Moves an open breaker to half-open once the cool-down has elapsed.
    pub fn admit(&self) -> Admission {
        match self.state() {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::HalfOpen => self.claim_probe(),
            CircuitState::Open => {
                let last = self.last_failure_ms.load(Ordering::Acquire);
                let cooldown_ms =
                    u64::try_from(self.settings.cooldown.as_millis()).unwrap_or(u64::MAX);
                if last == NO_FAILURE || self.now_ms().saturating_sub(last) < cooldown_ms {
                    return Admission::Rejected;
                }
                if self.transition(CircuitState::Open, CircuitState::HalfOpen) {
                    debug!("circuit breaker entering half-open state");
                }
                // A racing caller may already have moved it on
                match self.state() {
                    CircuitState::Closed => Admission::Allowed,
                    CircuitState::HalfOpen => self.claim_probe(),
                    CircuitState::Open => Admission::Rejected,
                }
            }
        }
    }

    fn claim_probe(&self) -> Admission {
        if self
            .probe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Admission::Probe
        } else {
            Admission::Rejected
        }
    }

    /// Give back a probe whose call ended without an outcome, such as on cancellation
    pub fn release_probe(&self) {
        if self.state() == CircuitState::HalfOpen {
            self.probe_in_flight.store(false, Ordering::Release);
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        match self.state() {
            CircuitState::Closed => {
                self.failures.store(0, Ordering::Release);
            }
            CircuitState::HalfOpen => {
                if self.transition(CircuitState::HalfOpen, CircuitState::Closed) {
                    self.failures.store(0, Ordering::Release);
                    self.probe_in_flight.store(false, Ordering::Release);
                    debug!("circuit breaker closed after successful probe");
                }
            }
            // Late success from a call started before the breaker opened
            CircuitState::Open => {}
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::Closed => {
                self.last_failure_ms.store(self.now_ms(), Ordering::Release);
                let count = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
                if count >= self.settings.failure_threshold
                    && self.transition(CircuitState::Closed, CircuitState::Open)
                {
                    warn!(failures = count, "circuit breaker opened");
                }
            }
            CircuitState::HalfOpen => {
                self.last_failure_ms.store(self.now_ms(), Ordering::Release);
                if self.transition(CircuitState::HalfOpen, CircuitState::Open) {
                    self.probe_in_flight.store(false, Ordering::Release);
                    warn!("circuit breaker re-opened after failed probe");
                }
            }
            // Already open; keep the cool-down anchored to the opening failure
            CircuitState::Open => {}
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}
