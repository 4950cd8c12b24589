//! # Circuit Breaker
//!
//! Purpose: fail fast against an unhealthy service instead of piling up
//! timeouts against it. One breaker per service name, created lazily and
//! kept forever in a process-wide [`BreakerRegistry`].
//!
//! ## Design Principles
//! 1. **Cheap When Healthy**: the common case (`Closed`, allow) is a single
//!    atomic load, no lock.
//! 2. **Conservative Transitions**: every state change happens under the
//!    breaker's mutex; only the `Closed` fast-path read is lock-free.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rpc_common::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl From<u8> for BreakerState {
    fn from(v: u8) -> Self {
        match v {
            0 => BreakerState::Closed,
            1 => BreakerState::Open,
            _ => BreakerState::HalfOpen,
        }
    }
}

impl From<BreakerState> for u8 {
    fn from(s: BreakerState) -> Self {
        match s {
            BreakerState::Closed => 0,
            BreakerState::Open => 1,
            BreakerState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub half_open_max_requests: u32,
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        BreakerConfig {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(5),
            half_open_max_requests: 5,
            success_threshold: 3,
        }
    }
}

struct Locked {
    last_failure_at: Instant,
    half_open_issued: u32,
    half_open_successes: u32,
}

/// A single service's circuit breaker.
pub struct Breaker {
    state: AtomicU8,
    failures: AtomicU32,
    config: BreakerConfig,
    locked: Mutex<Locked>,
}

impl Breaker {
    fn new(config: BreakerConfig) -> Self {
        Breaker {
            state: AtomicU8::new(BreakerState::Closed.into()),
            failures: AtomicU32::new(0),
            config,
            locked: Mutex::new(Locked {
                last_failure_at: Instant::now(),
                half_open_issued: 0,
                half_open_successes: 0,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        BreakerState::from(self.state.load(Ordering::Acquire))
    }

    /// Whether a call may proceed. May transition `Open` -> `HalfOpen`.
    pub fn allow_request(&self) -> bool {
        match self.state() {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let mut locked = self.locked.lock().expect("breaker mutex poisoned");
                if self.state() != BreakerState::Open {
                    // Raced with another caller's transition; re-evaluate below.
                    return self.allow_request_locked(&mut locked);
                }
                if locked.last_failure_at.elapsed() >= self.config.reset_timeout {
                    locked.half_open_issued = 0;
                    locked.half_open_successes = 0;
                    self.state.store(BreakerState::HalfOpen.into(), Ordering::Release);
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                let mut locked = self.locked.lock().expect("breaker mutex poisoned");
                self.allow_request_locked(&mut locked)
            }
        }
    }

    fn allow_request_locked(&self, locked: &mut Locked) -> bool {
        match self.state() {
            BreakerState::Closed => true,
            BreakerState::Open => locked.last_failure_at.elapsed() >= self.config.reset_timeout,
            BreakerState::HalfOpen => {
                if locked.half_open_issued < self.config.half_open_max_requests {
                    locked.half_open_issued += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        match self.state() {
            BreakerState::Closed => {
                self.failures.store(0, Ordering::Release);
            }
            BreakerState::HalfOpen => {
                let mut locked = self.locked.lock().expect("breaker mutex poisoned");
                if self.state() != BreakerState::HalfOpen {
                    return;
                }
                locked.half_open_successes += 1;
                if locked.half_open_successes >= self.config.success_threshold {
                    self.failures.store(0, Ordering::Release);
                    self.state.store(BreakerState::Closed.into(), Ordering::Release);
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        if !kind.feeds_breaker() {
            return;
        }
        match self.state() {
            BreakerState::Closed => {
                let failures = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    let mut locked = self.locked.lock().expect("breaker mutex poisoned");
                    locked.last_failure_at = Instant::now();
                    self.state.store(BreakerState::Open.into(), Ordering::Release);
                }
            }
            BreakerState::HalfOpen => {
                let mut locked = self.locked.lock().expect("breaker mutex poisoned");
                locked.last_failure_at = Instant::now();
                locked.half_open_issued = 0;
                locked.half_open_successes = 0;
                self.state.store(BreakerState::Open.into(), Ordering::Release);
            }
            BreakerState::Open => {
                let mut locked = self.locked.lock().expect("breaker mutex poisoned");
                locked.last_failure_at = Instant::now();
            }
        }
    }
}

/// Process-wide registry of one breaker per service name. Entries are
/// created on first reference and never removed.
#[derive(Clone)]
pub struct BreakerRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<Breaker>>>>,
    config: BreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        BreakerRegistry {
            inner: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn get(&self, service: &str) -> Arc<Breaker> {
        let mut map = self.inner.lock().expect("breaker registry poisoned");
        map.entry(service.to_string())
            .or_insert_with(|| Arc::new(Breaker::new(self.config)))
            .clone()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        BreakerRegistry::new(BreakerConfig::default())
    }
}
