//! Circuit breaker for service protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: service assumed down, requests fail fast
//! - Half-Open: a bounded number of trial requests test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: reset timer fires (one-shot, reset_timeout)
//! Half-Open → Closed: half_open_requests trial successes
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - One breaker per logical service (not per instance)
//! - Fail fast in Open state; the wrapped operation is never invoked
//! - The reset timer is a spawned task stored with the state; every trip aborts the
//!   previous one, and a generation counter ignores a timer that fired late
//! - The state lock is never held across the wrapped operation

use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

use crate::config::CircuitBreakerConfig;
use crate::error::GatewayError;
use crate::observability::metrics::{self, GatewayMetrics};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    fn gauge_value(self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u64,
    success_count: u64,
    last_failure_time: Option<SystemTime>,
    last_state_change: SystemTime,
    total_requests: u64,
    half_open_attempts: u32,
    trips: u64,
    generation: u64,
    reset_timer: Option<JoinHandle<()>>,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            last_state_change: SystemTime::now(),
            total_requests: 0,
            half_open_attempts: 0,
            trips: 0,
            generation: 0,
            reset_timer: None,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.reset_timer.take() {
            timer.abort();
        }
    }
}

#[derive(Debug)]
struct Inner {
    service: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    metrics: Option<Arc<GatewayMetrics>>,
}

/// Circuit breaker guarding calls to one service.
///
/// Cloning is cheap; clones share state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

/// Statistics for the circuit breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub service: String,
    pub state: CircuitState,
    pub failure_count: u64,
    pub success_count: u64,
    pub last_failure_time_ms: Option<u64>,
    pub last_state_change_ms: u64,
    pub total_requests: u64,
    pub trips: u64,
    /// failures / (failures + successes) × 100
    pub failure_rate: f64,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::build(service.into(), config, None)
    }

    /// Breaker that reports trips to the gateway metrics.
    pub fn with_metrics(
        service: impl Into<String>,
        config: CircuitBreakerConfig,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self::build(service.into(), config, Some(metrics))
    }

    fn build(service: String, config: CircuitBreakerConfig, metrics: Option<Arc<GatewayMetrics>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                config,
                state: Mutex::new(BreakerState::new()),
                metrics,
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Run `operation` through the breaker.
    ///
    /// Open (or an exhausted Half-Open budget) fails with `CircuitOpen` without
    /// invoking the operation. Otherwise the outcome is recorded and returned
    /// as is; errors are not wrapped.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        if !self.inner.admit() {
            tracing::debug!(service = %self.inner.service, "Circuit open, failing fast");
            return Err(GatewayError::CircuitOpen(self.inner.service.clone()));
        }

        let result = operation().await;
        match &result {
            Ok(_) => self.inner.on_success(),
            Err(_) => self.inner.on_failure(),
        }
        result
    }

    pub fn stats(&self) -> BreakerStats {
        let st = self.inner.lock();
        let observed = st.failure_count as f64 + st.success_count as f64;
        let failure_rate = if observed == 0.0 {
            0.0
        } else {
            st.failure_count as f64 / observed * 100.0
        };

        BreakerStats {
            service: self.inner.service.clone(),
            state: st.state,
            failure_count: st.failure_count,
            success_count: st.success_count,
            last_failure_time_ms: st.last_failure_time.map(unix_millis),
            last_state_change_ms: unix_millis(st.last_state_change),
            total_requests: st.total_requests,
            trips: st.trips,
            failure_rate,
        }
    }

    /// Force Closed, zero all counters and cancel the reset timer.
    pub fn reset(&self) {
        let mut st = self.inner.lock();
        st.cancel_timer();
        let generation = st.generation + 1;
        *st = BreakerState::new();
        st.generation = generation;
        metrics::record_breaker_state(&self.inner.service, CircuitState::Closed.gauge_value());
        tracing::info!(service = %self.inner.service, "Circuit breaker reset");
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> bool {
        let mut st = self.lock();
        st.total_requests += 1;
        let state = st.state;
        match state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if st.half_open_attempts < self.config.half_open_requests {
                    st.half_open_attempts += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn on_success(self: &Arc<Self>) {
        let mut st = self.lock();
        st.success_count = st.success_count.saturating_add(1);
        let state = st.state;
        match state {
            CircuitState::Closed => st.failure_count = 0,
            CircuitState::HalfOpen => {
                if st.success_count >= u64::from(self.config.half_open_requests) {
                    st.cancel_timer();
                    st.state = CircuitState::Closed;
                    st.failure_count = 0;
                    st.half_open_attempts = 0;
                    st.last_state_change = SystemTime::now();
                    metrics::record_breaker_state(&self.service, CircuitState::Closed.gauge_value());
                    tracing::info!(service = %self.service, "Circuit breaker closed");
                }
            }
            // A call admitted before the trip finished late.
            CircuitState::Open => {}
        }
    }

    fn on_failure(self: &Arc<Self>) {
        let mut st = self.lock();
        st.failure_count = st.failure_count.saturating_add(1);
        st.last_failure_time = Some(SystemTime::now());
        let state = st.state;
        match state {
            CircuitState::Closed => {
                if st.failure_count >= u64::from(self.config.failure_threshold) {
                    self.trip(&mut st);
                }
            }
            CircuitState::HalfOpen => self.trip(&mut st),
            CircuitState::Open => {}
        }
    }

    /// Move to Open and (re)schedule the Half-Open timer.
    fn trip(self: &Arc<Self>, st: &mut BreakerState) {
        st.cancel_timer();
        st.state = CircuitState::Open;
        st.last_state_change = SystemTime::now();
        st.trips += 1;
        st.generation += 1;

        let generation = st.generation;
        let delay = self.config.reset_timeout();
        let weak: Weak<Inner> = Arc::downgrade(self);
        st.reset_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.half_open(generation);
            }
        }));

        tracing::warn!(
            service = %self.service,
            failures = st.failure_count,
            reset_timeout_ms = self.config.reset_timeout_ms,
            "Circuit breaker opened"
        );
        metrics::record_breaker_state(&self.service, CircuitState::Open.gauge_value());
        if let Some(m) = &self.metrics {
            m.record_trip(&self.service);
        }
    }

    fn half_open(&self, generation: u64) {
        let mut st = self.lock();
        if st.generation != generation || st.state != CircuitState::Open {
            return;
        }
        st.state = CircuitState::HalfOpen;
        st.half_open_attempts = 0;
        st.success_count = 0;
        st.last_state_change = SystemTime::now();
        st.reset_timer = None;
        metrics::record_breaker_state(&self.service, CircuitState::HalfOpen.gauge_value());
        tracing::info!(service = %self.service, "Circuit breaker half-open, admitting trial requests");
    }
}

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
