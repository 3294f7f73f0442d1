//! Exponential backoff with optional jitter.

use rand::Rng;
use std::time::Duration;

/// Delay to wait before retry number `retry` (1-based).
///
/// `initial_ms × multiplier^(retry-1)`, capped at `max_ms`.
pub fn calculate_backoff(retry: u32, initial_ms: u64, multiplier: f64, max_ms: u64) -> Duration {
    if retry == 0 {
        return Duration::from_millis(0);
    }

    let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
    let delay_ms = initial_ms as f64 * multiplier.powi(exponent);
    let capped = if delay_ms.is_finite() {
        delay_ms.min(max_ms as f64)
    } else {
        max_ms as f64
    };

    Duration::from_millis(capped as u64)
}

/// Add 0 to 10% of the delay, still bounded by `max_ms`.
pub fn apply_jitter(delay: Duration, max_ms: u64) -> Duration {
    let delay_ms = delay.as_millis() as u64;
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis((delay_ms + jitter).min(max_ms.max(delay_ms)))
}
