//! Exponential backoff with optional jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before the retry that follows attempt `attempt_index` (0-based).
///
/// `min(initial * base^attempt_index, max)`, plus up to `jitter_ratio` of that
/// delay when jitter is enabled.
pub fn calculate_backoff(
    attempt_index: u32,
    initial: Duration,
    max: Duration,
    base: f64,
    jitter_ratio: f64,
) -> Duration {
    let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
    let raw_secs = initial.as_secs_f64() * base.max(1.0).powi(exponent);
    let capped_secs = if raw_secs.is_finite() {
        raw_secs.min(max.as_secs_f64())
    } else {
        max.as_secs_f64()
    };
    let delay = Duration::from_secs_f64(capped_secs.max(0.0));

    let ratio = jitter_ratio.clamp(0.0, 1.0);
    if ratio == 0.0 || delay.is_zero() {
        return delay;
    }

    let jitter_range = delay.as_secs_f64() * ratio;
    let jitter = rand::thread_rng().gen_range(0.0..jitter_range);
    delay + Duration::from_secs_f64(jitter)
}
