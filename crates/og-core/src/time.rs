//! Wall-clock helpers
//!
//! Timestamps reported through readiness and stored on OTP entries are Unix
//! milliseconds. Deadlines and intervals use `tokio::time` instead.

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is set before the Unix epoch.
///
/// # Examples
/// ```
/// use og_core::time::current_time_millis;
///
/// let now = current_time_millis();
/// assert!(now > 0);
/// ```
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Calculate elapsed time in milliseconds since a given timestamp.
///
/// Returns 0 if the given time is in the future.
pub fn elapsed_millis(since: u64) -> u64 {
    current_time_millis().saturating_sub(since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_since_past_stamp() {
        let stamp = current_time_millis() - 1_500;
        let elapsed = elapsed_millis(stamp);
        assert!((1_500..60_000).contains(&elapsed));
    }

    #[test]
    fn test_elapsed_clamps_clock_skew() {
        assert_eq!(elapsed_millis(u64::MAX), 0);
    }
}
