//! Reconnect delay

use std::sync::Arc;
use std::time::Duration;

/// Maps the reconnect attempt number to the delay before that attempt
pub type ReconnectDelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// `x^1.5 / (1 + 0.1x)` seconds per shard, rounded to the millisecond.
///
/// Grows strictly with the attempt and is zero for attempt 0.
#[must_use]
pub fn default_delay(attempt: u32, total_shards: u32) -> Duration {
    let x = f64::from(attempt);
    let seconds = x.powf(1.5) / (1.0 + 0.1 * x);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = (seconds * 1000.0).round() as u64;
    Duration::from_millis(millis.saturating_mul(u64::from(total_shards.max(1))))
}

/// The default delay function for a client running `total_shards` shards
#[must_use]
pub fn default_reconnect_delay(total_shards: u32) -> ReconnectDelayFn {
    Arc::new(move |attempt| default_delay(attempt, total_shards))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(default_delay(0, 1), Duration::ZERO);
        assert_eq!(default_delay(1, 1), Duration::from_millis(909));
        assert_eq!(default_delay(4, 1), Duration::from_millis(5714));
        assert_eq!(default_delay(4, 2), Duration::from_millis(11428));
    }

    #[test]
    fn test_strictly_increasing() {
        let delays: Vec<_> = (0..200).map(|attempt| default_delay(attempt, 1)).collect();
        assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_shared_fn() {
        let delay = default_reconnect_delay(3);
        assert_eq!(delay(1), Duration::from_millis(2727));
    }
}
