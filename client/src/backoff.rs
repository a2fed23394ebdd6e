use rand::{Rng, RngCore};
use std::time::Duration;

/// Pick a reconnect delay in `[backoff/2, backoff]`.
pub(crate) fn jittered_backoff(rng: &mut impl RngCore, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }

    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// Double `current`, capped at `max`.
pub(crate) fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_jitter_stays_in_upper_half() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = Duration::from_millis(1_000);
        for _ in 0..100 {
            let delay = jittered_backoff(&mut rng, base);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= base);
        }
        assert_eq!(
            jittered_backoff(&mut rng, Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_next_backoff_caps() {
        let max = Duration::from_millis(10_000);
        assert_eq!(
            next_backoff(Duration::from_millis(500), max),
            Duration::from_millis(1_000)
        );
        assert_eq!(next_backoff(Duration::from_millis(8_000), max), max);
    }
}
