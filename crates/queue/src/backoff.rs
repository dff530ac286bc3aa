use std::time::Duration;

/// backoff computes the retry delay for the `attempt`-th failure
/// (1-indexed): exponential growth off a small floor, with +/-20% jitter so
/// that a burst of jobs failing together doesn't retry in lockstep and
/// re-collide on whatever made them fail.
///
/// The floor and cap are implementation details, not part of the queue's
/// contract — only that distinct attempts are never coalesced onto the
/// same `run_after`.
pub fn backoff(attempt: u32) -> Duration {
    const FLOOR_SECS: f64 = 2.0;
    const CAP_SECS: f64 = 300.0;

    let exponent = attempt.saturating_sub(1).min(10);
    let base = (FLOOR_SECS * 2f64.powi(exponent as i32)).min(CAP_SECS);

    let jitter = 0.8 + rand::random::<f64>() * 0.4; // [0.8, 1.2)
    Duration::from_secs_f64(base * jitter)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_backoff_grows_with_attempt() {
        // Compare midpoints (jitter-free) since individual samples are
        // randomized; repeated trials keep this from being flaky.
        let early: f64 = (0..50).map(|_| backoff(1).as_secs_f64()).sum::<f64>() / 50.0;
        let later: f64 = (0..50).map(|_| backoff(5).as_secs_f64()).sum::<f64>() / 50.0;
        assert!(later > early);
    }

    #[test]
    fn test_backoff_is_capped() {
        for _ in 0..50 {
            assert!(backoff(30).as_secs_f64() <= 300.0 * 1.2);
        }
    }

    #[test]
    fn test_backoff_never_zero() {
        for _ in 0..50 {
            assert!(backoff(1).as_secs_f64() > 0.0);
        }
    }
}
