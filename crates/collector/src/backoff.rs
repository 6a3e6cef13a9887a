use std::time::Duration;

/// `base * 2^attempt`, capped at `max`, with ±`jitter_frac` random spread.
pub fn exponential_jitter_backoff(
    base: Duration,
    attempt: u32,
    max: Duration,
    jitter_frac: f32,
) -> Duration {
    let capped_attempt = attempt.min(8);
    let factor = 1u32.checked_shl(capped_attempt).unwrap_or(1 << 8);
    let capped = base.saturating_mul(factor).min(max);
    let nanos = capped.as_nanos() as i128;
    let jitter = ((nanos as f64) * f64::from(jitter_frac)).round() as i128;
    let delta = if jitter > 0 {
        fastrand::i128(-jitter..=jitter)
    } else {
        0
    };
    Duration::from_nanos((nanos + delta).max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_increases_and_caps() {
        let base = Duration::from_millis(200);
        let max = Duration::from_secs(5);
        let a1 = exponential_jitter_backoff(base, 1, max, 0.0);
        let a4 = exponential_jitter_backoff(base, 4, max, 0.0);
        assert_eq!(a1, Duration::from_millis(400));
        assert!(a4 >= a1);
        assert_eq!(exponential_jitter_backoff(base, 20, max, 0.0), max);
    }

    #[test]
    fn jitter_stays_within_fraction() {
        let base = Duration::from_secs(1);
        for _ in 0..50 {
            let wait = exponential_jitter_backoff(base, 0, Duration::from_secs(10), 0.25);
            assert!(wait >= Duration::from_millis(750) && wait <= Duration::from_millis(1250));
        }
    }
}
