// Six-second increment billing: the billed unit is one tenth of a minute.

/// Number of billable six-second increments for a duration.
pub fn increments(duration_secs: i64) -> i64 {
    if duration_secs <= 0 {
        0
    } else {
        (duration_secs + 5) / 6
    }
}

/// Cost of one call: increments times a tenth of the per-minute rate.
pub fn call_cost(duration_secs: i64, rate_per_minute: f64) -> f64 {
    increments(duration_secs) as f64 * (rate_per_minute / 10.0)
}

/// Round half-up to 2 decimals. Dollar totals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round half-up to 4 decimals. Per-row cost differences.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_boundaries() {
        assert_eq!(increments(0), 0);
        assert_eq!(increments(-30), 0);
        assert_eq!(increments(1), 1);
        assert_eq!(increments(6), 1);
        assert_eq!(increments(7), 2);
        assert_eq!(increments(12), 2);
        assert_eq!(increments(13), 3);
        assert_eq!(increments(120), 20);
    }

    #[test]
    fn cost_quantizes_at_a_tenth_of_the_rate() {
        assert_eq!(call_cost(0, 0.015), 0.0);
        assert_eq!(round4(call_cost(1, 0.015)), 0.0015);
        assert_eq!(round4(call_cost(6, 0.015)), 0.0015);
        assert_eq!(round4(call_cost(7, 0.015)), 0.0030);
        assert_eq!(round4(call_cost(13, 0.015)), 0.0045);
        assert_eq!(round4(call_cost(60, 0.015)), 0.015);
    }

    #[test]
    fn cost_is_monotone() {
        let mut last = 0.0;
        for d in 0..600 {
            let c = call_cost(d, 0.015);
            assert!(c >= last, "cost decreased at d={d}");
            last = c;
        }
        let mut last = 0.0;
        for tenths in 0..100 {
            let r = tenths as f64 / 100.0;
            let c = call_cost(90, r);
            assert!(c >= last, "cost decreased at r={r}");
            last = c;
        }
    }

    #[test]
    fn zero_duration_is_free_at_any_rate() {
        assert_eq!(call_cost(0, 9.99), 0.0);
        assert_eq!(call_cost(-1, 9.99), 0.0);
    }

    #[test]
    fn rounding_to_reporting_precision() {
        assert_eq!(round2(1.006), 1.01);
        assert_eq!(round2(1.004), 1.0);
        assert_eq!(round2(-1.006), -1.01);
        assert_eq!(round4(0.00456), 0.0046);
        assert_eq!(round4(0.00750001), 0.0075);
    }
}
