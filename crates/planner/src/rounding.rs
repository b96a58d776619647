//! Fixed-precision rounding used for every number the planner emits.

/// Round `value` to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// Hours are always reported with one decimal.
pub fn round_hours(value: f64) -> f64 {
    round_to(value, 1)
}

/// Largest whole tenth of an hour not above `value`.
pub fn floor_hours(value: f64) -> f64 {
    // 2.3 * 10.0 lands a hair under 23
    ((value * 10.0) + 1e-9).floor() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_requested_precision() {
        assert_eq!(round_to(8.928_571, 3), 8.929);
        assert_eq!(round_to(0.714_28, 4), 0.7143);
        assert_eq!(round_hours(2.142_857), 2.1);
        assert_eq!(round_hours(19.0), 19.0);
    }

    #[test]
    fn negative_values_round_symmetrically() {
        assert_eq!(round_hours(-19.04), -19.0);
        assert_eq!(round_hours(-0.06), -0.1);
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(round_hours(0.25), 0.2);
        assert_eq!(round_hours(0.75), 0.8);
        assert_eq!(round_hours(4.5), 4.5);
        assert_eq!(round_to(2.5, 0), 2.0);
    }

    #[test]
    fn floor_never_exceeds_value() {
        assert_eq!(floor_hours(2.25), 2.2);
        assert_eq!(floor_hours(2.3), 2.3);
        assert_eq!(floor_hours(0.09), 0.0);
        assert_eq!(floor_hours(8.0), 8.0);
    }
}
