//! First-order elimination kinetics.
//!
//! Single-compartment exponential decay: `C(t) = C0 * e^(-k t)` with
//! `k = ln 2 / t½`. All functions are pure. Half-lives are assumed positive;
//! the catalog loader rejects definitions that are not.

use chrono::Duration;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const NANOS_PER_HOUR: f64 = 3_600_000_000_000.0;

/// Convert a duration to fractional hours
///
/// Nanosecond precision up to roughly 292 years, milliseconds beyond.
pub fn hours(d: Duration) -> f64 {
    match d.num_nanoseconds() {
        Some(nanos) => nanos as f64 / NANOS_PER_HOUR,
        None => d.num_milliseconds() as f64 / MILLIS_PER_HOUR,
    }
}

/// Convert fractional hours to a duration (millisecond resolution)
///
/// `None` when the value is not finite or does not fit in a `Duration`.
pub fn try_from_hours(h: f64) -> Option<Duration> {
    let millis = (h * MILLIS_PER_HOUR).round();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Convert fractional hours to a duration, saturating at the `Duration` bounds
pub fn from_hours(h: f64) -> Duration {
    try_from_hours(h).unwrap_or(if h < 0.0 { Duration::MIN } else { Duration::MAX })
}

/// Elimination-rate constant `k = ln 2 / half_life_hours`
pub fn elimination_rate(half_life_hours: f64) -> f64 {
    std::f64::consts::LN_2 / half_life_hours
}

/// Amount still active after `elapsed`
///
/// Doses timestamped now or in the future return `initial_mg` unchanged.
/// Very large `elapsed` values may underflow to zero.
pub fn remaining_amount(initial_mg: f64, half_life_hours: f64, elapsed: Duration) -> f64 {
    if elapsed <= Duration::zero() {
        return initial_mg;
    }

    let k = elimination_rate(half_life_hours);
    initial_mg * (-k * hours(elapsed)).exp()
}

/// Time until `current_mg` decays to `target_mg`
///
/// Returns zero when already at or below the target. `target_mg` must be
/// positive.
pub fn time_until_clearance(current_mg: f64, target_mg: f64, half_life_hours: f64) -> Duration {
    if current_mg <= target_mg {
        return Duration::zero();
    }

    // t = -ln(Ct / C0) / k
    let k = elimination_rate(half_life_hours);
    from_hours(-(target_mg / current_mg).ln() / k)
}
