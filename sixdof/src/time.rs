//! Simulation time is kept in integer nanoseconds so that step and snapshot
//! scheduling never drifts.

pub const NANO_PER_SEC: u64 = 1_000_000_000;

/// Converts seconds to the nearest whole nanosecond. Negative values clamp to zero.
pub fn sec_to_nano(seconds: f64) -> u64 {
    if seconds.is_nan() || seconds <= 0.0 {
        return 0;
    }
    (seconds * NANO_PER_SEC as f64).round() as u64
}

pub fn nano_to_sec(nanos: u64) -> f64 {
    nanos as f64 / NANO_PER_SEC as f64
}
