//! General time utility functions

use chrono::{DateTime, Utc};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if the duration
/// overflows a nanosecond count.
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// A source of the current time.
///
/// Modules which stamp or throttle their outputs read time through a `Clock`
/// rather than calling [`Utc::now`] directly, so that tests can drive time by
/// hand.
pub trait Clock: Send {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// A [`Clock`] which reads the host's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        let seconds = duration_to_seconds(chrono::Duration::milliseconds(1500)).unwrap();
        assert!((seconds - 1.5).abs() < 1e-9);

        let seconds = duration_to_seconds(chrono::Duration::seconds(-2)).unwrap();
        assert!((seconds + 2.0).abs() < 1e-9);
    }
}
