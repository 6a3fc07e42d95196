//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Limit a value to lie between min and max.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::AddAssign,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        let mapped = lin_map((0.0, 10.0), (0.0, 5.0), 4.0);
        assert!((mapped - 2.0f64).abs() < 1e-9);

        // Inverted target ranges map backwards
        let mapped = lin_map((0.0, 1.0), (1.0, 0.0), 0.25);
        assert!((mapped - 0.75f64).abs() < 1e-9);
    }

    #[test]
    fn test_clamp() {
        assert!((clamp(&5.0, &0.0, &2.0) - 2.0f64).abs() < 1e-9);
        assert!((clamp(&-1.0, &0.0, &2.0) - 0.0f64).abs() < 1e-9);
        assert!((clamp(&1.5, &0.0, &2.0) - 1.5f64).abs() < 1e-9);
    }
}
