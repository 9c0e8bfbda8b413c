//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float,
{
    if point_0.len() != point_1.len() {
        return None;
    }

    let sum = point_0
        .iter()
        .zip(point_1.iter())
        .fold(T::zero(), |acc, (&a, &b)| acc + (a - b).powi(2));

    Some(sum.sqrt())
}

/// Limit a value to the closed range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Get the signed shortest distance from angle `b` to angle `a`, both in
/// degrees.
///
/// The result is `a - b` wrapped into `[-180, 180]`, so positive results mean
/// `a` is clockwise of `b`. Inputs may be any finite angle. When the angles
/// are exactly opposite the sign follows the sign of `a - b`, which keeps the
/// function antisymmetric: `get_ang_dist_deg(a, b) == -get_ang_dist_deg(b, a)`.
pub fn get_ang_dist_deg<T>(a: T, b: T) -> T
where
    T: Float,
{
    let full = T::from(360.0).unwrap();
    let half = T::from(180.0).unwrap();

    // `%` on floats is exact and keeps the sign of the dividend, so negating
    // the inputs negates the remainder.
    let r = (a - b) % full;

    if r > half {
        r - full
    } else if r < -half {
        r + full
    } else {
        r
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`, callers wanting a half-open range must fold
/// that case back to zero.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}
