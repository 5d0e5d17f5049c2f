//! Robot pose as produced by the tracker.

use serde::{Deserialize, Serialize};

use super::math::normalize_angle;
use super::point::Point2D;

/// A 2D pose: position in meters and heading in radians.
///
/// Theta is kept in (-π, π], counter-clockwise from +X.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// X position in meters.
    pub x: f64,
    /// Y position in meters.
    pub y: f64,
    /// Heading angle in radians (-π, π].
    pub theta: f64,
}

impl Pose {
    /// Create a new pose. Theta is normalized.
    #[inline]
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Position component.
    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Euclidean distance between the positions of two poses.
    #[inline]
    pub fn distance(&self, other: &Pose) -> f64 {
        self.position().distance(&other.position())
    }
}

/// A pose stamped with the time it was estimated (seconds).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub time: f64,
    pub pose: Pose,
}

impl PoseSample {
    pub fn new(time: f64, pose: Pose) -> Self {
        Self { time, pose }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_new_normalizes_theta() {
        let p = Pose::new(1.0, 2.0, 3.0 * PI / 2.0);
        assert_relative_eq!(p.theta, -PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_distance() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, 1.0);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_eq!(b.position(), Point2D::new(3.0, 4.0));
    }
}
