//! Continuous-space point and pose types.
//!
//! All linear coordinates are in millimetres, headings in radians
//! normalized to [-π, π).

use serde::{Deserialize, Serialize};

/// A 2D point in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in millimetres
    pub x: f32,
    /// Y coordinate in millimetres
    pub y: f32,
}

impl Point2D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// Vehicle pose: position in millimetres plus heading in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in millimetres
    pub x: f32,
    /// Y position in millimetres
    pub y: f32,
    /// Heading in radians, normalized to [-π, π)
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized.
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: crate::core::math::normalize_angle(theta),
        }
    }

    /// Origin pose with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    /// Position component of the pose.
    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Compose two poses: self ⊕ other.
    ///
    /// Applies `other` in the frame of `self`; used to anchor a
    /// primitive's body-frame swept path at a world-frame cell center.
    #[inline]
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            self.x + other.x * cos_t - other.y * sin_t,
            self.y + other.x * sin_t + other.y * cos_t,
            self.theta + other.theta,
        )
    }

    /// Transform a point from this pose's local frame to the world frame.
    #[inline]
    pub fn transform_point(&self, point: &Point2D) -> Point2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Point2D::new(
            self.x + point.x * cos_t - point.y * sin_t,
            self.y + point.x * sin_t + point.y * cos_t,
        )
    }

    /// Transform a point from the world frame into this pose's local frame.
    #[inline]
    pub fn inverse_transform_point(&self, point: &Point2D) -> Point2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let dx = point.x - self.x;
        let dy = point.y - self.y;
        Point2D::new(dx * cos_t + dy * sin_t, -dx * sin_t + dy * cos_t)
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(300.0, 400.0);
        assert_relative_eq!(a.distance(&b), 500.0);
        assert_relative_eq!(a.distance_squared(&b), 250_000.0);
    }

    #[test]
    fn compose_identity_is_noop() {
        let p = Pose2D::new(120.0, -40.0, 0.7);
        let r = p.compose(&Pose2D::identity());
        assert_relative_eq!(r.x, p.x);
        assert_relative_eq!(r.y, p.y);
        assert_relative_eq!(r.theta, p.theta);
    }

    #[test]
    fn compose_rotates_translation() {
        // Facing +y, a body-frame forward step lands at +y in the world.
        let facing_up = Pose2D::new(0.0, 0.0, FRAC_PI_2);
        let step = Pose2D::new(100.0, 0.0, 0.0);
        let r = facing_up.compose(&step);
        assert_relative_eq!(r.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(r.y, 100.0, epsilon = 1e-4);
        assert_relative_eq!(r.theta, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn transform_point_matches_compose_translation() {
        let frame = Pose2D::new(50.0, 20.0, FRAC_PI_2);
        let p = frame.transform_point(&Point2D::new(10.0, 0.0));
        assert_relative_eq!(p.x, 50.0, epsilon = 1e-4);
        assert_relative_eq!(p.y, 30.0, epsilon = 1e-4);
    }

    #[test]
    fn inverse_transform_round_trip() {
        let frame = Pose2D::new(-75.0, 210.0, 2.1);
        let world = Point2D::new(33.0, -8.0);
        let local = frame.inverse_transform_point(&world);
        let back = frame.transform_point(&local);
        assert_relative_eq!(back.x, world.x, epsilon = 1e-3);
        assert_relative_eq!(back.y, world.y, epsilon = 1e-3);
    }

    #[test]
    fn new_normalizes_theta() {
        let p = Pose2D::new(0.0, 0.0, 3.0 * std::f32::consts::PI);
        assert!(p.theta <= std::f32::consts::PI);
        assert!(p.theta >= -std::f32::consts::PI);
    }
}
