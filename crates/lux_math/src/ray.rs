use crate::Vec3;

/// A ray in 3D space with origin, direction and a maximum parametric distance.
///
/// Points along the ray are `origin + t * direction`; intersections are only
/// valid for `t <= tmax`. The direction is not normalized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub tmax: f32,
}

impl Ray {
    /// Create an unbounded ray (`tmax = +inf`), used for primary rays.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            tmax: f32::INFINITY,
        }
    }

    /// Create a segment ray from `from` to `to` (`tmax = 1`).
    ///
    /// Used for shadow rays: any hit with `t <= 1` lies between the two points.
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self {
            origin: from,
            direction: to - from,
            tmax: 1.0,
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
