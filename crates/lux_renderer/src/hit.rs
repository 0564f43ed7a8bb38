//! Result of a nearest-hit query.

use lux_math::{Ray, Triangle, Vec3};

/// Record of a ray-triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Barycentric coordinates in the hit triangle
    pub u: f32,
    pub v: f32,
    /// Point of intersection
    pub position: Vec3,
    /// Interpolated vertex normal, unit length
    pub normal: Vec3,
    /// Index of the hit triangle in the (post-build) triangle array
    pub triangle: usize,
}

impl Hit {
    /// Fill a hit record from an accepted `(t, u, v)` on `triangles[index]`.
    ///
    /// Falls back to the face normal when the interpolated normal vanishes.
    pub fn new(ray: &Ray, triangle: &Triangle, index: usize, t: f32, u: f32, v: f32) -> Self {
        let normal = triangle
            .normal(u, v)
            .try_normalize()
            .unwrap_or_else(|| triangle.face_normal());

        Self {
            t,
            u,
            v,
            position: ray.at(t),
            normal,
            triangle: index,
        }
    }
}
