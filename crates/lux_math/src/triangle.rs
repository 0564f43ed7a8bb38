//! Triangle primitive and the ray-triangle test.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::{BoundingBox, Ray, Vec3};

/// Lower bound on accepted hit distances, suppresses self-intersection at the ray origin.
pub const EPSILON: f32 = 1e-6;

/// Determinants below this magnitude mean the ray runs parallel to the triangle plane.
const PARALLEL_EPSILON: f32 = 1e-10;

/// A triangle with per-vertex normals.
///
/// Barycentric convention: `p(u, v) = (1 - u - v) * a + u * b + v * c`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    /// Vertices
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    /// Vertex normals
    pub na: Vec3,
    pub nb: Vec3,
    pub nc: Vec3,
    /// Index into the scene material table
    pub material: u32,
}

impl Triangle {
    /// Create a flat-shaded triangle; all three vertex normals are the face normal.
    pub fn new(a: Vec3, b: Vec3, c: Vec3, material: u32) -> Self {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self::with_normals(a, b, c, [normal; 3], material)
    }

    /// Create a triangle with explicit vertex normals (for smooth shading).
    pub fn with_normals(a: Vec3, b: Vec3, c: Vec3, normals: [Vec3; 3], material: u32) -> Self {
        Self {
            a,
            b,
            c,
            na: normals[0],
            nb: normals[1],
            nc: normals[2],
            material,
        }
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns `(t, u, v)` for a hit with `EPSILON < t <= closest_t`, `None`
    /// when the ray is parallel to the plane, misses the triangle, or the
    /// hit lies outside that range.
    pub fn intersect(&self, ray: &Ray, closest_t: f32) -> Option<(f32, f32, f32)> {
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;

        let pvec = ray.direction.cross(edge2);
        let det = edge1.dot(pvec);

        // Ray is parallel to triangle
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - self.a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = ray.direction.dot(qvec) * inv_det;
        if !(0.0..=1.0).contains(&v) || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(qvec) * inv_det;
        if t > EPSILON && t <= closest_t {
            Some((t, u, v))
        } else {
            None
        }
    }

    /// Point inside the triangle at barycentric coordinates (u, v).
    pub fn point(&self, u: f32, v: f32) -> Vec3 {
        let w = 1.0 - u - v;
        self.a * w + self.b * u + self.c * v
    }

    /// Interpolated (unnormalized) vertex normal at barycentric coordinates (u, v).
    pub fn normal(&self, u: f32, v: f32) -> Vec3 {
        let w = 1.0 - u - v;
        self.na * w + self.nb * u + self.nc * v
    }

    /// Unit geometric normal of the triangle plane.
    pub fn face_normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    /// Approximate centroid used to sort triangles during tree construction.
    ///
    /// This is `point(0.33, 0.33)`, slightly biased towards `a` compared to
    /// the exact vertex average.
    pub fn centroid(&self) -> Vec3 {
        self.point(0.33, 0.33)
    }

    pub fn area(&self) -> f32 {
        (self.b - self.a).cross(self.c - self.a).length() / 2.0
    }

    /// Bounding box of the three vertices.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.a.min(self.b).min(self.c),
            self.a.max(self.b).max(self.c),
        )
    }
}
