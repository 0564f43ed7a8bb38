use crate::Vec3;

/// Orthonormal tangent frame built around a unit normal.
///
/// See "Building an Orthonormal Basis, Revisited" (Duff et al. 2017). The
/// frame is consistently oriented, so nearby normals get nearby tangents.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub t: Vec3,
    pub b: Vec3,
    pub n: Vec3,
}

impl Frame {
    /// Build a frame whose local +Z maps to `n` (expected to be unit length).
    pub fn from_normal(n: Vec3) -> Self {
        if n.z < -0.999_999_9 {
            return Self {
                t: Vec3::new(0.0, -1.0, 0.0),
                b: Vec3::new(-1.0, 0.0, 0.0),
                n,
            };
        }

        let a = 1.0 / (1.0 + n.z);
        let d = -n.x * n.y * a;
        Self {
            t: Vec3::new(1.0 - n.x * n.x * a, d, -n.x),
            b: Vec3::new(d, 1.0 - n.y * n.y * a, -n.y),
            n,
        }
    }

    /// Transform a local-space vector into world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        local.x * self.t + local.y * self.b + local.z * self.n
    }
}
