use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box for the acceleration structure.
///
/// Defined by its minimum and maximum corners. [`BoundingBox::EMPTY`] is the
/// identity for folding points in; once at least one point has been folded,
/// `pmin[i] <= pmax[i]` on every axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub pmin: Vec3,
    pub pmax: Vec3,
}

impl BoundingBox {
    /// Create a box from its two corners, as given.
    pub fn new(pmin: Vec3, pmax: Vec3) -> Self {
        Self { pmin, pmax }
    }

    /// Create a box from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            pmin: a.min(b),
            pmax: a.max(b),
        }
    }

    /// Grow the box so it contains `p`.
    pub fn fold_point(&mut self, p: Vec3) {
        self.pmin = self.pmin.min(p);
        self.pmax = self.pmax.max(p);
    }

    /// True if no point has been folded in yet.
    pub fn is_empty(&self) -> bool {
        self.pmin.x > self.pmax.x || self.pmin.y > self.pmax.y || self.pmin.z > self.pmax.z
    }

    /// Per-axis extent (`pmax - pmin`).
    pub fn extent(&self) -> Vec3 {
        self.pmax - self.pmin
    }

    /// Returns true if `other` lies entirely inside this box (boundaries included).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.pmin.cmple(other.pmin).all() && other.pmax.cmple(self.pmax).all()
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties resolve deterministically: Y is the default candidate, X replaces
    /// it only if strictly longer, then Z replaces the winner only if
    /// strictly longer.
    pub fn longest_axis(&self) -> usize {
        let extent = self.extent();

        let mut axis = 1;
        if extent.x > extent.y {
            axis = 0;
        }
        if extent.z > extent[axis] {
            axis = 2;
        }
        axis
    }

    /// Test if a ray intersects this box within `[0, ray.tmax]`.
    ///
    /// Slab method: each axis narrows a running interval, and the test bails
    /// out as soon as that interval is empty. Zero direction components
    /// produce infinite slab bounds; a NaN from `0 * inf` is ignored by the
    /// clip.
    pub fn hit(&self, ray: &Ray) -> bool {
        let mut ray_t = Interval::new(0.0, ray.tmax);

        for axis in 0..3 {
            let inv_d = 1.0 / ray.direction[axis];
            let mut t0 = (self.pmin[axis] - ray.origin[axis]) * inv_d;
            let mut t1 = (self.pmax[axis] - ray.origin[axis]) * inv_d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            ray_t = ray_t.clip(t0, t1);
            if ray_t.is_empty() {
                return false;
            }
        }

        true
    }

    /// A box that contains nothing; folding a point into it yields that point.
    pub const EMPTY: BoundingBox = BoundingBox {
        pmin: Vec3::splat(f32::INFINITY),
        pmax: Vec3::splat(f32::NEG_INFINITY),
    };
}
