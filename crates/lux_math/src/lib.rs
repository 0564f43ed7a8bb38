//! Geometry kernel for the Lux ray tracer.
//!
//! Pure, allocation-free primitives: rays, bounding boxes, triangles and
//! the two intersection tests everything else is built on.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frame;
mod interval;
mod ray;
mod triangle;

pub use aabb::BoundingBox;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::Ray;
pub use triangle::{Triangle, EPSILON};

/// Color type alias (linear RGB).
pub type Color = Vec3;
