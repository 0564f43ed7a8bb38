//! Lux Renderer - CPU direct-lighting ray tracer.
//!
//! Triangles are indexed by a binary BVH ([`BinaryTree`]) that can be cached
//! on disk. Each pixel shoots one primary ray; the direct light at the hit
//! point is estimated by one of the [`DirectMethod`] estimators and shaded
//! with a Blinn-Phong BRDF.

mod brdf;
mod bucket;
mod bvh;
mod cache;
mod camera;
mod direct;
mod hit;
mod renderer;
mod sampling;
mod world;

pub use brdf::{BlinnPhong, Brdf};
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{BinaryTree, Node};
pub use cache::{cache_path, CacheError};
pub use camera::Camera;
pub use direct::{DirectMethod, ShadingContext, UnknownMethod};
pub use hit::Hit;
pub use renderer::{color_to_rgba, render, render_pixel, tonemap, ImageBuffer, ImageError, RenderConfig};
pub use world::{Source, World};

/// Re-export common math types from lux_math
pub use lux_math::{Color, Ray, Triangle, Vec3};
