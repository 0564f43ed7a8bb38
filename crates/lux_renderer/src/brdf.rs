//! Surface reflectance models.

use std::f32::consts::PI;

use lux_core::Material;
use lux_math::{Color, Triangle, Vec3};

use crate::{Hit, World};

/// Reflectance at a hit point, for light arriving from `light_point` and
/// leaving towards `observer`. Both are world-space positions.
pub trait Brdf: Send + Sync {
    fn eval(&self, hit: &Hit, observer: Vec3, light_point: Vec3) -> Color;
}

/// Normalized Blinn-Phong, blended with Lambertian diffuse.
///
/// `interpolation` weights the diffuse lobe: 1 is purely diffuse, 0 purely
/// specular.
#[derive(Debug, Clone)]
pub struct BlinnPhong<'a> {
    materials: &'a [Material],
    triangles: &'a [Triangle],
    interpolation: f32,
}

impl<'a> BlinnPhong<'a> {
    /// `hit.triangle` indexes `triangles`, whose `material` indexes `materials`.
    pub fn new(materials: &'a [Material], triangles: &'a [Triangle], interpolation: f32) -> Self {
        Self {
            materials,
            triangles,
            interpolation: interpolation.clamp(0.0, 1.0),
        }
    }

    /// Blinn-Phong over every triangle of a world.
    pub fn for_world(world: &'a World, interpolation: f32) -> Self {
        Self::new(world.materials(), world.triangles(), interpolation)
    }

    fn material(&self, hit: &Hit) -> Option<&Material> {
        let triangle = self.triangles.get(hit.triangle)?;
        self.materials.get(triangle.material as usize)
    }
}

impl Brdf for BlinnPhong<'_> {
    fn eval(&self, hit: &Hit, observer: Vec3, light_point: Vec3) -> Color {
        let Some(material) = self.material(hit) else {
            return Color::ZERO;
        };

        let to_light = (light_point - hit.position).normalize_or_zero();
        let to_observer = (observer - hit.position).normalize_or_zero();
        let cos_theta = hit.normal.dot(to_light).max(0.0);
        if cos_theta == 0.0 {
            return Color::ZERO;
        }

        let half = (to_light + to_observer).normalize_or_zero();
        let ns = material.shininess;
        let lobe = (ns + 1.0) / (2.0 * PI) * hit.normal.dot(half).max(0.0).powf(ns);

        let k = self.interpolation;
        (1.0 - k) * material.specular * cos_theta * lobe + k * cos_theta * material.diffuse
    }
}
