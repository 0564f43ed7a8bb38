//! Scene representation handed to the renderer.
//!
//! A `Scene` owns the flat triangle array and the material table the
//! triangles index into. It is a plain container; the renderer takes it
//! over, reorders the triangles while building its acceleration structure
//! and derives the light sources from the result.

use lux_math::{BoundingBox, Color, Triangle, Vec3};

use crate::mesh::Mesh;

/// A Blinn-Phong material definition, as read from an MTL file.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name
    pub name: String,

    /// Diffuse color (`Kd`)
    pub diffuse: Color,

    /// Specular color (`Ks`)
    pub specular: Color,

    /// Specular exponent (`Ns`)
    pub shininess: f32,

    /// Emitted radiance (`Ke`), non-zero for light sources
    pub emission: Color,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: Color::new(0.5, 0.5, 0.5), // Grey default
            specular: Color::ZERO,
            shininess: 1.0,
            emission: Color::ZERO,
        }
    }
}

impl Material {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse: Color) -> Self {
        Self {
            name: name.into(),
            diffuse,
            ..Default::default()
        }
    }

    /// Create an emissive material.
    pub fn light(name: impl Into<String>, emission: Color) -> Self {
        Self {
            name: name.into(),
            diffuse: Color::ZERO,
            emission,
            ..Default::default()
        }
    }

    /// Check if this material emits light.
    pub fn is_emissive(&self) -> bool {
        self.emission.x + self.emission.y + self.emission.z > 0.0
    }
}

/// A complete scene: triangles plus the materials they reference.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Scene name (usually from filename)
    pub name: String,

    /// Flat triangle array, in load order
    pub triangles: Vec<Triangle>,

    /// Material table; `Triangle::material` indexes into it
    pub materials: Vec<Material>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a material to the scene and return its index.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    /// Append the triangles of a mesh.
    pub fn add_mesh(&mut self, mesh: &Mesh) {
        self.triangles.extend(mesh.triangles());
    }

    /// Append a single triangle.
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Get a material by index.
    pub fn material(&self, id: u32) -> Option<&Material> {
        self.materials.get(id as usize)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of triangles whose material emits light.
    pub fn emissive_count(&self) -> usize {
        self.triangles
            .iter()
            .filter(|t| self.material(t.material).is_some_and(Material::is_emissive))
            .count()
    }

    /// Bounding box of every vertex in the scene.
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::EMPTY;
        for t in &self.triangles {
            bounds.fold_point(t.a);
            bounds.fold_point(t.b);
            bounds.fold_point(t.c);
        }
        bounds
    }

    /// Make sure every triangle references an existing material.
    ///
    /// Triangles with a dangling index are pointed at a default grey
    /// material, appended on demand.
    pub fn resolve_materials(&mut self) {
        let count = self.materials.len() as u32;
        if self.triangles.iter().all(|t| t.material < count) {
            return;
        }

        let fallback = self.add_material(Material::new("default", Vec3::splat(0.5)));
        let mut patched = 0;
        for t in self.triangles.iter_mut().filter(|t| t.material >= count) {
            t.material = fallback;
            patched += 1;
        }
        log::debug!("{} triangles use the default material", patched);
    }
}
