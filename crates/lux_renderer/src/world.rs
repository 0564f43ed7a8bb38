//! The renderable world: reordered triangles, their tree and the light sources.

use std::path::Path;

use lux_core::{Material, Scene};
use lux_math::{Color, Ray, Triangle};

use crate::bvh::BinaryTree;
use crate::cache::cache_path;
use crate::Hit;

/// An emissive triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    pub triangle: Triangle,
    pub emission: Color,
    /// Index in the world's triangle array
    pub index: usize,
}

/// Triangles in tree order, their materials and the derived light sources.
///
/// Read-only once constructed, shared by every render thread.
#[derive(Debug)]
pub struct World {
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
    sources: Vec<Source>,
    tree: BinaryTree,
}

impl World {
    /// Assemble a world from triangles already in `tree` order.
    ///
    /// # Panics
    ///
    /// Panics if `tree` was built over a different number of triangles.
    pub fn new(triangles: Vec<Triangle>, materials: Vec<Material>, tree: BinaryTree) -> Self {
        assert_eq!(
            triangles.len(),
            tree.triangle_count(),
            "tree built over a different triangle array"
        );

        let sources: Vec<Source> = triangles
            .iter()
            .enumerate()
            .filter_map(|(index, triangle)| {
                let material = materials.get(triangle.material as usize)?;
                material.is_emissive().then_some(Source {
                    triangle: *triangle,
                    emission: material.emission,
                    index,
                })
            })
            .collect();

        log::info!(
            "World: {} triangles, {} light sources",
            triangles.len(),
            sources.len()
        );

        Self {
            triangles,
            materials,
            sources,
            tree,
        }
    }

    /// Build (or restore from `cache_dir`) the tree over a loaded scene.
    ///
    /// # Panics
    ///
    /// Panics if the scene has no triangles.
    pub fn from_scene(scene: Scene, cache_dir: Option<&Path>) -> Self {
        let Scene {
            mut triangles,
            materials,
            ..
        } = scene;

        let tree = match cache_dir {
            Some(dir) => {
                let path = cache_path(dir, &triangles);
                BinaryTree::load_or_build(path, &mut triangles)
            }
            None => BinaryTree::build(&mut triangles),
        };

        Self::new(triangles, materials, tree)
    }

    /// Nearest intersection along `ray` up to `ray.tmax`.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        self.tree.find_nearest_hit(&self.triangles, ray)
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn tree(&self) -> &BinaryTree {
        &self.tree
    }

    /// Material of the hit triangle.
    pub fn material(&self, hit: &Hit) -> Option<&Material> {
        let triangle = self.triangles.get(hit.triangle)?;
        self.materials.get(triangle.material as usize)
    }
}
