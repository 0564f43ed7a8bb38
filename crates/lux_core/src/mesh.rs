//! Indexed mesh geometry.
//!
//! A loader fills a `Mesh` from a file format, then `Mesh::triangles`
//! flattens it into the triangle array the renderer works on.

use lux_math::{Triangle, Vec3};

/// A mesh consisting of vertex positions, optional normals, and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional, face normals are used without them)
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Index into the scene material table
    pub material: u32,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        Self {
            positions,
            normals,
            indices,
            material: 0,
        }
    }

    /// Set the material index for every triangle of this mesh.
    pub fn with_material(mut self, material: u32) -> Self {
        self.material = material;
        self
    }

    /// Drop vertex normals that do not match the vertex count.
    ///
    /// The triangles then fall back to flat face normals.
    pub fn discard_mismatched_normals(&mut self) {
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), using face normals",
                    normals.len(),
                    self.positions.len()
                );
                self.normals = None;
            }
        }
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Flatten the mesh into standalone triangles.
    ///
    /// Faces referencing a vertex out of range are skipped with a warning.
    /// Without normals, each triangle falls back to its face normal.
    pub fn triangles(&self) -> Vec<Triangle> {
        let mut triangles = Vec::with_capacity(self.triangle_count());
        let count = self.positions.len();

        for face in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (face[0] as usize, face[1] as usize, face[2] as usize);
            if i0 >= count || i1 >= count || i2 >= count {
                log::warn!(
                    "Invalid triangle indices: [{}, {}, {}], vertex count: {}",
                    i0,
                    i1,
                    i2,
                    count
                );
                continue;
            }

            let (a, b, c) = (self.positions[i0], self.positions[i1], self.positions[i2]);
            let triangle = match &self.normals {
                Some(normals) if normals.len() == count => Triangle::with_normals(
                    a,
                    b,
                    c,
                    [normals[i0], normals[i1], normals[i2]],
                    self.material,
                ),
                _ => Triangle::new(a, b, c, self.material),
            };
            triangles.push(triangle);
        }

        triangles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        // Two CCW triangles: [0,1,2] and [1,3,2]
        Mesh::new(positions, vec![0, 1, 2, 1, 3, 2], None)
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = quad();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_flat_normals_without_vertex_normals() {
        let triangles = quad().triangles();

        // CCW triangles in the XY plane face +Z
        for t in &triangles {
            assert_eq!([t.na, t.nb, t.nc], [Vec3::Z; 3]);
        }
    }

    #[test]
    fn test_vertex_normals_kept() {
        let tilted = Vec3::new(0.0, 0.6, 0.8);
        let mut mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
            Some(vec![tilted; 3]),
        );
        mesh.discard_mismatched_normals();
        assert_eq!(mesh.triangles()[0].na, tilted);
    }

    #[test]
    fn test_mismatched_normals_discarded() {
        let mut mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
            Some(vec![Vec3::X]),
        );
        mesh.discard_mismatched_normals();
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.triangles()[0].na, Vec3::Z);
    }

    #[test]
    fn test_triangles() {
        let triangles = quad().with_material(7).triangles();

        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[1].a, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(triangles[1].b, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(triangles[1].c, Vec3::new(0.0, 1.0, 0.0));
        assert!(triangles.iter().all(|t| t.material == 7));
    }

    #[test]
    fn test_triangles_skip_bad_indices() {
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2, 0, 1, 9], None);
        let triangles = mesh.triangles();

        assert_eq!(triangles.len(), 1);
        // Face normal fallback
        assert_eq!(triangles[0].na, Vec3::Z);
    }
}
