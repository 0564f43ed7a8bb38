//! Wavefront OBJ/MTL scene loading.
//!
//! Every model in the file becomes a `Mesh`; faces are triangulated and
//! re-indexed to a single index stream by `tobj`. Emission comes from the
//! non-standard `Ke` MTL statement, which `tobj` keeps as an unknown parameter.

use std::io::BufReader;
use std::path::Path;

use lux_math::{Color, Vec3};
use thiserror::Error;

use crate::mesh::Mesh;
use crate::scene::{Material, Scene};

/// Errors that can occur during scene loading.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("No geometry found in {0}")]
    NoGeometry(String),
}

/// Result type for loading operations.
pub type SceneResult<T> = Result<T, SceneError>;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}

/// Load an OBJ file (and its MTL libraries) into a `Scene`.
///
/// A missing or broken MTL file is not fatal: the triangles fall back to
/// the default material.
pub fn load_obj<P: AsRef<Path>>(path: P) -> SceneResult<Scene> {
    let path = path.as_ref();
    let (models, materials) = tobj::load_obj(path, &load_options())?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let scene = build_scene(name, models, materials)?;

    let bounds = scene.bounds();
    log::info!(
        "Loaded {}: {} triangles, {} materials, {} emissive triangles, bounds {} .. {}",
        path.display(),
        scene.triangle_count(),
        scene.materials.len(),
        scene.emissive_count(),
        bounds.pmin,
        bounds.pmax
    );
    Ok(scene)
}

/// Load an OBJ scene from in-memory text, with an optional MTL library.
pub fn load_obj_from_str(name: &str, obj: &str, mtl: Option<&str>) -> SceneResult<Scene> {
    let mut reader = BufReader::new(obj.as_bytes());
    let (models, materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| match mtl {
        Some(text) => tobj::load_mtl_buf(&mut text.as_bytes()),
        None => Err(tobj::LoadError::OpenFileFailed),
    })?;

    build_scene(name.to_string(), models, materials)
}

fn build_scene(
    name: String,
    models: Vec<tobj::Model>,
    materials: Result<Vec<tobj::Material>, tobj::LoadError>,
) -> SceneResult<Scene> {
    let materials = materials.unwrap_or_else(|e| {
        log::warn!("Could not load materials for {}: {}", name, e);
        Vec::new()
    });

    let mut scene = Scene::new(name.clone());
    for material in &materials {
        scene.add_material(convert_material(material));
    }

    // Out-of-range index, resolved to the default material below
    let missing = scene.materials.len() as u32;

    for model in &models {
        let mut mesh = convert_mesh(&model.mesh)
            .with_material(model.mesh.material_id.map_or(missing, |id| id as u32));
        mesh.discard_mismatched_normals();
        scene.add_mesh(&mesh);
    }

    if scene.triangles.is_empty() {
        return Err(SceneError::NoGeometry(name));
    }

    scene.resolve_materials();
    Ok(scene)
}

fn convert_mesh(mesh: &tobj::Mesh) -> Mesh {
    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect();

    let normals = if mesh.normals.is_empty() {
        None
    } else {
        Some(
            mesh.normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2]).normalize_or_zero())
                .collect(),
        )
    };

    Mesh::new(positions, mesh.indices.clone(), normals)
}

fn convert_material(material: &tobj::Material) -> Material {
    let defaults = Material::default();
    Material {
        name: material.name.clone(),
        diffuse: material.diffuse.map_or(defaults.diffuse, Vec3::from_array),
        specular: material.specular.map_or(defaults.specular, Vec3::from_array),
        shininess: material.shininess.unwrap_or(defaults.shininess),
        emission: material
            .unknown_param
            .get("Ke")
            .and_then(|value| parse_color(value))
            .unwrap_or(Color::ZERO),
    }
}

/// Parse an `r g b` triple.
fn parse_color(value: &str) -> Option<Color> {
    let mut parts = value.split_whitespace().map(|s| s.parse::<f32>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    Some(Color::new(r, g, b))
}
