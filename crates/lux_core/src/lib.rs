//! Lux Core - scene data, OBJ loading and render settings.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Material`, `Mesh`
//! - **OBJ support**: Wavefront OBJ/MTL loading via `tobj`
//! - **Settings**: the JSON render configuration
//!
//! # Example
//!
//! ```ignore
//! use lux_core::{load_obj, Settings};
//!
//! let settings = Settings::load("lux.json")?;
//! let scene = load_obj(&settings.scene.obj)?;
//! println!("Loaded {} triangles", scene.triangle_count());
//! ```

pub mod mesh;
pub mod obj;
pub mod scene;
pub mod settings;

// Re-export commonly used types
pub use mesh::Mesh;
pub use obj::{load_obj, SceneError};
pub use scene::{Material, Scene};
pub use settings::{ConfigError, Settings};
