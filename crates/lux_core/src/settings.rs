//! Render settings, read from a JSON file.
//!
//! Three sections: `image` (output and resolution), `scene` (OBJ path,
//! camera, tree cache directory) and `raytracing` (which lighting terms to
//! compute and how).

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub image: ImageSettings,
    pub scene: SceneSettings,
    pub raytracing: RaytracingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Prefix of the output file name (may include a directory)
    pub output: String,
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees
    pub fov: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    pub obj: PathBuf,
    pub camera: CameraSettings,
    /// Where built trees are cached; no caching when absent
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub from: [f32; 3],
    pub at: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaytracingSettings {
    /// Fixed seed; seeded from the clock when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Diffuse/specular balance of the Blinn-Phong BRDF (1 = pure diffuse)
    #[serde(default = "default_interpolation")]
    pub phong_interpolation: f32,

    pub direct: DirectSettings,

    #[serde(default)]
    pub indirect: IndirectSettings,

    #[serde(default)]
    pub emitted: EmittedSettings,

    /// Side of the square tiles rendered in parallel
    #[serde(default = "default_bucket_size")]
    pub bucket_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectSettings {
    pub enable: bool,

    /// Sample count handed to the estimator
    #[serde(default = "default_samples")]
    pub n: u32,

    /// Estimator name, resolved by the renderer
    #[serde(default = "default_method")]
    pub method: String,

    /// Offset along the normal applied to shadow ray origins
    #[serde(default = "default_normal_bias")]
    pub normal_bias: f32,
}

/// Indirect lighting is not implemented; the block is accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndirectSettings {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub n: u32,
    #[serde(default)]
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedSettings {
    pub enable: bool,
}

impl Default for EmittedSettings {
    fn default() -> Self {
        Self { enable: true }
    }
}

fn invalid(field: &'static str, message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid {
        field,
        message: message.to_string(),
    })
}

fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_interpolation() -> f32 {
    1.0
}

fn default_bucket_size() -> u32 {
    64
}

fn default_samples() -> u32 {
    1
}

fn default_method() -> String {
    "OnePointPerSource".to_string()
}

fn default_normal_bias() -> f32 {
    1e-3
}

impl Settings {
    /// Read and validate a settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&text)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse and validate settings from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.width == 0 || self.image.height == 0 {
            return invalid("image.width/height", "must be positive");
        }
        if self.image.fov.is_nan() || self.image.fov <= 0.0 || self.image.fov >= 180.0 {
            return invalid("image.fov", "must be in (0, 180) degrees");
        }
        if !(0.0..=1.0).contains(&self.raytracing.phong_interpolation) {
            return invalid("raytracing.phong_interpolation", "must be in [0, 1]");
        }
        if self.raytracing.bucket_size == 0 {
            return invalid("raytracing.bucket_size", "must be positive");
        }

        let direct = &self.raytracing.direct;
        if direct.enable && direct.n == 0 {
            return invalid("raytracing.direct.n", "must be positive when direct lighting is enabled");
        }
        if direct.normal_bias.is_nan() || direct.normal_bias < 0.0 {
            return invalid("raytracing.direct.normal_bias", "must be non-negative");
        }

        Ok(())
    }

    /// The configured seed, or one derived from the current time.
    pub fn seed(&self) -> u64 {
        self.raytracing.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        })
    }

    /// Output file name encoding the scene and the enabled lighting terms.
    ///
    /// `<output><obj stem>_L0_L1-N=<n>-<method>.png`, where `L0` (emitted)
    /// and `L1` (direct) only appear when enabled.
    pub fn output_name(&self) -> String {
        let stem = self
            .scene
            .obj
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut parts = vec![stem];
        if self.raytracing.emitted.enable {
            parts.push("L0".to_string());
        }
        let direct = &self.raytracing.direct;
        if direct.enable {
            parts.push(format!("L1-N={}-{}", direct.n, direct.method));
        }

        format!("{}{}.png", self.image.output, parts.join("_"))
    }
}
