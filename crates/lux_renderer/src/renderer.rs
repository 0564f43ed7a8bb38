//! Direct lighting render loop.
//!
//! One primary ray per pixel center. A pixel's value is the tone-mapped
//! direct light reflected at the hit point plus the hit surface's own
//! emission. Rays that escape the scene are black.

use std::path::Path;
use std::time::Instant;

use lux_core::Settings;
use lux_math::Color;
use rand::RngCore;
use rayon::prelude::*;
use thiserror::Error;

use crate::brdf::BlinnPhong;
use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::direct::{DirectMethod, ShadingContext, UnknownMethod};
use crate::{Camera, World};

/// Display gamma applied by [`tonemap`].
pub const GAMMA: f32 = 2.2;

/// Errors raised while writing an image.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Pixel buffer does not match {width}x{height}")]
    Size { width: u32, height: u32 },
}

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Direct lighting estimator, `None` to skip direct lighting
    pub direct: Option<DirectMethod>,
    /// Sample count handed to the estimator
    pub samples: u32,
    /// Offset along the normal applied to shadow ray origins
    pub normal_bias: f32,
    /// Add the emission of the hit surface
    pub emitted: bool,
    /// Diffuse weight of the Blinn-Phong BRDF
    pub phong_interpolation: f32,
    pub bucket_size: u32,
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            direct: Some(DirectMethod::OnePointPerSource),
            samples: 1,
            normal_bias: 1e-3,
            emitted: true,
            phong_interpolation: 1.0,
            bucket_size: DEFAULT_BUCKET_SIZE,
            seed: 0,
        }
    }
}

impl RenderConfig {
    /// Render configuration from settings, resolving the estimator by name.
    pub fn from_settings(settings: &Settings) -> Result<Self, UnknownMethod> {
        let rt = &settings.raytracing;
        let direct = if rt.direct.enable {
            Some(rt.direct.method.parse()?)
        } else {
            None
        };

        Ok(Self {
            direct,
            samples: rt.direct.n,
            normal_bias: rt.direct.normal_bias,
            emitted: rt.emitted.enable,
            phong_interpolation: rt.phong_interpolation,
            bucket_size: rt.bucket_size,
            seed: settings.seed(),
        })
    }
}

/// Map linear radiance to display values: `c^(1/2.2)`, negatives to 0.
#[inline]
pub fn tonemap(color: Color) -> Color {
    color.max(Color::ZERO).powf(1.0 / GAMMA)
}

/// Convert a display color to 8-bit RGBA, clamping to [0, 1].
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let c = color.clamp(Color::ZERO, Color::ONE) * 255.0;
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

/// Color of pixel (x, y).
pub fn render_pixel(
    camera: &Camera,
    ctx: &ShadingContext,
    x: u32,
    y: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let ray = camera.get_ray(x, y);
    let Some(hit) = ctx.world.intersect(&ray) else {
        return Color::ZERO;
    };

    let direct = match config.direct {
        Some(method) => method.compute(ctx, camera.position(), &hit, config.samples, rng),
        None => Color::ZERO,
    };

    let emitted = if config.emitted {
        ctx.world.material(&hit).map_or(Color::ZERO, |m| m.emission)
    } else {
        Color::ZERO
    };

    tonemap(direct) + emitted
}

/// Simple image buffer for storing render output.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn blit(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let x = bucket.x + i as u32 % bucket.width;
            let y = bucket.y + i as u32 / bucket.width;
            self.set(x, y, *color);
        }
    }

    /// Convert to RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }

    /// Write the image as PNG, creating the parent directory if needed.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let image = image::RgbaImage::from_raw(self.width, self.height, self.to_rgba()).ok_or(
            ImageError::Size {
                width: self.width,
                height: self.height,
            },
        )?;
        image.save_with_format(path, image::ImageFormat::Png)?;

        log::info!("Saved {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }
}

/// Render the world as seen by `camera`, buckets in parallel.
pub fn render(camera: &Camera, world: &World, config: &RenderConfig) -> ImageBuffer {
    let start = Instant::now();
    let brdf = BlinnPhong::for_world(world, config.phong_interpolation);
    let mut ctx = ShadingContext::new(world, &brdf, config.normal_bias);
    if config.direct == Some(DirectMethod::TriangleGrid) {
        ctx = ctx.with_grid(config.samples);
    }

    let buckets = generate_buckets(camera.image_width, camera.image_height, config.bucket_size);
    log::info!(
        "Rendering {}x{} in {} buckets ({}, N={})",
        camera.image_width,
        camera.image_height,
        buckets.len(),
        config.direct.map_or("no direct lighting", DirectMethod::name),
        config.samples
    );

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| render_bucket(bucket, camera, &ctx, config))
        .collect();

    let mut image = ImageBuffer::new(camera.image_width, camera.image_height);
    for result in &results {
        image.blit(result);
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    image
}
