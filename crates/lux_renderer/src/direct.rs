//! Direct illumination estimators.
//!
//! Each estimator places samples on the light sources, tests them for
//! visibility from the shading point and averages their contribution
//! `emission * brdf * G`, with `G = |cos_i| |cos_s| / d^2`. They differ in
//! where samples go and in what the sum is divided by.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use lux_math::{Color, Frame, Ray, Vec3};
use rand::{Rng, RngCore};
use thiserror::Error;

use crate::brdf::Brdf;
use crate::sampling::{gen_f32, grid_cells, spiral_direction, stratified_point, uniform_point, GridCells};
use crate::world::Source;
use crate::{Hit, World};

/// Barycentric coordinates of the fixed reference point on each source.
const REFERENCE_POINT: (f32, f32) = (0.33, 0.33);

/// Raised for a method name that no estimator answers to.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown direct lighting method '{0}' (expected one of: {names})", names = DirectMethod::ALL.map(DirectMethod::name).join(", "))]
pub struct UnknownMethod(pub String);

/// Available direct lighting estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectMethod {
    /// One sample per source at a fixed barycentric point
    OnePointPerSource,
    /// N uniform samples per source
    NPointPerSource,
    /// N directions per source on a Fibonacci spiral over a hemisphere
    FibonacciSpiral,
    /// A regular grid over each source's barycentric domain
    TriangleGrid,
    /// N samples in total, each on a uniformly picked source
    RandomSource,
}

/// What every estimator needs besides the hit itself.
#[derive(Clone)]
pub struct ShadingContext<'a> {
    pub world: &'a World,
    pub brdf: &'a dyn Brdf,
    /// Offset along the hit normal applied to shadow ray origins
    pub bias: f32,
    grid: Option<GridCells>,
}

impl<'a> ShadingContext<'a> {
    pub fn new(world: &'a World, brdf: &'a dyn Brdf, bias: f32) -> Self {
        Self {
            world,
            brdf,
            bias,
            grid: None,
        }
    }

    /// Precompute the grid estimator's cells for `n` samples, reused by
    /// every call to [`DirectMethod::compute`] with that `n`.
    pub fn with_grid(mut self, n: u32) -> Self {
        self.grid = Some(GridCells::new(n));
        self
    }

    fn grid_cells(&self, n: u32) -> Cow<'_, [(f32, f32)]> {
        match &self.grid {
            Some(grid) if grid.n() == n => Cow::Borrowed(grid.cells()),
            _ => Cow::Owned(grid_cells(n)),
        }
    }
}

impl DirectMethod {
    pub const ALL: [DirectMethod; 5] = [
        DirectMethod::OnePointPerSource,
        DirectMethod::NPointPerSource,
        DirectMethod::FibonacciSpiral,
        DirectMethod::TriangleGrid,
        DirectMethod::RandomSource,
    ];

    /// Name used in settings files.
    pub fn name(self) -> &'static str {
        match self {
            DirectMethod::OnePointPerSource => "OnePointPerSource",
            DirectMethod::NPointPerSource => "NPointPerSource",
            DirectMethod::FibonacciSpiral => "NFibonacci",
            DirectMethod::TriangleGrid => "NGridTriangle",
            DirectMethod::RandomSource => "NRandomSource",
        }
    }

    /// Estimate the light reaching `hit` directly from the sources and
    /// reflected towards `observer`, using `n` samples.
    ///
    /// [`DirectMethod::OnePointPerSource`] ignores `n`; the other methods
    /// return black for `n == 0`.
    pub fn compute(
        self,
        ctx: &ShadingContext,
        observer: Vec3,
        hit: &Hit,
        n: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let sources = ctx.world.sources();
        if sources.is_empty() || (n == 0 && self != DirectMethod::OnePointPerSource) {
            return Color::ZERO;
        }

        let shadow = ShadowTest::new(ctx, observer, hit);
        let mut sum = Color::ZERO;
        let mut evaluations = 0usize;

        match self {
            DirectMethod::OnePointPerSource => {
                let (u, v) = REFERENCE_POINT;
                for source in sources {
                    sum += shadow.area_sample(source, source.triangle.point(u, v));
                }
                evaluations = sources.len();
            }
            DirectMethod::NPointPerSource => {
                for source in sources {
                    for _ in 0..n {
                        sum += shadow.area_sample(source, uniform_point(&source.triangle, rng));
                    }
                }
                evaluations = sources.len() * n as usize;
            }
            DirectMethod::FibonacciSpiral => {
                let offset = gen_f32(rng);
                let (u, v) = REFERENCE_POINT;
                for source in sources {
                    let center = source.triangle.point(u, v);
                    let normal = source.triangle.face_normal();
                    if normal == Vec3::ZERO {
                        continue;
                    }
                    let frame = Frame::from_normal(normal);
                    let radius = (source.triangle.area() / std::f32::consts::PI).sqrt();

                    for i in 0..n {
                        let direction = spiral_direction(&frame, i, n, offset);
                        let point = center + direction * radius;
                        sum += shadow.sample(source.emission, point, direction);
                    }
                }
                evaluations = sources.len() * n as usize;
            }
            DirectMethod::TriangleGrid => {
                let cells = ctx.grid_cells(n);
                for source in sources {
                    for &(u1, u2) in cells.iter() {
                        sum += shadow.area_sample(source, stratified_point(&source.triangle, u1, u2));
                    }
                    evaluations += cells.len();
                }
            }
            DirectMethod::RandomSource => {
                for _ in 0..n {
                    let source = &sources[rng.gen_range(0..sources.len())];
                    sum += shadow.area_sample(source, uniform_point(&source.triangle, rng));
                }
                evaluations = n as usize;
            }
        }

        if evaluations == 0 {
            return Color::ZERO;
        }
        sum / evaluations as f32
    }
}

/// Shadow-ray origin and shading inputs shared by all samples of one call.
struct ShadowTest<'a> {
    ctx: &'a ShadingContext<'a>,
    observer: Vec3,
    hit: &'a Hit,
    origin: Vec3,
}

impl<'a> ShadowTest<'a> {
    fn new(ctx: &'a ShadingContext<'a>, observer: Vec3, hit: &'a Hit) -> Self {
        Self {
            ctx,
            observer,
            hit,
            origin: hit.position + hit.normal * ctx.bias,
        }
    }

    /// Sample on the surface of `source`, whose normal is the face normal.
    fn area_sample(&self, source: &Source, point: Vec3) -> Color {
        self.sample(source.emission, point, source.triangle.face_normal())
    }

    /// Contribution of a sample at `point` with surface normal `normal`,
    /// zero when occluded.
    fn sample(&self, emission: Color, point: Vec3, normal: Vec3) -> Color {
        let to_sample = point - self.origin;
        let d2 = to_sample.length_squared();
        if d2 <= f32::EPSILON {
            return Color::ZERO;
        }
        let dir = to_sample / d2.sqrt();

        let g = self.hit.normal.dot(dir).abs() * normal.dot(dir).abs() / d2;
        let contribution = emission * self.ctx.brdf.eval(self.hit, self.observer, point) * g;
        if contribution == Color::ZERO {
            return Color::ZERO;
        }

        // Stop just short of the sample so its own triangle does not occlude it.
        let end = point - dir * self.ctx.bias;
        if self.ctx.world.intersect(&Ray::between(self.origin, end)).is_some() {
            return Color::ZERO;
        }
        contribution
    }
}

impl FromStr for DirectMethod {
    type Err = UnknownMethod;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        DirectMethod::ALL
            .into_iter()
            .find(|method| method.name() == name)
            .ok_or_else(|| UnknownMethod(name.to_string()))
    }
}

impl fmt::Display for DirectMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
