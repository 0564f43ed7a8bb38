//! Sample placement on light sources.

use std::f32::consts::PI;

use lux_math::{Frame, Triangle, Vec3};
use rand::RngCore;

/// Golden ratio, the irrational step of the Fibonacci spiral.
const GOLDEN_RATIO: f32 = 1.618_034;

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Map a point of the unit square onto the triangle, uniformly by area.
///
/// `u' = sqrt(u1)`, barycentric `((1 - u2) u', u2 u')`.
#[inline]
pub fn stratified_point(triangle: &Triangle, u1: f32, u2: f32) -> Vec3 {
    let su = u1.sqrt();
    triangle.point((1.0 - u2) * su, u2 * su)
}

/// Uniform random point on a triangle.
pub fn uniform_point(triangle: &Triangle, rng: &mut dyn RngCore) -> Vec3 {
    let u1 = gen_f32(rng);
    let u2 = gen_f32(rng);
    stratified_point(triangle, u1, u2)
}

/// Direction `i` of an `n`-point Fibonacci spiral on the hemisphere around
/// `frame.n`, rotated by `offset` in [0, 1).
///
/// The heights are evenly spaced, `cos(theta) = 1 - (i + 0.5) / n`, and the
/// azimuth advances by the golden ratio.
pub fn spiral_direction(frame: &Frame, i: u32, n: u32, offset: f32) -> Vec3 {
    let cos_theta = 1.0 - (i as f32 + 0.5) / n as f32;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * ((i as f32 + offset) / GOLDEN_RATIO).fract();

    frame.to_world(Vec3::new(
        sin_theta * phi.cos(),
        sin_theta * phi.sin(),
        cos_theta,
    ))
}

/// Cells of the triangular grid used by the grid estimator, as
/// square-coordinates `(u1, u2)` of each cell's lower corner.
///
/// `k = floor(sqrt(n)) + 1` divisions per side; cell `(i, j)` is kept when
/// `i + j <= k`, for `i, j` in `0..=n`.
pub fn grid_cells(n: u32) -> Vec<(f32, f32)> {
    let k = (n as f32).sqrt().floor() as u32 + 1;
    let step = 1.0 / k as f32;

    let mut cells = Vec::new();
    for i in 0..=k.min(n) {
        for j in 0..=(k - i).min(n) {
            cells.push((i as f32 * step, j as f32 * step));
        }
    }
    cells
}

/// [`grid_cells`] computed once for a fixed sample count.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCells {
    n: u32,
    cells: Vec<(f32, f32)>,
}

impl GridCells {
    pub fn new(n: u32) -> Self {
        Self {
            n,
            cells: grid_cells(n),
        }
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn cells(&self) -> &[(f32, f32)] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unit_triangle() -> Triangle {
        Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 0)
    }

    fn inside(p: Vec3) -> bool {
        p.x >= -1e-6 && p.y >= -1e-6 && p.x + p.y <= 1.0 + 1e-6 && p.z.abs() < 1e-6
    }

    #[test]
    fn test_gen_f32_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let x = gen_f32(&mut rng);
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_stratified_point_corners() {
        let tri = unit_triangle();
        assert_eq!(stratified_point(&tri, 0.0, 0.0), Vec3::ZERO);
        assert!((stratified_point(&tri, 1.0, 0.0) - Vec3::X).length() < 1e-6);
        assert!((stratified_point(&tri, 1.0, 1.0) - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_uniform_point_is_uniform() {
        let tri = unit_triangle();
        let mut rng = StdRng::seed_from_u64(2);
        let n = 20_000;

        let mut mean = Vec3::ZERO;
        for _ in 0..n {
            let p = uniform_point(&tri, &mut rng);
            assert!(inside(p));
            mean += p;
        }
        mean /= n as f32;

        // Uniform by area: the mean is the vertex average
        assert!((mean - Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).length() < 0.01);
    }

    #[test]
    fn test_spiral_covers_hemisphere() {
        let frame = Frame::from_normal(Vec3::Y);
        let n = 64;

        let mut mean = Vec3::ZERO;
        for i in 0..n {
            let d = spiral_direction(&frame, i, n, 0.3);
            assert!((d.length() - 1.0).abs() < 1e-5);
            assert!(d.y > 0.0);
            mean += d;
        }
        mean /= n as f32;

        // Centered on the normal, at half height
        assert!(mean.x.abs() < 0.05 && mean.z.abs() < 0.05);
        assert!((mean.y - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_grid_cells() {
        // k = 3 for n = 4: i + j <= 3
        assert_eq!(grid_cells(4).len(), 10);
        // k = 2 for n = 1: (i, j) in {0, 1}^2 all pass
        assert_eq!(grid_cells(1).len(), 4);
        assert!(grid_cells(9).iter().all(|&(u1, u2)| u1 <= 1.0 && u2 <= 1.0));
    }

    #[test]
    fn test_grid_cells_large_n() {
        // k = 65: the triangle i + j <= 65 holds 66 * 67 / 2 cells
        let cells = grid_cells(4096);
        assert_eq!(cells.len(), 2211);
        let step = 1.0 / 65.0;
        assert!(cells
            .iter()
            .all(|&(u1, u2)| ((u1 + u2) / step).round() as u32 <= 65));

        let grid = GridCells::new(4096);
        assert_eq!(grid.n(), 4096);
        assert_eq!(grid.cells(), &cells[..]);
    }
}
