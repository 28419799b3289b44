//! Sparse pyramidal Lucas-Kanade tracking.
//!
//! ref http://robots.stanford.edu/cs223b04/algo_tracking.pdf

use nalgebra::{Matrix2, Vector2};

use crate::motion::gray::bilinear;
use crate::motion::params::FlowParams;
use crate::motion::pyramid::Pyramid;

/// Tracking outcome for one feature point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackStatus {
    /// Position of the feature in the next image
    Tracked(Vector2<f32>),
    /// Gradient matrix too weak at full resolution
    LowTexture,
    /// Point ended outside the next image
    OutOfBounds,
}

impl TrackStatus {
    pub fn position(self) -> Option<Vector2<f32>> {
        match self {
            Self::Tracked(p) => Some(p),
            _ => None,
        }
    }
}

pub struct LucasKanade {
    params: FlowParams,
    // window samples of the previous level, reused across features
    patch: Vec<f32>,
    patch_gx: Vec<f32>,
    patch_gy: Vec<f32>,
}

impl LucasKanade {
    pub fn new(params: FlowParams) -> Self {
        let area = params.window_size * params.window_size;
        Self {
            params,
            patch: Vec::with_capacity(area),
            patch_gx: Vec::with_capacity(area),
            patch_gy: Vec::with_capacity(area),
        }
    }

    pub fn params(&self) -> &FlowParams {
        &self.params
    }

    /// Track every point from `prev` to `next`.
    pub fn track(
        &mut self,
        prev: &Pyramid,
        next: &Pyramid,
        points: &[Vector2<f32>],
    ) -> Vec<TrackStatus> {
        points
            .iter()
            .map(|p| self.track_point(prev, next, *p))
            .collect()
    }

    fn track_point(&mut self, prev: &Pyramid, next: &Pyramid, point: Vector2<f32>) -> TrackStatus {
        let half = (self.params.window_size / 2) as isize;
        let area = (self.params.window_size * self.params.window_size) as f32;
        let eps2 = self.params.convergence_eps * self.params.convergence_eps;
        let depth = prev.depth().min(next.depth());

        // displacement estimate expressed at the current level
        let mut guess = Vector2::<f32>::zeros();
        for level in (0..depth).rev() {
            let scale = (1usize << level) as f32;
            let u = point / scale;
            let i0 = &prev.levels[level];
            let gx = &prev.grad_x[level];
            let gy = &prev.grad_y[level];
            let i1 = &next.levels[level];

            self.patch.clear();
            self.patch_gx.clear();
            self.patch_gy.clear();
            let (mut a11, mut a12, mut a22) = (0f32, 0f32, 0f32);
            for wy in -half..=half {
                for wx in -half..=half {
                    let x = u.x + wx as f32;
                    let y = u.y + wy as f32;
                    let dx = bilinear(gx, x, y);
                    let dy = bilinear(gy, x, y);
                    self.patch.push(bilinear(i0, x, y));
                    self.patch_gx.push(dx);
                    self.patch_gy.push(dy);
                    a11 += dx * dx;
                    a12 += dx * dy;
                    a22 += dy * dy;
                }
            }

            let gradient = Matrix2::new(a11, a12, a12, a22);
            let min_eig = (a11 + a22 - ((a11 - a22).powi(2) + 4. * a12 * a12).sqrt()) / (2. * area);
            let inverse = match gradient.try_inverse() {
                Some(inv) if min_eig >= self.params.min_eigen_threshold => inv,
                _ => {
                    if level == 0 {
                        return TrackStatus::LowTexture;
                    }
                    guess *= 2.;
                    continue;
                }
            };

            let mut d = Vector2::<f32>::zeros();
            for _ in 0..self.params.convergence_iters {
                let mut b = Vector2::<f32>::zeros();
                let mut k = 0;
                for wy in -half..=half {
                    for wx in -half..=half {
                        let x = u.x + guess.x + d.x + wx as f32;
                        let y = u.y + guess.y + d.y + wy as f32;
                        let it = bilinear(i1, x, y) - self.patch[k];
                        b.x += it * self.patch_gx[k];
                        b.y += it * self.patch_gy[k];
                        k += 1;
                    }
                }
                let eta = -(inverse * b);
                d += eta;
                if eta.norm_squared() < eps2 {
                    break;
                }
            }

            guess = if level > 0 { 2. * (guess + d) } else { guess + d };
        }

        let tracked = point + guess;
        let (h, w) = next.levels[0].dim();
        if tracked.x < 0. || tracked.y < 0. || tracked.x > (w - 1) as f32 || tracked.y > (h - 1) as f32 {
            return TrackStatus::OutOfBounds;
        }
        TrackStatus::Tracked(tracked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::gray::Gray;
    use ndarray::Array2;

    /// Smooth blob pattern with plenty of 2D texture.
    fn textured(w: usize, h: usize, ox: f32, oy: f32) -> Gray {
        Array2::from_shape_fn((h, w), |(y, x)| {
            let dx = x as f32 - ox;
            let dy = y as f32 - oy;
            let blob = 180. * (-(dx * dx + dy * dy) / 60.).exp();
            let off = 120. * (-((dx - 6.).powi(2) + (dy + 4.).powi(2)) / 20.).exp();
            20. + blob + off
        })
    }

    #[test]
    fn test_known_shift() {
        let img0 = textured(128, 128, 60., 60.);
        let img1 = textured(128, 128, 63., 58.);
        let params = FlowParams::default();
        let prev = Pyramid::compute(&img0, params.pyramid_levels);
        let next = Pyramid::compute(&img1, params.pyramid_levels);

        let mut lk = LucasKanade::new(params);
        let status = lk.track(&prev, &next, &[Vector2::new(58., 62.)]);

        let p = status[0].position().expect("feature should be tracked");
        let shift = p - Vector2::new(58., 62.);
        assert!((shift.x - 3.).abs() < 0.5, "dx = {}", shift.x);
        assert!((shift.y + 2.).abs() < 0.5, "dy = {}", shift.y);
    }

    #[test]
    fn test_zero_motion() {
        let img = textured(96, 96, 48., 48.);
        let params = FlowParams::default();
        let prev = Pyramid::compute(&img, params.pyramid_levels);
        let next = Pyramid::compute(&img, params.pyramid_levels);

        let mut lk = LucasKanade::new(params);
        let p = lk.track(&prev, &next, &[Vector2::new(45., 50.)])[0]
            .position()
            .unwrap();
        assert!((p - Vector2::new(45., 50.)).norm() < 1e-3);
    }

    #[test]
    fn test_flat_region_fails() {
        let img = Array2::from_elem((64, 64), 90.0);
        let params = FlowParams::default();
        let prev = Pyramid::compute(&img, params.pyramid_levels);
        let next = Pyramid::compute(&img, params.pyramid_levels);

        let mut lk = LucasKanade::new(params);
        let status = lk.track(&prev, &next, &[Vector2::new(32., 32.)]);
        assert_eq!(status[0], TrackStatus::LowTexture);
    }
}
