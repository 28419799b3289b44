use ndarray::Array2;

use crate::motion::gray::{Gray, scharr, value_clamped};

/// Gaussian image pyramid with the Scharr gradients of every level.
///
/// `levels[0]` is the full-resolution image.
#[derive(Debug)]
pub struct Pyramid {
    pub levels: Vec<Gray>,
    pub grad_x: Vec<Gray>,
    pub grad_y: Vec<Gray>,
}

impl Pyramid {
    /// Build up to `level_count` downscaled levels above `frame`.
    ///
    /// Building stops early once a level would be smaller than 2 pixels on
    /// either side, so tiny images get shallower pyramids.
    pub fn compute(frame: &Gray, level_count: usize) -> Self {
        let mut levels = vec![frame.clone()];
        for _ in 0..level_count {
            let Some(parent) = levels.last() else {
                break;
            };
            let (h, w) = parent.dim();
            if w < 4 || h < 4 {
                break;
            }
            let child = downscale(parent);
            levels.push(child);
        }

        let (grad_x, grad_y): (Vec<Gray>, Vec<Gray>) = levels.iter().map(scharr).unzip();
        Self {
            levels,
            grad_x,
            grad_y,
        }
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

/// Downscale by two with a 3x3 binomial kernel; odd sizes round up.
fn downscale(parent: &Gray) -> Gray {
    let (h, w) = parent.dim();
    let h_half = h.div_ceil(2);
    let w_half = w.div_ceil(2);
    let v = |x: isize, y: isize| value_clamped(parent, x, y);

    Array2::from_shape_fn((h_half, w_half), |(y, x)| {
        let x2 = 2 * x as isize;
        let y2 = 2 * y as isize;
        v(x2, y2) / 4.
            + (v(x2 + 1, y2) + v(x2 - 1, y2) + v(x2, y2 + 1) + v(x2, y2 - 1)) / 8.
            + (v(x2 + 1, y2 + 1) + v(x2 - 1, y2 - 1) + v(x2 - 1, y2 + 1) + v(x2 + 1, y2 - 1))
                / 16.
    })
}
