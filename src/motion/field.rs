use nalgebra::Vector2;
use ndarray::Array2;

use crate::tracker::Rect;

/// Sparse per-pixel displacement field between two frames.
///
/// Cells without a tracked feature are `None`, which is distinct from a
/// sampled zero displacement.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionField {
    cells: Array2<Option<Vector2<f32>>>,
}

impl MotionField {
    /// Field with no sampled cells.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            cells: Array2::from_elem((height as usize, width as usize), None),
        }
    }

    /// Field with the same displacement in every cell, mostly for tests and
    /// synthetic motion.
    pub fn uniform(width: u32, height: u32, displacement: Vector2<f32>) -> Self {
        Self {
            cells: Array2::from_elem((height as usize, width as usize), Some(displacement)),
        }
    }

    pub fn width(&self) -> u32 {
        self.cells.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.cells.nrows() as u32
    }

    /// Record a displacement at pixel `(x, y)`. Out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, displacement: Vector2<f32>) {
        if let Some(cell) = self.cells.get_mut([y, x]) {
            *cell = Some(displacement);
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Vector2<f32>> {
        self.cells.get([y, x]).copied().flatten()
    }

    pub fn sampled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// All sampled cells as `(x, y, displacement)`.
    pub fn samples(&self) -> impl Iterator<Item = (usize, usize, Vector2<f32>)> + '_ {
        self.cells
            .indexed_iter()
            .filter_map(|((y, x), c)| c.map(|d| (x, y, d)))
    }

    /// Mean displacement of the sampled cells inside `rect`, `None` when the
    /// box contains no sample.
    pub fn mean_displacement(&self, rect: &Rect) -> Option<Vector2<f32>> {
        let span = rect.clip(self.width(), self.height());
        if span.is_empty() {
            return None;
        }

        let window = self
            .cells
            .slice(ndarray::s![span.y0..span.y1, span.x0..span.x1]);
        let (sum, count) = window
            .iter()
            .flatten()
            .fold((Vector2::zeros(), 0usize), |(sum, n), d| (sum + d, n + 1));

        (count > 0).then(|| sum / count as f32)
    }
}
