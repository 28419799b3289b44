//! Grayscale float images and the sampling helpers used by feature
//! selection and Lucas-Kanade.

use image::RgbImage;
use ndarray::Array2;

/// Row-major grayscale image, indexed `[[y, x]]`.
pub type Gray = Array2<f32>;

/// Convert an RGB buffer to grayscale with the BT.601 luma weights.
pub fn to_gray(image: &RgbImage) -> Gray {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        let [r, g, b] = image.get_pixel(x as u32, y as u32).0;
        0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
    })
}

/// Pixel value with coordinates clamped to the image border.
#[inline(always)]
pub fn value_clamped(image: &Gray, x: isize, y: isize) -> f32 {
    let (h, w) = image.dim();
    let x = x.clamp(0, w as isize - 1) as usize;
    let y = y.clamp(0, h as isize - 1) as usize;
    image[[y, x]]
}

/// Bilinear interpolation with replicated borders.
pub fn bilinear(image: &Gray, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let ax = x - x0;
    let ay = y - y0;
    let (x0, y0) = (x0 as isize, y0 as isize);

    let v00 = value_clamped(image, x0, y0);
    let v10 = value_clamped(image, x0 + 1, y0);
    let v01 = value_clamped(image, x0, y0 + 1);
    let v11 = value_clamped(image, x0 + 1, y0 + 1);

    (1. - ay) * ((1. - ax) * v00 + ax * v10) + ay * ((1. - ax) * v01 + ax * v11)
}

/// Scharr derivatives, normalized to intensity change per pixel.
/// ref https://theailearner.com/tag/scharr-operator/
pub fn scharr(image: &Gray) -> (Gray, Gray) {
    let (h, w) = image.dim();
    let mut out_x = Array2::zeros((h, w));
    let mut out_y = Array2::zeros((h, w));
    let v = |x: isize, y: isize| value_clamped(image, x, y);

    for y in 0..h as isize {
        for x in 0..w as isize {
            out_x[[y as usize, x as usize]] = (10. * v(x + 1, y)
                + 3. * v(x + 1, y + 1)
                + 3. * v(x + 1, y - 1)
                - 10. * v(x - 1, y)
                - 3. * v(x - 1, y + 1)
                - 3. * v(x - 1, y - 1))
                / 32.;
            out_y[[y as usize, x as usize]] = (10. * v(x, y + 1)
                + 3. * v(x + 1, y + 1)
                + 3. * v(x - 1, y + 1)
                - 10. * v(x, y - 1)
                - 3. * v(x + 1, y - 1)
                - 3. * v(x - 1, y - 1))
                / 32.;
        }
    }
    (out_x, out_y)
}

/// 3x3 Sobel derivatives.
pub fn sobel(image: &Gray) -> (Gray, Gray) {
    let (h, w) = image.dim();
    let mut out_x = Array2::zeros((h, w));
    let mut out_y = Array2::zeros((h, w));
    let v = |x: isize, y: isize| value_clamped(image, x, y);

    for y in 0..h as isize {
        for x in 0..w as isize {
            out_x[[y as usize, x as usize]] = (2. * v(x + 1, y) + v(x + 1, y + 1) + v(x + 1, y - 1)
                - 2. * v(x - 1, y)
                - v(x - 1, y + 1)
                - v(x - 1, y - 1))
                / 8.;
            out_y[[y as usize, x as usize]] = (2. * v(x, y + 1) + v(x + 1, y + 1) + v(x - 1, y + 1)
                - 2. * v(x, y - 1)
                - v(x + 1, y - 1)
                - v(x - 1, y - 1))
                / 8.;
        }
    }
    (out_x, out_y)
}

/// Summed-area table with a zero first row and column, shape `(h + 1, w + 1)`.
pub fn integral(image: &Gray) -> Array2<f64> {
    let (h, w) = image.dim();
    let mut table = Array2::<f64>::zeros((h + 1, w + 1));
    for y in 0..h {
        let mut row_sum = 0.0;
        for x in 0..w {
            row_sum += image[[y, x]] as f64;
            table[[y + 1, x + 1]] = table[[y, x + 1]] + row_sum;
        }
    }
    table
}

/// Sum of the pixels in the half-open box `[x0, x1) x [y0, y1)`.
#[inline]
pub fn box_sum(table: &Array2<f64>, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    table[[y1, x1]] - table[[y0, x1]] - table[[y1, x0]] + table[[y0, x0]]
}
