//! Shi-Tomasi corner selection restricted to a mask.

use ndarray::{Array2, Zip};

use crate::motion::gray::{Gray, box_sum, integral, sobel};
use crate::motion::params::FeatureParams;
use crate::tracker::Rect;

/// Selected corner at integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: usize,
    pub y: usize,
    /// Minimum eigenvalue of the structure tensor
    pub response: f32,
}

/// Binary mask covering exactly the union of `regions`, clipped to the image.
pub fn region_mask(width: u32, height: u32, regions: &[Rect]) -> Array2<bool> {
    let mut mask = Array2::from_elem((height as usize, width as usize), false);
    for region in regions {
        let span = region.clip(width, height);
        if span.is_empty() {
            continue;
        }
        mask.slice_mut(ndarray::s![span.y0..span.y1, span.x0..span.x1])
            .fill(true);
    }
    mask
}

/// Minimum-eigenvalue corner response of every pixel.
pub fn min_eigen_response(image: &Gray, block_size: usize) -> Gray {
    let (h, w) = image.dim();
    let (ix, iy) = sobel(image);
    let ixx = Zip::from(&ix).map_collect(|gx| gx * gx);
    let ixy = Zip::from(&ix).and(&iy).map_collect(|gx, gy| gx * gy);
    let iyy = Zip::from(&iy).map_collect(|gy| gy * gy);
    let (sxx, sxy, syy) = (integral(&ixx), integral(&ixy), integral(&iyy));

    let half = block_size / 2;
    Array2::from_shape_fn((h, w), |(y, x)| {
        let x0 = x.saturating_sub(half);
        let y0 = y.saturating_sub(half);
        let x1 = (x + block_size - half).min(w);
        let y1 = (y + block_size - half).min(h);

        let a = box_sum(&sxx, x0, y0, x1, y1);
        let b = box_sum(&sxy, x0, y0, x1, y1);
        let c = box_sum(&syy, x0, y0, x1, y1);
        let half_trace = (a + c) / 2.;
        let root = (((a - c) / 2.).powi(2) + b * b).sqrt();
        (half_trace - root).max(0.) as f32
    })
}

/// Select up to `params.max_features` strong, well-separated corners inside
/// `mask`, strongest first.
pub fn good_features(image: &Gray, mask: &Array2<bool>, params: &FeatureParams) -> Vec<Corner> {
    debug_assert_eq!(image.dim(), mask.dim());
    if params.max_features == 0 || !mask.iter().any(|m| *m) {
        return vec![];
    }

    let response = min_eigen_response(image, params.block_size);
    let best = Zip::from(&response)
        .and(mask)
        .fold(0.0f32, |acc, r, m| if *m { acc.max(*r) } else { acc });
    if best <= 0. {
        return vec![];
    }
    let threshold = best * params.quality;

    let (h, w) = response.dim();
    let mut candidates = vec![];
    for ((y, x), r) in response.indexed_iter() {
        if !mask[[y, x]] || *r < threshold {
            continue;
        }
        if is_local_max(&response, x, y, w, h) {
            candidates.push(Corner { x, y, response: *r });
        }
    }
    candidates.sort_by(|a, b| {
        b.response
            .total_cmp(&a.response)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });

    let min_dist2 = params.min_distance * params.min_distance;
    let mut corners: Vec<Corner> = Vec::with_capacity(params.max_features.min(candidates.len()));
    for candidate in candidates {
        let far_enough = corners.iter().all(|c| {
            let dx = c.x as f32 - candidate.x as f32;
            let dy = c.y as f32 - candidate.y as f32;
            dx * dx + dy * dy >= min_dist2
        });
        if far_enough {
            corners.push(candidate);
            if corners.len() == params.max_features {
                break;
            }
        }
    }
    corners
}

fn is_local_max(response: &Gray, x: usize, y: usize, w: usize, h: usize) -> bool {
    let value = response[[y, x]];
    for ny in y.saturating_sub(1)..(y + 2).min(h) {
        for nx in x.saturating_sub(1)..(x + 2).min(w) {
            if response[[ny, nx]] > value {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_squares() -> Gray {
        Array2::from_shape_fn((80, 120), |(y, x)| {
            let left = (20..40).contains(&x) && (20..40).contains(&y);
            let right = (80..100).contains(&x) && (30..50).contains(&y);
            if left || right { 200.0 } else { 20.0 }
        })
    }

    #[test]
    fn test_region_mask() {
        let mask = region_mask(10, 8, &[Rect::new(-2, 1, 4, 2), Rect::new(8, 6, 10, 10)]);
        assert_eq!(mask.iter().filter(|m| **m).count(), 2 * 2 + 2 * 2);
        assert!(mask[[1, 0]] && mask[[2, 1]]);
        assert!(!mask[[1, 2]]);
        assert!(mask[[7, 9]]);
    }

    #[test]
    fn test_flat_image_has_no_features() {
        let image = Array2::from_elem((40, 40), 100.0);
        let mask = region_mask(40, 40, &[Rect::new(0, 0, 40, 40)]);
        assert!(good_features(&image, &mask, &FeatureParams::default()).is_empty());
    }

    #[test]
    fn test_features_stay_inside_mask() {
        let image = two_squares();
        let region = Rect::new(10, 10, 40, 40);
        let mask = region_mask(120, 80, &[region]);

        let corners = good_features(&image, &mask, &FeatureParams::default());
        assert!(!corners.is_empty());
        for c in &corners {
            assert!(mask[[c.y, c.x]], "corner {c:?} outside mask");
            // Corners of the left square only
            assert!(c.x < 50);
        }
    }

    #[test]
    fn test_min_distance_and_cap() {
        let image = two_squares();
        let mask = region_mask(120, 80, &[Rect::new(0, 0, 120, 80)]);
        let params = FeatureParams {
            min_distance: 10.0,
            ..Default::default()
        };

        let corners = good_features(&image, &mask, &params);
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                let d2 = (a.x as f32 - b.x as f32).powi(2) + (a.y as f32 - b.y as f32).powi(2);
                assert!(d2 >= 100.0);
            }
        }
        assert!(corners.windows(2).all(|w| w[0].response >= w[1].response));

        let capped = good_features(
            &image,
            &mask,
            &FeatureParams {
                max_features: 3,
                ..params
            },
        );
        assert_eq!(capped.len(), 3);
    }
}
