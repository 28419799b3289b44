//! Crop preparation for the embedding network.

use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::error::{Result, TrackerError};
use crate::tracker::Rect;

/// Resizes crops to the network resolution and normalizes them.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    /// Square side the crop is resized to
    input_size: u32,
    /// Mean values for normalization (RGB)
    mean: [f32; 3],
    /// Standard deviation values for normalization (RGB)
    std: [f32; 3],
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(224)
    }
}

impl Preprocessor {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size,
            // ImageNet mean and std values
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }

    /// Set normalization parameters
    pub fn with_normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Bicubic resize, scale to [0, 1] and normalize per channel into a
    /// `[1, 3, size, size]` tensor.
    pub fn to_tensor(&self, crop: &RgbImage) -> Result<Array4<f32>> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(TrackerError::preprocessing("empty crop"));
        }
        let size = self.input_size;
        let resized = imageops::resize(crop, size, size, FilterType::CatmullRom);

        let size = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel.0[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - self.mean[c]) / self.std[c];
            }
        }
        Ok(tensor)
    }
}

/// Copy of the part of `image` covered by `rect`, `None` when the box lies
/// entirely outside the image.
pub fn crop_image(image: &RgbImage, rect: &Rect) -> Option<RgbImage> {
    let span = rect.clip(image.width(), image.height());
    if span.is_empty() {
        return None;
    }
    Some(
        imageops::crop_imm(
            image,
            span.x0 as u32,
            span.y0 as u32,
            span.width() as u32,
            span.height() as u32,
        )
        .to_image(),
    )
}
