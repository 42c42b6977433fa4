use image::{GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::{
    config::{EdgeConfig, EdgeOperator},
    traits::EdgeDetector,
    types::{EdgeMap, RasterImage},
};

use super::blurred_grayscale;

/// Sobel magnitude `(|gx| + |gy|) / 8` on a lightly blurred grayscale image
#[derive(Debug, Clone)]
pub struct SobelEdgeDetector {
    pub blur_sigma: f32,
    /// Strengths at or below the floor are dropped
    pub noise_floor: u8,
}

impl Default for SobelEdgeDetector {
    fn default() -> Self {
        Self {
            blur_sigma: 0.5,
            noise_floor: 0,
        }
    }
}

impl SobelEdgeDetector {
    /// Only unmistakable object boundaries survive the floor.
    pub fn strong() -> Self {
        Self {
            noise_floor: 70,
            ..Self::default()
        }
    }
}

impl EdgeDetector for SobelEdgeDetector {
    fn detect(&self, image: &RasterImage) -> EdgeMap {
        let gray = blurred_grayscale(image, self.blur_sigma);
        let gx = horizontal_sobel(&gray);
        let gy = vertical_sobel(&gray);

        interior_map(&gray, |x, y| {
            let magnitude = gx.get_pixel(x, y)[0].unsigned_abs() as u32
                + gy.get_pixel(x, y)[0].unsigned_abs() as u32;
            let strength = (magnitude / 8).min(255) as u8;
            if strength > self.noise_floor { strength } else { 0 }
        })
    }
}

/// Largest absolute difference to the four direct neighbours, doubled and
/// clamped to 255
#[derive(Debug, Clone)]
pub struct NeighborContrastEdgeDetector {
    pub blur_sigma: f32,
}

impl Default for NeighborContrastEdgeDetector {
    fn default() -> Self {
        Self { blur_sigma: 0.5 }
    }
}

impl EdgeDetector for NeighborContrastEdgeDetector {
    fn detect(&self, image: &RasterImage) -> EdgeMap {
        let gray = blurred_grayscale(image, self.blur_sigma);

        interior_map(&gray, |x, y| {
            let center = gray.get_pixel(x, y)[0] as i32;
            let max_diff = [(x, y - 1), (x, y + 1), (x - 1, y), (x + 1, y)]
                .into_iter()
                .map(|(nx, ny)| (center - gray.get_pixel(nx, ny)[0] as i32).abs())
                .max()
                .unwrap_or(0);
            (max_diff * 2).min(255) as u8
        })
    }
}

/// Build the detector an [`EdgeConfig`] describes.
pub fn edge_detector_from_config(config: &EdgeConfig) -> Box<dyn EdgeDetector> {
    match config.operator {
        EdgeOperator::Sobel => Box::new(SobelEdgeDetector {
            blur_sigma: config.blur_sigma,
            noise_floor: config.noise_floor,
        }),
        EdgeOperator::NeighborContrast => Box::new(NeighborContrastEdgeDetector {
            blur_sigma: config.blur_sigma,
        }),
    }
}

/// Evaluate `strength` on interior pixels; the outermost ring stays 0.
fn interior_map<F>(gray: &GrayImage, strength: F) -> EdgeMap
where
    F: Fn(u32, u32) -> u8,
{
    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if x == 0 || y == 0 || x + 1 >= width || y + 1 >= height {
            Luma([0])
        } else {
            Luma([strength(x, y)])
        }
    })
}
