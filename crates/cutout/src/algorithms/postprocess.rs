use image::{Luma, Rgba};
use imageproc::{
    distance_transform::Norm,
    morphology::{dilate, erode},
};
use tracing::debug;

use crate::{
    config::PostProcessConfig,
    types::{Classification, Mask, PixelLabel, RasterImage, Rgb, color_distance, rgb_of},
};

use super::neighbors;

const NEIGHBORS_4: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Cleans a classification into a soft mask and composites the cut-out
#[derive(Debug, Clone, Default)]
pub struct MaskPostProcessor {
    pub config: PostProcessConfig,
}

impl MaskPostProcessor {
    pub fn new(config: PostProcessConfig) -> Self {
        Self { config }
    }

    /// Strip foreground pixels on the mask boundary whose colour matches the
    /// primary background. Returns how many were removed.
    pub fn defringe(
        &self,
        classification: &mut Classification,
        image: &RasterImage,
        primary: Rgb,
    ) -> usize {
        let (width, height) = (classification.width, classification.height);
        let mut removed = 0;

        for _ in 0..self.config.defringe_passes {
            let fringe: Vec<usize> = image
                .enumerate_pixels()
                .filter(|&(x, y, pixel)| {
                    classification.label(x, y).is_foreground()
                        && color_distance(rgb_of(pixel), primary) < self.config.defringe_distance
                        && neighbors(x, y, width, height, &NEIGHBORS_4)
                            .any(|(nx, ny)| !classification.label(nx, ny).is_foreground())
                })
                .map(|(x, y, _)| (y * width + x) as usize)
                .collect();

            if fringe.is_empty() {
                break;
            }
            removed += fringe.len();
            for index in fringe {
                classification.labels[index] = PixelLabel::Background;
            }
        }
        removed
    }

    /// Max filter then min filter of `filter_size`, a light blur, then alpha
    /// within `alpha_floor` of either extreme snaps to it.
    pub fn smooth(&self, mask: &Mask, filter_size: u8) -> Mask {
        let mut mask = mask.clone();
        if filter_size > 1 {
            let radius = filter_size / 2;
            mask = erode(&dilate(&mask, Norm::LInf, radius), Norm::LInf, radius);
        }
        if self.config.blur_sigma > 0.0 {
            mask = imageproc::filter::gaussian_blur_f32(&mask, self.config.blur_sigma);
        }
        let ceiling = u8::MAX - self.config.alpha_floor;
        for pixel in mask.pixels_mut() {
            if pixel[0] < self.config.alpha_floor {
                *pixel = Luma([0]);
            } else if pixel[0] > ceiling {
                *pixel = Luma([u8::MAX]);
            }
        }
        mask
    }

    /// Source RGB with the mask as alpha. Fully transparent pixels take the
    /// fill colour of their label.
    pub fn composite(
        &self,
        image: &RasterImage,
        classification: &Classification,
        mask: &Mask,
    ) -> RasterImage {
        RasterImage::from_fn(image.width(), image.height(), |x, y| {
            let alpha = mask.get_pixel(x, y)[0];
            let [r, g, b] = if alpha == 0 {
                classification.label(x, y).transparent_fill()
            } else {
                rgb_of(image.get_pixel(x, y))
            };
            Rgba([r, g, b, alpha])
        })
    }

    /// Defringe (when a primary colour is given), smooth and composite.
    pub fn process(
        &self,
        image: &RasterImage,
        mut classification: Classification,
        primary: Option<Rgb>,
        filter_size: u8,
    ) -> RasterImage {
        let defringed = primary
            .map(|color| self.defringe(&mut classification, image, color))
            .unwrap_or(0);
        let mask = self.smooth(&classification.to_mask(), filter_size);
        debug!(defringed, filter_size, "Mask post-processed");
        self.composite(image, &classification, &mask)
    }
}
