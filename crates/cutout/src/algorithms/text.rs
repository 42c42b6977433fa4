//! Ink extraction for text on a page-like background.
//!
//! Works on luminance alone: ink is assumed to be markedly darker than the
//! page. A first pass keeps dark pixels and the anti-aliased fringe next to
//! them; the cleanup passes then strip ruled lines and grid patterns that
//! are darker than the page but not dark enough to be ink.

use image::GrayImage;
use tracing::debug;

use crate::{
    config::TextConfig,
    types::{Classification, PixelLabel, RasterImage},
};

use super::{grayscale, neighbors, window_offsets};

#[derive(Debug, Clone, Default)]
pub struct TextClassifier {
    pub config: TextConfig,
}

impl TextClassifier {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    /// Luminance at or below which a pixel is ink.
    ///
    /// Half the median luminance, capped further on bright pages.
    pub fn text_threshold(&self, gray: &GrayImage) -> f32 {
        let mut values: Vec<u8> = gray.as_raw().clone();
        if values.is_empty() {
            return 0.0;
        }
        values.sort_unstable();
        let median = values[values.len() / 2] as f32;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;

        let mut threshold = median * self.config.median_factor;
        let (white_mean, white_cap) = self.config.white_page;
        let (light_mean, light_cap) = self.config.light_page;
        if mean as f32 > white_mean {
            threshold = threshold.min(white_cap);
        } else if mean as f32 > light_mean {
            threshold = threshold.min(light_cap);
        }
        threshold
    }

    pub fn classify(&self, image: &RasterImage) -> Classification {
        let gray = grayscale(image);
        let (width, height) = gray.dimensions();
        let threshold = self.text_threshold(&gray);
        let lum = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f32;

        let wide = window_offsets(2);
        let near = window_offsets(1);
        let has_neighbor_below = |x: u32, y: u32, offsets: &[(i64, i64)], limit: f32| {
            neighbors(x, y, width, height, offsets).any(|(nx, ny)| lum(nx, ny) < limit)
        };

        let mut ink: Vec<bool> = gray
            .enumerate_pixels()
            .map(|(x, y, p)| {
                let value = p[0] as f32;
                if value > self.config.page_brightness {
                    false
                } else if value > threshold {
                    value < self.config.edge_brightness
                        && has_neighbor_below(x, y, &wide, threshold)
                } else {
                    true
                }
            })
            .collect();
        let first_pass = ink.iter().filter(|&&k| k).count();

        for &(reexamine_above, keep_below) in &self.config.cleanup {
            for (index, (x, y, p)) in gray.enumerate_pixels().enumerate() {
                if ink[index] && p[0] as f32 > reexamine_above {
                    ink[index] = has_neighbor_below(x, y, &near, keep_below);
                }
            }
        }

        let labels = ink
            .into_iter()
            .map(|k| if k { PixelLabel::Foreground } else { PixelLabel::Background })
            .collect();
        let classification = Classification::new(width, height, labels);
        debug!(
            threshold,
            first_pass,
            foreground = classification.foreground_count(),
            "Text classification"
        );
        classification
    }
}
