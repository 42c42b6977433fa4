use tracing::debug;

use crate::{
    config::GenericConfig,
    traits::BackgroundClassifier,
    types::{BackgroundPalette, Classification, EdgeMap, PixelLabel, RasterImage, Rgb, rgb_of},
};

use super::{NEIGHBORS_8, neighbors};

/// Colour-distance classifier with a radially adaptive threshold and edge
/// protection.
///
/// Background is assumed to dominate the border of the crop and to be more
/// ambiguous towards the centre, where detail concentrates; the threshold
/// therefore loosens from the border band to the centre. Any pixel on a
/// detected edge is kept regardless of its colour.
#[derive(Debug, Clone, Default)]
pub struct GenericClassifier {
    pub config: GenericConfig,
}

impl GenericClassifier {
    pub fn new(config: GenericConfig) -> Self {
        Self { config }
    }

    /// Palette distance under which a pixel at `normalized_dist` from the
    /// border (0 at the border, 1 at the centre) is background.
    pub fn threshold(&self, normalized_dist: f32, aggressive: bool) -> f32 {
        let c = &self.config;
        if normalized_dist < c.border_band {
            if aggressive { c.border_threshold_aggressive } else { c.border_threshold }
        } else if normalized_dist < c.middle_band {
            let base = if aggressive { c.middle_threshold_aggressive } else { c.middle_threshold };
            base + (normalized_dist - c.border_band) * c.middle_slope
        } else if aggressive {
            c.center_threshold_aggressive
        } else {
            c.center_threshold
        }
    }

    fn is_protected(&self, edge: u8) -> bool {
        edge > self.config.strong_edge || edge > self.config.soft_edge
    }

    /// Last-resort rules for flat, obviously-background colours.
    fn catch_all(&self, rgb: Rgb, edge: u8, palette: &BackgroundPalette) -> Option<PixelLabel> {
        if edge >= self.config.soft_edge {
            return None;
        }
        let [r, g, b] = rgb.map(|c| c as i32);
        let spread = |a: i32, b: i32| (a - b).abs();

        if r > 240 && g > 240 && b > 240 && spread(r, g) < 15 && spread(g, b) < 15 {
            return Some(PixelLabel::Background);
        }
        // Black only reads as background on a dark surface; on a light one it is ink
        if r < 30 && g < 30 && b < 30 && palette.is_dark() {
            return Some(PixelLabel::DarkBackground);
        }
        let mean = (r + g + b) as f32 / 3.0;
        if spread(r, g) < 25 && spread(g, b) < 25 && mean > 140.0 && mean < 210.0 {
            return Some(PixelLabel::Background);
        }
        None
    }
}

impl BackgroundClassifier for GenericClassifier {
    fn classify(
        &self,
        image: &RasterImage,
        edges: &EdgeMap,
        palette: &BackgroundPalette,
        aggressive: bool,
    ) -> Classification {
        let (width, height) = image.dimensions();
        let half_extent = width.min(height) as f32 / 2.0;

        let palette_distance: Vec<f32> = image
            .pixels()
            .map(|p| palette.min_distance(rgb_of(p)))
            .collect();
        let distance_at = |x: u32, y: u32| palette_distance[(y * width + x) as usize];

        let mut labels = Vec::with_capacity(palette_distance.len());
        let mut rescued = 0usize;

        for (x, y, pixel) in image.enumerate_pixels() {
            let rgb = rgb_of(pixel);
            let edge = edges.get_pixel(x, y)[0];

            let to_border = x.min(width - x).min(y.min(height - y)) as f32;
            let normalized = if half_extent > 0.0 { to_border / half_extent } else { 0.0 };
            let threshold = self.threshold(normalized, aggressive);

            let mut background = !self.is_protected(edge)
                && (distance_at(x, y) < threshold
                    || palette.distance_to_primary(rgb) < self.config.primary_distance);

            if background {
                let mut total = 0usize;
                let mut content = 0usize;
                for (nx, ny) in neighbors(x, y, width, height, &NEIGHBORS_8) {
                    total += 1;
                    if distance_at(nx, ny) > self.config.neighbor_distance {
                        content += 1;
                    }
                }
                if total > 0 && content as f32 >= total as f32 * self.config.neighbor_ratio {
                    background = false;
                    rescued += 1;
                }
            }

            let label = if background {
                PixelLabel::Background
            } else {
                self.catch_all(rgb, edge, palette).unwrap_or(PixelLabel::Foreground)
            };
            labels.push(label);
        }

        let classification = Classification::new(width, height, labels);
        debug!(
            width,
            height,
            aggressive,
            foreground = classification.foreground_count(),
            rescued,
            "Generic classification"
        );
        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba};

    fn palette(color: Rgb) -> BackgroundPalette {
        BackgroundPalette { colors: vec![color], primary: color }
    }

    #[test]
    fn test_threshold_bands() {
        let classifier = GenericClassifier::default();
        assert_eq!(classifier.threshold(0.1, false), 35.0);
        assert_eq!(classifier.threshold(0.1, true), 40.0);
        assert!((classifier.threshold(0.5 - f32::EPSILON, false) - 43.0).abs() < 0.01);
        assert!((classifier.threshold(0.2, true) - 35.0).abs() < 0.01);
        assert_eq!(classifier.threshold(0.8, false), 45.0);
        assert_eq!(classifier.threshold(0.8, true), 40.0);
    }

    #[test]
    fn test_uniform_background_is_removed() {
        let image = RasterImage::from_pixel(30, 30, Rgba([90, 120, 160, 255]));
        let edges = GrayImage::new(30, 30);
        let result = GenericClassifier::default().classify(&image, &edges, &palette([90, 120, 160]), false);
        assert_eq!(result.foreground_count(), 0);
    }

    #[test]
    fn test_edge_pixels_are_never_background() {
        let image = RasterImage::from_pixel(30, 30, Rgba([90, 120, 160, 255]));
        let mut edges = GrayImage::new(30, 30);
        edges.put_pixel(5, 5, Luma([16]));
        edges.put_pixel(15, 15, Luma([200]));
        edges.put_pixel(20, 20, Luma([15]));

        let result = GenericClassifier::default().classify(&image, &edges, &palette([90, 120, 160]), true);
        assert_eq!(result.label(5, 5), PixelLabel::Foreground);
        assert_eq!(result.label(15, 15), PixelLabel::Foreground);
        assert_eq!(result.label(20, 20), PixelLabel::Background);
    }

    #[test]
    fn test_thin_stroke_survives_through_neighbours() {
        let mut image = RasterImage::from_pixel(30, 30, Rgba([90, 120, 160, 255]));
        for y in 9..12 {
            for x in 9..12 {
                image.put_pixel(x, y, Rgba([220, 30, 30, 255]));
            }
        }
        // Close to the background colour but enclosed by the design
        image.put_pixel(10, 10, Rgba([95, 125, 165, 255]));
        let edges = GrayImage::new(30, 30);

        let result = GenericClassifier::default().classify(&image, &edges, &palette([90, 120, 160]), false);
        assert_eq!(result.label(10, 10), PixelLabel::Foreground);
        assert_eq!(result.label(9, 9), PixelLabel::Foreground);
        assert_eq!(result.label(25, 25), PixelLabel::Background);
    }

    #[test]
    fn test_catch_all_rules() {
        let mut image = RasterImage::from_pixel(30, 30, Rgba([200, 40, 40, 255]));
        image.put_pixel(15, 15, Rgba([250, 248, 246, 255]));
        image.put_pixel(16, 15, Rgba([10, 12, 8, 255]));
        image.put_pixel(17, 15, Rgba([170, 175, 180, 255]));
        let edges = GrayImage::new(30, 30);
        let classifier = GenericClassifier::default();

        let light = classifier.classify(&image, &edges, &palette([60, 200, 60]), false);
        assert_eq!(light.label(15, 15), PixelLabel::Background);
        assert_eq!(light.label(16, 15), PixelLabel::Foreground);
        assert_eq!(light.label(17, 15), PixelLabel::Background);

        let dark = classifier.classify(&image, &edges, &palette([5, 5, 40]), false);
        assert_eq!(dark.label(16, 15), PixelLabel::DarkBackground);
    }
}
