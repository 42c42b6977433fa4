use tracing::debug;

use crate::{
    traits::BackgroundClassifier,
    types::{BackgroundPalette, Classification, EdgeMap, PixelLabel, RasterImage, rgb_of},
};

/// Legacy whole-image classifier.
///
/// Only hard edges are protected, so photographic noise is not mistaken for
/// object boundaries; the flat-colour rules are correspondingly stricter.
/// Near-black reads as background only when the palette itself is dark.
#[derive(Debug, Clone)]
pub struct ConservativeClassifier {
    pub hard_edge: u8,
    pub threshold: f32,
}

impl Default for ConservativeClassifier {
    fn default() -> Self {
        Self {
            hard_edge: 100,
            threshold: 35.0,
        }
    }
}

impl BackgroundClassifier for ConservativeClassifier {
    fn classify(
        &self,
        image: &RasterImage,
        edges: &EdgeMap,
        palette: &BackgroundPalette,
        _aggressive: bool,
    ) -> Classification {
        let labels: Vec<PixelLabel> = image
            .enumerate_pixels()
            .map(|(x, y, pixel)| {
                if edges.get_pixel(x, y)[0] > self.hard_edge {
                    return PixelLabel::Foreground;
                }
                let rgb = rgb_of(pixel);
                if palette.min_distance(rgb) < self.threshold {
                    return PixelLabel::Background;
                }

                let [r, g, b] = rgb.map(|c| c as i32);
                let flat = (r - g).abs() < 10 && (g - b).abs() < 10 && (r - b).abs() < 10;
                let mean = (r + g + b) as f32 / 3.0;
                if (r > 250 && g > 250 && b > 250) || (flat && mean > 230.0) {
                    PixelLabel::Background
                } else if palette.is_dark() && ((r < 20 && g < 20 && b < 20) || (flat && mean < 30.0)) {
                    PixelLabel::DarkBackground
                } else {
                    PixelLabel::Foreground
                }
            })
            .collect();

        let classification = Classification::new(image.width(), image.height(), labels);
        debug!(
            foreground = classification.foreground_count(),
            "Conservative classification"
        );
        classification
    }
}
