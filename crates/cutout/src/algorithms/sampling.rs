use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    config::SamplerConfig,
    types::{BackgroundPalette, RasterImage, Region, Rgb, color_distance, rgb_of},
};

/// Derives a background palette from the periphery of an image
#[derive(Debug, Clone, Default)]
pub struct BackgroundSampler {
    pub config: SamplerConfig,
}

impl BackgroundSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// Sample the band of the crop itself.
    pub fn sample(&self, crop: &RasterImage) -> BackgroundPalette {
        let colors = self.band_colors(crop, None);
        self.palette_from(colors, crop)
    }

    /// Sample the band of the full `source` image while skipping pixels
    /// inside `region`, which likely belong to the design.
    ///
    /// Falls back to the crop's own band when the region leaves nothing
    /// outside it to sample.
    pub fn sample_around(
        &self,
        source: &RasterImage,
        region: Region,
        crop: &RasterImage,
    ) -> BackgroundPalette {
        let colors = self.band_colors(source, Some(region));
        if colors.is_empty() {
            debug!(%region, "No background samples outside the region, sampling the crop band");
            return self.sample(crop);
        }
        self.palette_from(colors, crop)
    }

    fn band_colors(&self, image: &RasterImage, exclude: Option<Region>) -> Vec<Rgb> {
        let (width, height) = image.dimensions();
        let band_x = (width as f32 * self.config.band_fraction) as u32;
        let band_y = (height as f32 * self.config.band_fraction) as u32;

        image
            .enumerate_pixels()
            .filter(|&(x, y, _)| {
                x < band_x
                    || x >= width.saturating_sub(band_x)
                    || y < band_y
                    || y >= height.saturating_sub(band_y)
            })
            .filter(|&(x, y, _)| !exclude.is_some_and(|r| r.contains(x as i64, y as i64)))
            .map(|(_, _, p)| rgb_of(p))
            .collect()
    }

    fn palette_from(&self, samples: Vec<Rgb>, crop: &RasterImage) -> BackgroundPalette {
        let colors = if samples.is_empty() {
            warn!("Background band is empty, using the default palette");
            self.config.fallback.clone()
        } else {
            rank_by_frequency(&samples, self.config.palette_size)
        };

        let primary = self.primary_color(&colors, crop);
        debug!(?colors, ?primary, samples = samples.len(), "Sampled background palette");
        BackgroundPalette { colors, primary }
    }

    /// The candidate with the most crop pixels within `primary_radius`.
    /// Ties go to the more frequent candidate.
    fn primary_color(&self, candidates: &[Rgb], crop: &RasterImage) -> Rgb {
        let mut best: Option<(Rgb, usize)> = None;
        for &candidate in candidates {
            let support = crop
                .pixels()
                .filter(|p| color_distance(rgb_of(p), candidate) < self.config.primary_radius)
                .count();
            if best.is_none_or(|(_, count)| support > count) {
                best = Some((candidate, support));
            }
        }
        best.map(|(color, _)| color).unwrap_or([255, 255, 255])
    }
}

/// The `limit` most frequent colours; ties keep first-seen order.
fn rank_by_frequency(samples: &[Rgb], limit: usize) -> Vec<Rgb> {
    let mut counts: HashMap<Rgb, (usize, usize)> = HashMap::new();
    for (index, &color) in samples.iter().enumerate() {
        counts.entry(color).or_insert((0, index)).0 += 1;
    }

    let mut ranked: Vec<(Rgb, usize, usize)> = counts
        .into_iter()
        .map(|(color, (count, first))| (color, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(limit).map(|(color, _, _)| color).collect()
}
