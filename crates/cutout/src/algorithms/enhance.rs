use image::imageops;

use crate::{config::EnhanceConfig, types::RasterImage};

/// Contrast boost and unsharp mask for a finished cut-out.
///
/// The alpha channel is carried over untouched.
#[derive(Debug, Clone, Default)]
pub struct ImageEnhancer {
    pub config: EnhanceConfig,
}

impl ImageEnhancer {
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }

    pub fn enhance(&self, image: &RasterImage) -> RasterImage {
        let contrasted = imageops::contrast(image, self.config.contrast);
        let mut sharpened = imageops::unsharpen(
            &contrasted,
            self.config.unsharp_sigma,
            self.config.unsharp_threshold,
        );
        for (out, src) in sharpened.pixels_mut().zip(image.pixels()) {
            out[3] = src[3];
        }
        sharpened
    }
}
