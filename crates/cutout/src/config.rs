//! Tunable constants for every stage of an extraction.
//!
//! The defaults are the tuned thresholds; a front end can load an
//! [`ExtractionConfig`] from TOML or JSON and override only what it needs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::types::Rgb;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtractionConfig {
    pub sampler: SamplerConfig,
    pub edges: EdgeConfig,
    pub generic: GenericConfig,
    pub text: TextConfig,
    pub post: PostProcessConfig,
    /// Optional sharpen/contrast pass applied to the cut-out
    pub enhance: Option<EnhanceConfig>,
}

impl ExtractionConfig {
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractionConfig)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SamplerConfig {
    /// Width of the peripheral band, as a fraction of each image dimension
    #[schemars(range(min = 0.0, max = 0.5))]
    pub band_fraction: f32,
    /// Maximum number of palette colours kept
    pub palette_size: usize,
    /// Colour distance used when counting support for the primary colour
    pub primary_radius: f32,
    /// Palette used when the band yields no samples
    pub fallback: Vec<Rgb>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            band_fraction: 0.15,
            palette_size: 3,
            primary_radius: 40.0,
            fallback: vec![[255, 255, 255], [240, 240, 240], [200, 200, 200]],
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeOperator {
    /// 3x3 Sobel magnitude `(|gx| + |gy|) / 8`
    #[default]
    Sobel,
    /// Largest absolute difference to the four direct neighbours, doubled
    NeighborContrast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EdgeConfig {
    pub operator: EdgeOperator,
    /// Gaussian sigma applied to the grayscale image before differencing
    pub blur_sigma: f32,
    /// Strengths at or below this value are zeroed (0 keeps everything)
    pub noise_floor: u8,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            operator: EdgeOperator::Sobel,
            blur_sigma: 0.5,
            noise_floor: 0,
        }
    }
}

/// Thresholds of the colour-distance classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GenericConfig {
    /// Normalized radial distance below which a pixel is in the border band
    pub border_band: f32,
    /// Normalized radial distance below which a pixel is in the middle band
    pub middle_band: f32,
    pub border_threshold: f32,
    pub border_threshold_aggressive: f32,
    pub middle_threshold: f32,
    pub middle_threshold_aggressive: f32,
    /// Growth of the middle-band threshold per unit of radial distance
    pub middle_slope: f32,
    pub center_threshold: f32,
    pub center_threshold_aggressive: f32,
    pub strong_edge: u8,
    pub soft_edge: u8,
    /// Pixels this close to the primary colour are background anywhere
    pub primary_distance: f32,
    /// A neighbour farther than this from the palette counts as content
    pub neighbor_distance: f32,
    /// Share of content neighbours that rescues a provisional background pixel
    pub neighbor_ratio: f32,
}

impl Default for GenericConfig {
    fn default() -> Self {
        Self {
            border_band: 0.2,
            middle_band: 0.5,
            border_threshold: 35.0,
            border_threshold_aggressive: 40.0,
            middle_threshold: 40.0,
            middle_threshold_aggressive: 35.0,
            middle_slope: 10.0,
            center_threshold: 45.0,
            center_threshold_aggressive: 40.0,
            strong_edge: 30,
            soft_edge: 15,
            primary_distance: 30.0,
            neighbor_distance: 35.0,
            neighbor_ratio: 0.4,
        }
    }
}

/// Brightness thresholds of the ink extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TextConfig {
    /// Ink threshold as a fraction of the median luminance
    pub median_factor: f32,
    /// Anything brighter is page
    pub page_brightness: f32,
    /// Mean brightness of a white page, and the ink threshold cap it implies
    pub white_page: (f32, f32),
    /// Mean brightness of a light page, and the ink threshold cap it implies
    pub light_page: (f32, f32),
    /// Anti-aliased ink edges must be darker than this
    pub edge_brightness: f32,
    /// Cleanup passes as (reexamine above, keep if a neighbour is below)
    pub cleanup: Vec<(f32, f32)>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            median_factor: 0.5,
            page_brightness: 180.0,
            white_page: (180.0, 90.0),
            light_page: (150.0, 110.0),
            edge_brightness: 130.0,
            cleanup: vec![(130.0, 90.0), (120.0, 80.0)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Max/min filter window for Generic masks (1 disables it)
    pub generic_filter_size: u8,
    /// Max/min filter window for Text masks
    pub text_filter_size: u8,
    pub blur_sigma: f32,
    /// Blurred alpha within this of 0 or 255 snaps to that extreme
    pub alpha_floor: u8,
    pub defringe_passes: usize,
    /// Boundary pixels this close to the primary background are stripped
    pub defringe_distance: f32,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            generic_filter_size: 1,
            text_filter_size: 3,
            blur_sigma: 0.3,
            alpha_floor: 8,
            defringe_passes: 2,
            defringe_distance: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Contrast change in percent
    pub contrast: f32,
    pub unsharp_sigma: f32,
    pub unsharp_threshold: i32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            contrast: 20.0,
            unsharp_sigma: 1.0,
            unsharp_threshold: 3,
        }
    }
}
