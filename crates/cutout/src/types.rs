use std::{fmt, io::Cursor, path::Path};

use image::{GrayImage, ImageFormat, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::Result;

/// An RGBA raster with 8-bit channels. Inputs are never mutated in place.
pub type RasterImage = RgbaImage;

/// Per-pixel edge strength in `[0, 255]`, co-indexed with the cropped image.
pub type EdgeMap = GrayImage;

/// Per-pixel alpha: 0 is background, 255 is foreground.
pub type Mask = GrayImage;

/// An RGB colour triple.
pub type Rgb = [u8; 3];

/// Axis-aligned rectangle in image pixel coordinates, half-open on the
/// right and bottom edges.
///
/// Coordinates are signed so that proposals from external sources that
/// spill outside the image can be represented before clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Region {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Region {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// The region covering a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i64, height as i64)
    }

    pub fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> i64 {
        self.width().max(0) * self.height().max(0)
    }

    /// Reorder the corners so that `x1 <= x2` and `y1 <= y2`.
    pub fn ordered(&self) -> Self {
        Self::new(
            self.x1.min(self.x2),
            self.y1.min(self.y2),
            self.x1.max(self.x2),
            self.y1.max(self.y2),
        )
    }

    /// Clip to `0..width` x `0..height`.
    ///
    /// Returns `None` when nothing with positive area remains.
    pub fn clip(&self, width: u32, height: u32) -> Option<Self> {
        let (w, h) = (width as i64, height as i64);
        let clipped = Self::new(
            self.x1.clamp(0, w),
            self.y1.clamp(0, h),
            self.x2.clamp(0, w),
            self.y2.clamp(0, h),
        );
        (clipped.x1 < clipped.x2 && clipped.y1 < clipped.y2).then_some(clipped)
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExtractionMode {
    /// Colour-distance classification against a sampled background palette
    #[default]
    Generic,
    /// Brightness-driven extraction of dark ink from a light page
    Text,
}

impl ExtractionMode {
    /// Pick a mode from a free-text user instruction.
    ///
    /// This is a convenience for front ends; the engine itself only ever
    /// sees the resulting enum.
    pub fn from_prompt(prompt: Option<&str>) -> Self {
        prompt
            .map(|p| crate::prompt::PromptIntent::parse(p).mode)
            .unwrap_or_default()
    }
}

/// Up to three probable background colours ranked by how often they occur
/// in the sampled band, plus the one colour that dominates the crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPalette {
    pub colors: Vec<Rgb>,
    pub primary: Rgb,
}

impl BackgroundPalette {
    /// Distance from `rgb` to the nearest palette colour.
    pub fn min_distance(&self, rgb: Rgb) -> f32 {
        self.colors
            .iter()
            .map(|&c| color_distance(rgb, c))
            .fold(f32::INFINITY, f32::min)
    }

    pub fn distance_to_primary(&self, rgb: Rgb) -> f32 {
        color_distance(rgb, self.primary)
    }

    /// Whether the dominant background colour is itself dark.
    pub fn is_dark(&self) -> bool {
        luminance(self.primary) < 80.0
    }
}

/// Outcome of classifying one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLabel {
    Foreground,
    Background,
    /// Background decided by the near-black rule; rendered as transparent black.
    DarkBackground,
}

impl PixelLabel {
    pub fn is_foreground(self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// RGB used for a transparent output pixel carrying this label.
    pub fn transparent_fill(self) -> Rgb {
        match self {
            Self::DarkBackground => [0, 0, 0],
            _ => [255, 255, 255],
        }
    }
}

/// Per-pixel decisions for a cropped image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub width: u32,
    pub height: u32,
    pub labels: Vec<PixelLabel>,
}

impl Classification {
    pub fn new(width: u32, height: u32, labels: Vec<PixelLabel>) -> Self {
        debug_assert_eq!(labels.len(), width as usize * height as usize);
        Self { width, height, labels }
    }

    pub fn label(&self, x: u32, y: u32) -> PixelLabel {
        self.labels[(y * self.width + x) as usize]
    }

    pub fn foreground_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_foreground()).count()
    }

    /// Binary mask: 255 for foreground, 0 otherwise.
    pub fn to_mask(&self) -> Mask {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.label(x, y).is_foreground() { 255 } else { 0 }])
        })
    }
}

/// The cut-out: the normalized region of the source with its alpha channel
/// replaced by the smoothed mask.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub image: RasterImage,
    /// Region of the source image the cut-out was taken from
    pub region: Region,
    pub mode: ExtractionMode,
}

impl ExtractionResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of pixels with any opacity.
    pub fn opaque_pixel_count(&self) -> usize {
        self.image.pixels().filter(|p| p[3] > 0).count()
    }

    /// The alpha channel as a standalone mask.
    pub fn alpha(&self) -> Mask {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            image::Luma([self.image.get_pixel(x, y)[3]])
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// Euclidean distance between two RGB colours.
pub fn color_distance(a: Rgb, b: Rgb) -> f32 {
    let dr = a[0] as f32 - b[0] as f32;
    let dg = a[1] as f32 - b[1] as f32;
    let db = a[2] as f32 - b[2] as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// ITU-R 601 luma, the weighting the brightness thresholds are tuned for.
pub fn luminance(rgb: Rgb) -> f32 {
    0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32
}

pub(crate) fn rgb_of(pixel: &image::Rgba<u8>) -> Rgb {
    [pixel[0], pixel[1], pixel[2]]
}
