//! # Cutout
//!
//! Region-bounded foreground extraction for print design workflows.
//! Given a photo or scan and a rectangle around a design, produces an
//! RGBA cut-out in which the design is opaque and the surface behind it
//! (fabric, paper, a flat backdrop) is transparent.
//!
//! ## Core Features
//!
//! - **Two extraction modes**: colour-distance classification against a
//!   sampled background palette, or brightness-driven ink extraction for text
//! - **Edge protection**: strong gradients are never removed, so designs
//!   keep their outline even when they share colours with the background
//! - **Region normalization**: clip and pad boxes proposed by a user or an
//!   external vision model
//! - **Trait-based Pipeline**: swap edge operators and classifiers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cutout::{ExtractionMode, Pipeline, Region, decode_image};
//!
//! let image = decode_image(&std::fs::read("shirt.jpg")?)?;
//! let pipeline = Pipeline::builder().build();
//!
//! let result = pipeline.extract(&image, Region::new(120, 80, 420, 380), ExtractionMode::Generic, false)?;
//! result.save_png("design.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Proposals from a prompt
//!
//! ```rust,no_run
//! use cutout::{Pipeline, RasterImage, Region, Result, parse_proposal};
//!
//! # let image = RasterImage::new(800, 600);
//! let ask_model = |_: &RasterImage, _: &str| -> Result<Region> {
//!     parse_proposal(r#"{"x1": 100, "y1": 50, "x2": 400, "y2": 300}"#)
//! };
//! let result = Pipeline::default().extract_with_proposer(&image, "the text on the sign", &ask_model)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod prompt;
pub mod region;
pub mod session;

// Re-exports for convenience
pub use error::{CutoutError, Result};
pub use types::*;
pub use config::*;
pub use traits::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use prompt::PromptIntent;
pub use region::{parse_proposal, normalize_region};
pub use session::SessionStore;

use image::DynamicImage;

/// Extract with the default pipeline.
pub fn extract(
    image: &RasterImage,
    region: Region,
    mode: ExtractionMode,
    aggressive: bool,
) -> Result<ExtractionResult> {
    Pipeline::default().extract(image, region, mode, aggressive)
}

/// Decode JPEG, PNG, BMP or TIFF bytes into an RGBA raster.
pub fn decode_image(bytes: &[u8]) -> Result<RasterImage> {
    to_raster(image::load_from_memory(bytes)?)
}

/// Convert a decoded image to 8-bit RGBA.
///
/// Integer colour types convert losslessly in structure; floating-point
/// HDR images have no faithful 8-bit mapping and are rejected.
pub fn to_raster(image: DynamicImage) -> Result<RasterImage> {
    match image {
        DynamicImage::ImageRgba8(rgba) => Ok(rgba),
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => Ok(image.to_rgba8()),
        other => Err(CutoutError::UnsupportedImageMode(format!("{:?}", other.color()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb32FImage};

    #[test]
    fn test_to_raster_accepts_integer_modes() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 2, Luma([77])));
        let raster = to_raster(gray).unwrap();
        assert_eq!(raster.dimensions(), (3, 2));
        assert_eq!(raster.get_pixel(0, 0).0, [77, 77, 77, 255]);
    }

    #[test]
    fn test_to_raster_rejects_float_images() {
        let hdr = DynamicImage::ImageRgb32F(Rgb32FImage::new(2, 2));
        let err = to_raster(hdr).unwrap_err();
        assert!(matches!(err, CutoutError::UnsupportedImageMode(_)));
    }

    #[test]
    fn test_decode_round_trips_png_result() {
        let result = ExtractionResult {
            image: RasterImage::from_pixel(5, 4, image::Rgba([10, 20, 30, 128])),
            region: Region::full(5, 4),
            mode: ExtractionMode::Text,
        };
        let decoded = decode_image(&result.encode_png().unwrap()).unwrap();
        assert_eq!(decoded, result.image);
    }

    #[test]
    fn test_decode_garbage_is_an_image_error() {
        assert!(matches!(decode_image(b"not an image"), Err(CutoutError::Image(_))));
    }
}
