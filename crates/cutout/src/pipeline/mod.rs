pub mod builder;

use image::imageops;
use tracing::{debug, info};

use crate::{
    algorithms::{BackgroundSampler, ImageEnhancer, MaskPostProcessor, TextClassifier},
    config::ExtractionConfig,
    error::{CutoutError, Result},
    prompt::PromptIntent,
    region,
    traits::{BackgroundClassifier, EdgeDetector, RegionProposer},
    types::{ExtractionMode, ExtractionResult, RasterImage, Region},
};

/// The extraction engine: crop, classify, post-process.
///
/// Holds no per-call state, so one pipeline can serve any number of
/// concurrent calls.
pub struct Pipeline {
    config: ExtractionConfig,
    edge_detector: Box<dyn EdgeDetector>,
    classifier: Box<dyn BackgroundClassifier>,
    sampler: BackgroundSampler,
    text_classifier: TextClassifier,
    post_processor: MaskPostProcessor,
    enhancer: Option<ImageEnhancer>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        config: ExtractionConfig,
        edge_detector: Box<dyn EdgeDetector>,
        classifier: Box<dyn BackgroundClassifier>,
        enhancer: Option<ImageEnhancer>,
    ) -> Self {
        Self {
            sampler: BackgroundSampler::new(config.sampler.clone()),
            text_classifier: TextClassifier::new(config.text.clone()),
            post_processor: MaskPostProcessor::new(config.post.clone()),
            config,
            edge_detector,
            classifier,
            enhancer,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Cut the design inside `region` out of `image`.
    ///
    /// The region must already be normalized; it is clipped to the image
    /// and rejected when nothing with positive area remains.
    #[tracing::instrument(
        skip_all,
        fields(image_width = image.width(), image_height = image.height(), %region, %mode)
    )]
    pub fn extract(
        &self,
        image: &RasterImage,
        region: Region,
        mode: ExtractionMode,
        aggressive: bool,
    ) -> Result<ExtractionResult> {
        let (width, height) = image.dimensions();
        let clipped = region
            .clip(width, height)
            .ok_or(CutoutError::InvalidRegion { region, width, height })?;

        // Step 1: Crop
        let crop = imageops::crop_imm(
            image,
            clipped.x1 as u32,
            clipped.y1 as u32,
            clipped.width() as u32,
            clipped.height() as u32,
        )
        .to_image();
        debug!(region = %clipped, crop_width = crop.width(), crop_height = crop.height(), "Cropped");

        // Step 2: Classify and post-process
        let mut output = match mode {
            ExtractionMode::Text => {
                let classification = self.text_classifier.classify(&crop);
                self.post_processor.process(
                    &crop,
                    classification,
                    None,
                    self.config.post.text_filter_size,
                )
            }
            ExtractionMode::Generic => {
                let edges = self.edge_detector.detect(&crop);
                let palette = self.sampler.sample_around(image, clipped, &crop);
                debug!(colors = ?palette.colors, primary = ?palette.primary, "Background palette");
                let classification = self.classifier.classify(&crop, &edges, &palette, aggressive);
                self.post_processor.process(
                    &crop,
                    classification,
                    Some(palette.primary),
                    self.config.post.generic_filter_size,
                )
            }
        };

        // Step 3: Optional enhancement
        if let Some(enhancer) = &self.enhancer {
            output = enhancer.enhance(&output);
        }

        let result = ExtractionResult { image: output, region: clipped, mode };
        info!(
            %mode,
            aggressive,
            width = result.width(),
            height = result.height(),
            opaque = result.opaque_pixel_count(),
            "Extraction complete"
        );
        Ok(result)
    }

    /// Clip and pad an externally proposed region.
    pub fn normalize_region(
        &self,
        proposal: Region,
        prompt: &str,
        image_size: (u32, u32),
    ) -> Result<Region> {
        region::normalize_region(proposal, prompt, image_size)
    }

    /// Extract whatever the prompt describes, asking `proposer` where it is.
    ///
    /// A prompt asking for the whole image never reaches the proposer.
    pub fn extract_with_proposer(
        &self,
        image: &RasterImage,
        prompt: &str,
        proposer: &dyn RegionProposer,
    ) -> Result<ExtractionResult> {
        let intent = PromptIntent::parse(prompt);
        let image_size = image.dimensions();
        let region = if intent.entire {
            Region::full(image_size.0, image_size.1)
        } else {
            let proposal = proposer.propose_region(image, prompt)?;
            debug!(%proposal, "Region proposed");
            self.normalize_region(proposal, prompt, image_size)?
        };
        self.extract(image, region, intent.mode, intent.aggressive)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {:?} edges, enhancement {}",
            self.config.edges.operator,
            if self.enhancer.is_some() { "on" } else { "off" }
        )
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        builder::PipelineBuilder::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn create_test_image() -> RasterImage {
        RasterImage::from_fn(60, 60, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                Rgba([200, 30, 30, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn test_result_matches_region_size() {
        let pipeline = Pipeline::default();
        let result = pipeline
            .extract(&create_test_image(), Region::new(10, 5, 50, 45), ExtractionMode::Generic, false)
            .unwrap();
        assert_eq!((result.width(), result.height()), (40, 40));
        assert_eq!(result.region, Region::new(10, 5, 50, 45));
    }

    #[test]
    fn test_region_is_clipped_to_image() {
        let result = Pipeline::default()
            .extract(&create_test_image(), Region::new(-10, 30, 100, 90), ExtractionMode::Text, false)
            .unwrap();
        assert_eq!(result.region, Region::new(0, 30, 60, 60));
    }

    #[test]
    fn test_zero_area_region_is_rejected() {
        let err = Pipeline::default()
            .extract(&create_test_image(), Region::new(70, 70, 90, 90), ExtractionMode::Generic, false)
            .unwrap_err();
        assert!(matches!(err, CutoutError::InvalidRegion { .. }));
    }

    #[test]
    fn test_entire_prompt_skips_proposer() {
        let proposer = |_: &RasterImage, _: &str| -> Result<Region> {
            Err(CutoutError::InvalidProposal("should not be asked".into()))
        };
        let result = Pipeline::default()
            .extract_with_proposer(&create_test_image(), "the whole picture", &proposer)
            .unwrap();
        assert_eq!(result.region, Region::full(60, 60));
    }

    #[test]
    fn test_proposer_errors_propagate() {
        let proposer = |_: &RasterImage, _: &str| -> Result<Region> {
            Err(CutoutError::InvalidProposal("no box".into()))
        };
        let err = Pipeline::default()
            .extract_with_proposer(&create_test_image(), "the red logo", &proposer)
            .unwrap_err();
        assert!(matches!(err, CutoutError::InvalidProposal(_)));
    }
}
