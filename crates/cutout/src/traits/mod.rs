use crate::{
    error::Result,
    types::{BackgroundPalette, Classification, EdgeMap, RasterImage, Region},
};

/// Trait for edge-strength operators
pub trait EdgeDetector: Send + Sync {
    /// Compute an edge map co-indexed with `image`
    fn detect(&self, image: &RasterImage) -> EdgeMap;
}

/// Trait for palette-driven background/foreground classifiers
pub trait BackgroundClassifier: Send + Sync {
    /// Label every pixel of the cropped `image`
    fn classify(
        &self,
        image: &RasterImage,
        edges: &EdgeMap,
        palette: &BackgroundPalette,
        aggressive: bool,
    ) -> Classification;
}

/// Capability that proposes a region for a natural-language request,
/// typically backed by an external vision-language model.
pub trait RegionProposer: Send + Sync {
    fn propose_region(&self, image: &RasterImage, prompt: &str) -> Result<Region>;
}

impl<F> RegionProposer for F
where
    F: Fn(&RasterImage, &str) -> Result<Region> + Send + Sync,
{
    fn propose_region(&self, image: &RasterImage, prompt: &str) -> Result<Region> {
        self(image, prompt)
    }
}
