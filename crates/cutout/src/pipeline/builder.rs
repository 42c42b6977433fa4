use crate::{
    algorithms::{
        ConservativeClassifier, GenericClassifier, ImageEnhancer, NeighborContrastEdgeDetector,
        edge_detector_from_config,
    },
    config::{EdgeOperator, EnhanceConfig, ExtractionConfig},
    pipeline::Pipeline,
    traits::{BackgroundClassifier, EdgeDetector},
};

/// Builder for creating extraction pipelines with a fluent API
pub struct PipelineBuilder {
    config: ExtractionConfig,
    edge_detector: Option<Box<dyn EdgeDetector>>,
    classifier: Option<Box<dyn BackgroundClassifier>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: ExtractionConfig::default(),
            edge_detector: None,
            classifier: None,
        }
    }

    /// Replace the tuning constants
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the edge detector used in generic mode (replaces any existing one)
    pub fn edge_detector<E>(mut self, detector: E) -> Self
    where
        E: EdgeDetector + 'static,
    {
        self.edge_detector = Some(Box::new(detector));
        self
    }

    /// Set the generic-mode classifier (replaces any existing one)
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: BackgroundClassifier + 'static,
    {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Use the legacy hard-edge classifier for generic mode
    pub fn conservative(mut self) -> Self {
        self.config.edges.operator = EdgeOperator::NeighborContrast;
        self.edge_detector(NeighborContrastEdgeDetector::default())
            .classifier(ConservativeClassifier::default())
    }

    /// Contrast boost and sharpening on the finished cut-out
    pub fn with_enhancement(mut self, enhance: EnhanceConfig) -> Self {
        self.config.enhance = Some(enhance);
        self
    }

    /// Build the pipeline, deriving unset components from the config
    pub fn build(self) -> Pipeline {
        let edge_detector = self
            .edge_detector
            .unwrap_or_else(|| edge_detector_from_config(&self.config.edges));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(GenericClassifier::new(self.config.generic.clone())));
        let enhancer = self.config.enhance.clone().map(ImageEnhancer::new);

        Pipeline::new(self.config, edge_detector, classifier, enhancer)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
