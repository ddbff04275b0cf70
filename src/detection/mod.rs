pub mod preprocessing;
pub mod contours;
pub mod ellipse;
pub mod circles;
pub mod classifier;
pub mod steps;

use image::{DynamicImage, GrayImage};
use crate::config::Config;
use crate::detection::circles::{CircleDetector, ContourCircleDetector, DedupParams, ExtractionParams};
use crate::detection::classifier::{Classification, MarkerClassifier};
use crate::detection::ellipse::{EllipseFitter, DirectEllipseFitter};
use crate::detection::preprocessing::PreprocessingParams;
use crate::frame::{DepthQuery, Frame};
use crate::models::{CircleCandidate, MarkerObservation};
use crate::pipeline::Pipeline;
use crate::spatial::SpatialEstimator;

/// What the marker pipeline saw in one frame
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Contours traced in the binary image
    pub contours: usize,
    /// Candidates after shape filtering and duplicate removal
    pub candidates: Vec<CircleCandidate>,
    pub classification: Option<Classification>,
    /// Set only when a target was classified and passed the distance gate
    pub observation: Option<MarkerObservation>,
}

/// Per-frame marker pipeline: binarize, extract, dedup, classify, locate
pub struct MarkerDetector {
    preprocessing: Pipeline,
    fitter: Box<dyn EllipseFitter>,
    extraction: ExtractionParams,
    dedup: DedupParams,
    classifier: MarkerClassifier,
    estimator: SpatialEstimator,
}

impl MarkerDetector {
    pub fn from_config(config: &Config) -> Self {
        Self {
            preprocessing: build_standard_pipeline(&config.preprocessing),
            fitter: Box::new(DirectEllipseFitter),
            extraction: config.extraction.clone(),
            dedup: config.dedup.clone(),
            classifier: MarkerClassifier::new(
                config.catalog.clone(),
                Box::new(ContourCircleDetector::new(config.inner_circles.clone())),
                config.dedup.clone(),
            ),
            estimator: SpatialEstimator::new(config.spatial.clone()),
        }
    }

    /// Replace the preprocessing chain (e.g. one with debug output enabled)
    pub fn with_preprocessing(mut self, preprocessing: Pipeline) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    pub fn with_fitter(mut self, fitter: Box<dyn EllipseFitter>) -> Self {
        self.fitter = fitter;
        self
    }

    pub fn with_classifier(mut self, classifier: MarkerClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Swap the inner-circle primitive, keeping catalog and dedup rules
    pub fn with_circle_detector(mut self, detector: Box<dyn CircleDetector>) -> Self {
        self.classifier = MarkerClassifier::new(
            self.classifier.catalog().clone(),
            detector,
            self.dedup.clone(),
        );
        self
    }

    /// Run the full pipeline on one frame
    pub fn detect(&self, frame: &Frame) -> anyhow::Result<FrameReport> {
        let binary = self.binarize(frame)?;
        Ok(self.analyze_binary(&binary, &frame.depth))
    }

    /// Color frame to binary edge image
    pub fn binarize(&self, frame: &Frame) -> anyhow::Result<GrayImage> {
        self.preprocessing
            .run(DynamicImage::ImageRgb8(frame.color.clone()), frame.index)
    }

    /// Deduplicated circle candidates of a binary image
    pub fn candidates(&self, binary: &GrayImage) -> (usize, Vec<CircleCandidate>) {
        let traced = contours::find_contours(binary);
        let extracted = circles::extract_candidates(&traced, self.fitter.as_ref(), &self.extraction);
        let deduplicated = circles::dedup(&extracted, &self.dedup);
        log::debug!(
            "Contours: {}, candidates: {}, after dedup: {}",
            traced.len(),
            extracted.len(),
            deduplicated.len()
        );
        (traced.len(), deduplicated)
    }

    pub fn analyze_binary<D: DepthQuery + ?Sized>(&self, binary: &GrayImage, depth: &D) -> FrameReport {
        let (contours, candidates) = self.candidates(binary);
        let mut report = self.locate(candidates, binary, depth);
        report.contours = contours;
        report
    }

    /// Classify already-deduplicated candidates and place the marker of interest
    pub fn locate<D: DepthQuery + ?Sized>(
        &self,
        candidates: Vec<CircleCandidate>,
        binary: &GrayImage,
        depth: &D,
    ) -> FrameReport {
        let classification = self.classifier.classify(&candidates, binary);

        let observation = classification.as_ref().and_then(|c| {
            let placement = self.estimator.locate(c.target.center, depth, binary.width())?;
            Some(MarkerObservation {
                identity: c.identity.clone(),
                position: c.target.center,
                distance_m: placement.distance_m,
                angle: placement.angle,
                direction: placement.direction,
                inner_ring_count: c.inner_ring_count,
            })
        });

        FrameReport {
            contours: 0,
            candidates,
            classification,
            observation,
        }
    }
}

/// Build the standard preprocessing chain: grayscale, median, Gaussian, Canny
pub fn build_standard_pipeline(params: &PreprocessingParams) -> Pipeline {
    use crate::detection::steps::*;
    use std::sync::Arc;

    Pipeline::new()
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(MedianBlurStep { radius: params.median_radius }))
        .add_step(Arc::new(BlurStep { sigma: params.blur_sigma }))
        .add_step(Arc::new(EdgeDetectionStep {
            low_threshold: params.canny_low,
            high_threshold: params.canny_high,
        }))
}
