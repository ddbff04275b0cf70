pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod models;
pub mod pipeline;
pub mod runner;
pub mod sink;
pub mod spatial;
pub mod stabilizer;

pub use analysis::{AnalysisScheduler, FrameAnalyzer, MarkerAnalyzer, ObjectAnalyzer};
pub use config::Config;
pub use detection::{FrameReport, MarkerDetector};
pub use detection::classifier::{Classification, MarkerCatalog, MarkerClassifier};
pub use frame::{DepthMap, DepthQuery, Frame, FramePoll, FrameSource, ImageSequenceSource};
pub use models::{BoundingBox, Circle, CircleCandidate, MarkerIdentity, MarkerObservation, Point, RawContour};
pub use pipeline::{Pipeline, PipelineContext, PipelineStep};
pub use runner::{RunSummary, Runner};
pub use sink::{EventSink, JsonLinesSink, LogSink, SinkEvent};
pub use spatial::{ClockDirection, SpatialEstimator};
pub use stabilizer::{DetectionState, Sighting, StableEvent, Stabilizer};
