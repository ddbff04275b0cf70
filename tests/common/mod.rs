#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from ringmark for tests
pub use ringmark::{
    AnalysisScheduler, BoundingBox, Circle, CircleCandidate, ClockDirection, Config, DepthMap,
    DetectionState, EventSink, Frame, FrameAnalyzer, FramePoll, FrameSource, MarkerAnalyzer,
    MarkerCatalog, MarkerClassifier, MarkerDetector, MarkerIdentity, Pipeline, Point, RawContour, Runner,
    Sighting, SinkEvent, Stabilizer,
};
