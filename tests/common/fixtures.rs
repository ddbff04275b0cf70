use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use ringmark::analysis::AnalyzerStats;
use ringmark::detection::circles::CircleDetector;
use ringmark::detection::steps::GrayscaleStep;
use ringmark::error::SinkError;

use super::*;

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Candidate with a synthetic circular contour-free shape
pub fn candidate(x: f32, y: f32, major: f32, minor: f32) -> CircleCandidate {
    CircleCandidate {
        center: Point::new(x, y),
        major_axis: major,
        minor_axis: minor,
        angle: 0.0,
        contour: RawContour::default(),
        parent: None,
        area: std::f32::consts::PI * major * minor / 4.0,
        perimeter: std::f32::consts::PI * (major + minor) / 2.0,
    }
}

pub fn circle(x: f32, y: f32, radius: f32) -> Circle {
    Circle {
        center: Point::new(x, y),
        radius,
    }
}

/// Catalog used by the reference scenario
pub fn test_catalog() -> MarkerCatalog {
    MarkerCatalog::from_pairs([(3, "Marker 3")])
}

/// Circle detector that always reports the same circles (ROI-local)
#[derive(Clone)]
pub struct StubCircleDetector {
    pub circles: Vec<Circle>,
}

impl StubCircleDetector {
    /// `count` well-separated circles
    pub fn with_count(count: usize) -> Self {
        Self {
            circles: (0..count).map(|i| circle(10.0 + 25.0 * i as f32, 20.0, 8.0)).collect(),
        }
    }
}

impl CircleDetector for StubCircleDetector {
    fn detect_circles(&self, _roi: &GrayImage) -> Vec<Circle> {
        self.circles.clone()
    }
}

/// Detector with the reference catalog and a stub inner-circle count
pub fn stub_detector(inner_count: usize) -> MarkerDetector {
    let config = Config {
        catalog: test_catalog(),
        ..Config::default()
    };
    MarkerDetector::from_config(&config)
        .with_circle_detector(Box::new(StubCircleDetector::with_count(inner_count)))
}

/// Detector that treats the color frame as an already-binarized edge image
pub fn binary_input_detector(config: &Config) -> MarkerDetector {
    MarkerDetector::from_config(config)
        .with_preprocessing(Pipeline::new().add_step(Arc::new(GrayscaleStep)))
}

/// Edge image of a two-ring marker (radii 110 and 80) with `dots` small
/// filled inner circles, centered at (`cx`, `cy`)
pub fn ring_marker_image(cx: i32, cy: i32, dots: usize) -> RgbImage {
    let mut img = RgbImage::new(WIDTH, HEIGHT);
    draw_hollow_circle_mut(&mut img, (cx, cy), 110, WHITE);
    draw_hollow_circle_mut(&mut img, (cx, cy), 80, WHITE);

    let offsets = [(-20, -20), (20, -20), (0, 25), (-30, 20), (30, 20)];
    for (dx, dy) in offsets.iter().take(dots) {
        draw_filled_circle_mut(&mut img, (cx + dx, cy + dy), 8, WHITE);
    }
    img
}

pub fn frame_with(index: u64, color: RgbImage, depth_m: f32) -> Frame {
    let (w, h) = color.dimensions();
    Frame::new(index, color, DepthMap::uniform(w, h, depth_m))
}

pub fn blank_frame(index: u64) -> Frame {
    frame_with(index, RgbImage::new(WIDTH, HEIGHT), 2.0)
}

pub fn sighting(identity: &str, x: f32, distance_m: f32) -> Sighting<String> {
    Sighting {
        identity: identity.to_string(),
        position: Point::new(x, 240.0),
        distance_m,
        angle: 0.0,
        direction: ClockDirection::Twelve,
        inner_ring_count: None,
    }
}

pub fn event(identity: &str) -> SinkEvent {
    SinkEvent {
        identity: identity.to_string(),
        distance_steps: 3,
        direction: "12 o'clock".to_string(),
    }
}

/// Sink that records every delivered event, optionally failing instead
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<SinkEvent>>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn deliver(&mut self, event: &SinkEvent) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Rejected("sink unreachable".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Frame source replaying a fixed script of polls
pub struct ScriptedSource {
    polls: VecDeque<FramePoll>,
}

impl ScriptedSource {
    pub fn new(polls: Vec<FramePoll>) -> Self {
        Self { polls: polls.into() }
    }

    pub fn frames(count: u64) -> Self {
        Self::new((0..count).map(|i| FramePoll::Ready(blank_frame(i))).collect())
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> FramePoll {
        self.polls.pop_front().unwrap_or(FramePoll::Finished)
    }
}

/// Analyzer that records which frames it saw and emits fixed events
pub struct ScriptedAnalyzer {
    pub name: String,
    pub seen: Arc<Mutex<Vec<u64>>>,
    pub events: Vec<SinkEvent>,
    pub fail: bool,
}

impl ScriptedAnalyzer {
    pub fn new(name: &str, events: Vec<SinkEvent>) -> Self {
        Self {
            name: name.to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
            events,
            fail: false,
        }
    }
}

impl FrameAnalyzer for ScriptedAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&mut self, frame: &Frame, _now: Instant) -> anyhow::Result<Vec<SinkEvent>> {
        self.seen.lock().unwrap().push(frame.index);
        if self.fail {
            anyhow::bail!("analysis exploded");
        }
        Ok(self.events.clone())
    }

    fn stats(&self) -> AnalyzerStats {
        let frames = self.seen.lock().unwrap().len() as u64;
        AnalyzerStats {
            frames_processed: frames,
            frames_with_detection: if self.events.is_empty() { 0 } else { frames },
        }
    }
}
