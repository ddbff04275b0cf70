use std::time::{Duration, Instant};

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalyzerStats, FrameAnalyzer};
use crate::frame::{DepthQuery, Frame};
use crate::models::BoundingBox;
use crate::sink::SinkEvent;
use crate::spatial::{deviation_angle, ClockDirection};
use crate::stabilizer::{DetectionState, Sighting, Stabilizer, StabilizerParams};

/// One box returned by an external object detector
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDetection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub confidence: f32,
}

/// External inference service: boxes, class ids and confidences for a frame
pub trait ObjectDetector: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<ObjectDetection>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectParams {
    pub min_confidence: f32,
    /// Objects closer than this (or without a depth reading) are ignored
    pub min_distance_m: f32,
    pub cooldown_secs: f64,
    /// Detector results arriving later than this are discarded
    pub latency_budget_ms: u64,
}

impl Default for ObjectParams {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            min_distance_m: 1.0,
            cooldown_secs: 10.0,
            latency_budget_ms: 500,
        }
    }
}

/// Generic object analysis (people, door handles, ...) keyed by a fixed label
pub struct ObjectAnalyzer {
    label: String,
    detector: Box<dyn ObjectDetector>,
    params: ObjectParams,
    stabilizer: Stabilizer,
    state: DetectionState<String>,
}

impl ObjectAnalyzer {
    pub fn new(label: impl Into<String>, detector: Box<dyn ObjectDetector>, params: ObjectParams) -> Self {
        let stabilizer = Stabilizer::from_params(&StabilizerParams {
            cooldown_secs: params.cooldown_secs,
        });
        Self {
            label: label.into(),
            detector,
            params,
            stabilizer,
            state: DetectionState::new(),
        }
    }

    pub fn state(&self) -> &DetectionState<String> {
        &self.state
    }

    fn sighting(&self, detection: &ObjectDetection, frame: &Frame) -> Option<Sighting<String>> {
        if detection.confidence < self.params.min_confidence {
            return None;
        }

        let center = detection.bbox.center();
        let distance_m = frame.depth.distance(center.x as u32, center.y as u32);
        if distance_m <= 0.0 || distance_m < self.params.min_distance_m {
            return None;
        }

        let angle = deviation_angle(frame.width(), center.x);
        Some(Sighting {
            identity: self.label.clone(),
            position: center,
            distance_m,
            angle,
            direction: ClockDirection::from_angle(angle),
            inner_ring_count: None,
        })
    }
}

impl FrameAnalyzer for ObjectAnalyzer {
    fn name(&self) -> &str {
        &self.label
    }

    fn analyze(&mut self, frame: &Frame, now: Instant) -> Result<Vec<SinkEvent>> {
        let started = Instant::now();
        let detections = self.detector.detect(&frame.color)?;
        let elapsed = started.elapsed();

        let budget = Duration::from_millis(self.params.latency_budget_ms);
        if elapsed > budget {
            log::warn!(
                "{}: detector took {:?} (budget {:?}), dropping frame {} result",
                self.label,
                elapsed,
                budget,
                frame.index
            );
            return Ok(Vec::new());
        }

        let sightings: Vec<Sighting<String>> = detections
            .iter()
            .filter_map(|d| self.sighting(d, frame))
            .collect();

        let events = self.stabilizer.observe_all(&mut self.state, sightings, now);

        Ok(events
            .into_iter()
            .inspect(|e| {
                if e.announce {
                    log::info!("{}", e.describe());
                }
            })
            .map(|e| e.to_sink_event())
            .collect())
    }

    fn stats(&self) -> AnalyzerStats {
        AnalyzerStats {
            frames_processed: self.state.frames_processed(),
            frames_with_detection: self.state.frames_with_detection(),
        }
    }
}
