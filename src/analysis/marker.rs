use std::time::Instant;

use anyhow::Result;

use crate::analysis::{AnalyzerStats, FrameAnalyzer};
use crate::detection::MarkerDetector;
use crate::frame::Frame;
use crate::models::MarkerIdentity;
use crate::sink::SinkEvent;
use crate::stabilizer::{DetectionState, Sighting, Stabilizer};

/// Ring-marker pipeline plus its own cooldown state
pub struct MarkerAnalyzer {
    detector: MarkerDetector,
    stabilizer: Stabilizer,
    state: DetectionState<MarkerIdentity>,
}

impl MarkerAnalyzer {
    pub fn new(detector: MarkerDetector, stabilizer: Stabilizer) -> Self {
        Self {
            detector,
            stabilizer,
            state: DetectionState::new(),
        }
    }

    pub fn state(&self) -> &DetectionState<MarkerIdentity> {
        &self.state
    }
}

impl FrameAnalyzer for MarkerAnalyzer {
    fn name(&self) -> &str {
        "markers"
    }

    fn analyze(&mut self, frame: &Frame, now: Instant) -> Result<Vec<SinkEvent>> {
        let report = self.detector.detect(frame)?;

        if let Some(c) = &report.classification {
            log::debug!(
                "Frame {}: target at ({:.0}, {:.0}) with {} inner circle(s) -> {}",
                frame.index,
                c.target.center.x,
                c.target.center.y,
                c.inner_ring_count,
                c.identity
            );
        }

        let sighting = report.observation.map(Sighting::from);
        let event = self.stabilizer.observe(&mut self.state, sighting, now);

        Ok(event
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
