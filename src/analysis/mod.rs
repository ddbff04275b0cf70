pub mod marker;
pub mod objects;

use std::time::Instant;

use anyhow::Result;

use crate::frame::Frame;
use crate::sink::SinkEvent;

pub use marker::MarkerAnalyzer;
pub use objects::{ObjectAnalyzer, ObjectDetection, ObjectDetector, ObjectParams};

/// Frame counters an analyzer reports for run summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnalyzerStats {
    pub frames_processed: u64,
    pub frames_with_detection: u64,
}

/// One "slow" analysis that can be scheduled against a frame
pub trait FrameAnalyzer: Send {
    /// Human-readable name (used in logs and summaries)
    fn name(&self) -> &str;

    /// Analyze one frame and return the events that passed stabilization
    fn analyze(&mut self, frame: &Frame, now: Instant) -> Result<Vec<SinkEvent>>;

    fn stats(&self) -> AnalyzerStats;
}

/// Result of one scheduled analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledRun {
    pub analyzer: String,
    pub events: Vec<SinkEvent>,
    pub failed: bool,
}

/// Runs at most one registered analyzer per frame, round-robin.
///
/// Analyzers not picked for a frame simply skip it; nothing is queued.
#[derive(Default)]
pub struct AnalysisScheduler {
    analyzers: Vec<Box<dyn FrameAnalyzer>>,
    next: usize,
}

impl AnalysisScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an analyzer (builder style)
    pub fn add_analyzer(mut self, analyzer: Box<dyn FrameAnalyzer>) -> Self {
        self.register(analyzer);
        self
    }

    pub fn register(&mut self, analyzer: Box<dyn FrameAnalyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run the next analyzer in turn against `frame`.
    /// Analyzer errors are logged and yield no events.
    pub fn run_frame(&mut self, frame: &Frame, now: Instant) -> Option<ScheduledRun> {
        if self.analyzers.is_empty() {
            return None;
        }

        let idx = self.next;
        self.next = (self.next + 1) % self.analyzers.len();
        let analyzer = &mut self.analyzers[idx];

        match analyzer.analyze(frame, now) {
            Ok(events) => Some(ScheduledRun {
                analyzer: analyzer.name().to_string(),
                events,
                failed: false,
            }),
            Err(e) => {
                log::warn!("{} failed on frame {}: {:#}", analyzer.name(), frame.index, e);
                Some(ScheduledRun {
                    analyzer: analyzer.name().to_string(),
                    events: Vec::new(),
                    failed: true,
                })
            }
        }
    }

    pub fn stats(&self) -> Vec<(String, AnalyzerStats)> {
        self.analyzers
            .iter()
            .map(|a| (a.name().to_string(), a.stats()))
            .collect()
    }
}
