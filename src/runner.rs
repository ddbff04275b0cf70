use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::analysis::{AnalysisScheduler, AnalyzerStats};
use crate::frame::{FramePoll, FrameSource};
use crate::sink::EventSink;

/// Counters for one run of the frame loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames_polled: u64,
    pub frames_analyzed: u64,
    /// Cycles where the source had nothing usable
    pub frames_skipped: u64,
    pub events_emitted: u64,
    pub sink_failures: u64,
    pub analyzers: Vec<(String, AnalyzerStats)>,
}

/// Frame-synchronous loop: source → scheduler → sink
pub struct Runner {
    source: Box<dyn FrameSource>,
    scheduler: AnalysisScheduler,
    sink: Box<dyn EventSink>,
    stop: Arc<AtomicBool>,
    max_frames: Option<u64>,
}

impl Runner {
    pub fn new(source: Box<dyn FrameSource>, scheduler: AnalysisScheduler, sink: Box<dyn EventSink>) -> Self {
        Self {
            source,
            scheduler,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
            max_frames: None,
        }
    }

    /// Stop after this many analyzed frames
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Flag checked at every frame boundary; setting it ends the run
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            if self.stop.load(Ordering::Relaxed) {
                log::info!("Stop requested, ending run");
                break;
            }
            if self.max_frames.is_some_and(|max| summary.frames_analyzed >= max) {
                break;
            }

            summary.frames_polled += 1;
            let frame = match self.source.next_frame() {
                FramePoll::Ready(frame) => frame,
                FramePoll::NotReady => {
                    summary.frames_skipped += 1;
                    std::thread::yield_now();
                    continue;
                }
                FramePoll::Finished => {
                    summary.frames_polled -= 1;
                    break;
                }
            };

            let Some(run) = self.scheduler.run_frame(&frame, Instant::now()) else {
                continue;
            };
            summary.frames_analyzed += 1;

            for event in &run.events {
                summary.events_emitted += 1;
                if let Err(e) = self.sink.deliver(event) {
                    summary.sink_failures += 1;
                    log::warn!("Failed to deliver {} event: {}", event.identity, e);
                }
            }
        }

        summary.analyzers = self.scheduler.stats();
        summary
    }
}
