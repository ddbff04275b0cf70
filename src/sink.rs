use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// Walking steps per meter used when reporting distances
pub const STEPS_PER_METER: f32 = 1.31;

/// Convert a distance to whole walking steps
pub fn distance_steps(distance_m: f32) -> u32 {
    (distance_m * STEPS_PER_METER).round().max(0.0) as u32
}

/// Payload delivered to downstream consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkEvent {
    pub identity: String,
    pub distance_steps: u32,
    pub direction: String,
}

/// Receiver of stabilized events. Failures are reported, never panicked on.
pub trait EventSink: Send {
    fn deliver(&mut self, event: &SinkEvent) -> Result<(), SinkError>;
}

/// Writes each event to the log at info level
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&mut self, event: &SinkEvent) -> Result<(), SinkError> {
        log::info!(
            "Event: {} at {} steps, {}",
            event.identity,
            event.distance_steps,
            event.direction
        );
        Ok(())
    }
}

/// Writes one JSON object per line, flushing after every event
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn deliver(&mut self, event: &SinkEvent) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
