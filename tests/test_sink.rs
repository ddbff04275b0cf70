mod common;

use anyhow::Result;
use ringmark::sink::distance_steps;
use ringmark::JsonLinesSink;

use common::*;

#[test]
fn steps_round_to_nearest() {
    assert_eq!(distance_steps(0.0), 0);
    assert_eq!(distance_steps(1.0), 1);
    assert_eq!(distance_steps(2.0), 3);
    assert_eq!(distance_steps(4.9), 6);
}

#[test]
fn json_lines_use_camel_case() -> Result<()> {
    let mut sink = JsonLinesSink::new(Vec::new());
    sink.deliver(&event("Desk"))?;
    sink.deliver(&SinkEvent {
        identity: "Unknown marker".to_string(),
        distance_steps: 5,
        direction: "9 o'clock".to_string(),
    })?;

    let text = String::from_utf8(sink.into_inner())?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        r#"{"identity":"Desk","distanceSteps":3,"direction":"12 o'clock"}"#
    );

    let parsed: SinkEvent = serde_json::from_str(lines[1])?;
    assert_eq!(parsed.identity, "Unknown marker");
    assert_eq!(parsed.distance_steps, 5);
    Ok(())
}

#[test]
fn recording_sink_reports_failures() {
    let mut sink = RecordingSink::failing();
    assert!(sink.deliver(&event("Desk")).is_err());
    assert!(sink.delivered().is_empty());
}
