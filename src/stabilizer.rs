//! Cooldown gate that turns jittery per-frame detections into a sparse event stream.
//!
//! Each identity is independently idle or cooling down. On top of that, a
//! global last-announced check decides whether an emission is worth a
//! human-readable line.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::models::{MarkerIdentity, MarkerObservation, Point};
use crate::sink::{distance_steps, SinkEvent};
use crate::spatial::ClockDirection;

/// One qualifying detection offered to the stabilizer
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting<K> {
    pub identity: K,
    pub position: Point,
    pub distance_m: f32,
    pub angle: f32,
    pub direction: ClockDirection,
    /// Only markers carry a ring count
    pub inner_ring_count: Option<usize>,
}

impl From<MarkerObservation> for Sighting<MarkerIdentity> {
    fn from(observation: MarkerObservation) -> Self {
        Self {
            identity: observation.identity,
            position: observation.position,
            distance_m: observation.distance_m,
            angle: observation.angle,
            direction: observation.direction,
            inner_ring_count: Some(observation.inner_ring_count),
        }
    }
}

/// A sighting that passed the cooldown gate
#[derive(Debug, Clone, PartialEq)]
pub struct StableEvent<K> {
    pub sighting: Sighting<K>,
    /// Identity changed, or the previous frame emitted nothing
    pub announce: bool,
}

impl<K: Display> StableEvent<K> {
    pub fn to_sink_event(&self) -> SinkEvent {
        SinkEvent {
            identity: self.sighting.identity.to_string(),
            distance_steps: distance_steps(self.sighting.distance_m),
            direction: self.sighting.direction.to_string(),
        }
    }

    /// Human-readable announcement line
    pub fn describe(&self) -> String {
        let s = &self.sighting;
        format!(
            "{} at ({}, {}), Distance: {:.2}m, {} steps, Angle: {:.2} degrees, Direction: {}",
            s.identity,
            s.position.x.round(),
            s.position.y.round(),
            s.distance_m,
            distance_steps(s.distance_m),
            s.angle,
            s.direction
        )
    }
}

/// Cross-frame state owned by one stabilizer user. Never reset during a run.
#[derive(Debug, Clone)]
pub struct DetectionState<K> {
    last_emitted: HashMap<K, Instant>,
    previous_identity: Option<K>,
    previous_frame_had_emission: bool,
    frames_processed: u64,
    frames_with_detection: u64,
}

impl<K> Default for DetectionState<K> {
    fn default() -> Self {
        Self {
            last_emitted: HashMap::new(),
            previous_identity: None,
            previous_frame_had_emission: false,
            frames_processed: 0,
            frames_with_detection: 0,
        }
    }
}

impl<K: Eq + Hash> DetectionState<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_emitted(&self, identity: &K) -> Option<Instant> {
        self.last_emitted.get(identity).copied()
    }

    pub fn previous_identity(&self) -> Option<&K> {
        self.previous_identity.as_ref()
    }

    pub fn previous_frame_had_emission(&self) -> bool {
        self.previous_frame_had_emission
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Frames that produced at least one emission
    pub fn frames_with_detection(&self) -> u64 {
        self.frames_with_detection
    }

    /// Share of processed frames that produced an emission
    pub fn detection_rate(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        self.frames_with_detection as f64 / self.frames_processed as f64
    }
}

/// Longest cooldown accepted from configuration (one day)
pub const MAX_COOLDOWN_SECS: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerParams {
    /// Minimum seconds between two events for the same identity
    pub cooldown_secs: f64,
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self { cooldown_secs: 10.0 }
    }
}

/// Per-identity cooldown gate
#[derive(Debug, Clone)]
pub struct Stabilizer {
    cooldown: Duration,
}

impl Stabilizer {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    /// Negative cooldowns act as zero. Values a `Duration` cannot hold fall
    /// back to `MAX_COOLDOWN_SECS`.
    pub fn from_params(params: &StabilizerParams) -> Self {
        let cooldown = Duration::try_from_secs_f64(params.cooldown_secs.max(0.0)).unwrap_or_else(|e| {
            log::warn!(
                "Cooldown {}s is not representable ({}), using {}s",
                params.cooldown_secs,
                e,
                MAX_COOLDOWN_SECS
            );
            Duration::from_secs_f64(MAX_COOLDOWN_SECS)
        });
        Self::new(cooldown)
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Process one frame with at most one sighting
    pub fn observe<K: Eq + Hash + Clone>(
        &self,
        state: &mut DetectionState<K>,
        sighting: Option<Sighting<K>>,
        now: Instant,
    ) -> Option<StableEvent<K>> {
        self.observe_all(state, sighting, now).into_iter().next()
    }

    /// Process one frame with any number of sightings, in order
    pub fn observe_all<K, I>(&self, state: &mut DetectionState<K>, sightings: I, now: Instant) -> Vec<StableEvent<K>>
    where
        K: Eq + Hash + Clone,
        I: IntoIterator<Item = Sighting<K>>,
    {
        state.frames_processed += 1;

        let events: Vec<StableEvent<K>> = sightings
            .into_iter()
            .filter_map(|sighting| self.admit(state, sighting, now))
            .collect();

        if !events.is_empty() {
            state.frames_with_detection += 1;
        }
        events
    }

    fn admit<K: Eq + Hash + Clone>(
        &self,
        state: &mut DetectionState<K>,
        sighting: Sighting<K>,
        now: Instant,
    ) -> Option<StableEvent<K>> {
        let ready = match state.last_emitted.get(&sighting.identity) {
            None => true,
            Some(&last) => now.saturating_duration_since(last) > self.cooldown,
        };

        if !ready {
            state.previous_frame_had_emission = false;
            return None;
        }

        let announce = !state.previous_frame_had_emission
            || state.previous_identity.as_ref() != Some(&sighting.identity);

        state.last_emitted.insert(sighting.identity.clone(), now);
        state.previous_identity = Some(sighting.identity.clone());
        state.previous_frame_had_emission = true;

        Some(StableEvent { sighting, announce })
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::from_params(&StabilizerParams::default())
    }
}
