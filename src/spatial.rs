use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::DepthQuery;
use crate::models::Point;

/// Angular position expressed as a clock hour, 12 o'clock straight ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockDirection {
    Nine,
    Ten,
    Eleven,
    Twelve,
    One,
    Two,
    Three,
    Unknown,
}

impl ClockDirection {
    /// Bucket a deviation angle in degrees (negative = left).
    ///
    /// `[-90,-75)` → 9, `[-75,-45)` → 10, `[-45,-15)` → 11, `[-15,15]` → 12,
    /// `(15,45]` → 1, `(45,75]` → 2, `(75,90]` → 3, anything else (including NaN) → Unknown.
    pub fn from_angle(angle: f32) -> Self {
        match angle {
            a if (-90.0..-75.0).contains(&a) => ClockDirection::Nine,
            a if (-75.0..-45.0).contains(&a) => ClockDirection::Ten,
            a if (-45.0..-15.0).contains(&a) => ClockDirection::Eleven,
            a if (-15.0..=15.0).contains(&a) => ClockDirection::Twelve,
            a if a > 15.0 && a <= 45.0 => ClockDirection::One,
            a if a > 45.0 && a <= 75.0 => ClockDirection::Two,
            a if a > 75.0 && a <= 90.0 => ClockDirection::Three,
            _ => ClockDirection::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClockDirection::Nine => "9 o'clock",
            ClockDirection::Ten => "10 o'clock",
            ClockDirection::Eleven => "11 o'clock",
            ClockDirection::Twelve => "12 o'clock",
            ClockDirection::One => "1 o'clock",
            ClockDirection::Two => "2 o'clock",
            ClockDirection::Three => "3 o'clock",
            ClockDirection::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ClockDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Horizontal deviation from the image center in degrees, within [-90, 90]
/// for any `x` inside the image.
pub fn deviation_angle(width: u32, x: f32) -> f32 {
    let half = width as f32 / 2.0;
    (x - half) / half * 90.0
}

/// Plausible range for a depth reading to count as a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialParams {
    pub min_distance_m: f32,
    pub max_distance_m: f32,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            min_distance_m: 0.0,
            max_distance_m: 5.0,
        }
    }
}

/// Distance and direction of a located pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub distance_m: f32,
    pub angle: f32,
    pub direction: ClockDirection,
}

/// Turns a pixel position plus a depth sample into distance and clock direction.
#[derive(Debug, Clone, Default)]
pub struct SpatialEstimator {
    params: SpatialParams,
}

impl SpatialEstimator {
    pub fn new(params: SpatialParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SpatialParams {
        &self.params
    }

    /// Whether a depth reading passes the gate. 0 means "no reading".
    pub fn accepts(&self, distance_m: f32) -> bool {
        distance_m.is_finite()
            && distance_m > 0.0
            && distance_m >= self.params.min_distance_m
            && distance_m <= self.params.max_distance_m
    }

    /// Locate `position` in a frame `frame_width` pixels wide.
    /// Returns `None` when the depth sample is missing or out of range.
    pub fn locate<D: DepthQuery + ?Sized>(
        &self,
        position: Point,
        depth: &D,
        frame_width: u32,
    ) -> Option<Placement> {
        let distance_m = depth.distance(position.x.max(0.0) as u32, position.y.max(0.0) as u32);
        if !self.accepts(distance_m) {
            log::debug!(
                "Rejected depth {:.2}m at ({:.0}, {:.0})",
                distance_m,
                position.x,
                position.y
            );
            return None;
        }

        let angle = deviation_angle(frame_width, position.x);
        Some(Placement {
            distance_m,
            angle,
            direction: ClockDirection::from_angle(angle),
        })
    }
}
