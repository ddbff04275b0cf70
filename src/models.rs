use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spatial::ClockDirection;

/// Point in image coordinates (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned box in the original image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Build a box from a floating extent, clipped to `[0, width) x [0, height)`.
    /// Coordinates are truncated toward zero, like integer pixel slicing.
    pub fn clipped(x0: f32, y0: f32, x1: f32, y1: f32, width: u32, height: u32) -> Self {
        let clamp = |v: f32, max: u32| v.max(0.0).min(max as f32) as u32;
        let (start_x, end_x) = (clamp(x0, width), clamp(x1, width));
        let (start_y, end_y) = (clamp(y0, height), clamp(y1, height));
        Self {
            x: start_x,
            y: start_y,
            width: end_x.saturating_sub(start_x),
            height: end_y.saturating_sub(start_y),
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Ordered border points of one traced contour, with its containment parent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawContour {
    pub points: Vec<Point>,
    /// Index of the immediately enclosing contour, `None` for a topmost border
    pub parent: Option<usize>,
    /// Whether this border encloses a hole rather than a foreground region
    pub is_hole: bool,
}

impl RawContour {
    pub fn new(points: Vec<Point>, parent: Option<usize>) -> Self {
        Self {
            points,
            parent,
            is_hole: false,
        }
    }

    /// Enclosed area of the closed polygon (shoelace formula)
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut twice_area = 0.0f64;
        for (i, p) in self.points.iter().enumerate() {
            let q = self.points[(i + 1) % self.points.len()];
            twice_area += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
        }
        (twice_area.abs() / 2.0) as f32
    }

    /// Length of the closed polyline through all points
    pub fn perimeter(&self) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| p.distance(self.points[(i + 1) % self.points.len()]))
            .sum()
    }

    /// Circularity = 4π × area / perimeter², 1.0 for a perfect circle
    pub fn circularity(&self) -> f32 {
        let perimeter = self.perimeter();
        if perimeter == 0.0 {
            return 0.0;
        }
        4.0 * std::f32::consts::PI * self.area() / (perimeter * perimeter)
    }
}

/// Best-fit ellipse. Axis lengths are full diameters, `major_axis >= minor_axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub center: Point,
    pub major_axis: f32,
    pub minor_axis: f32,
    /// Orientation of the major axis in degrees, counter-clockwise from +x
    pub angle: f32,
}

impl Ellipse {
    pub fn axis_ratio(&self) -> f32 {
        if self.major_axis == 0.0 {
            return 0.0;
        }
        self.minor_axis / self.major_axis
    }

    /// Half extents of the axis-aligned box enclosing the rotated ellipse
    pub fn half_extents(&self) -> (f32, f32) {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let a = self.major_axis / 2.0;
        let b = self.minor_axis / 2.0;
        (
            ((a * cos).powi(2) + (b * sin).powi(2)).sqrt(),
            ((a * sin).powi(2) + (b * cos).powi(2)).sqrt(),
        )
    }
}

/// Near-circular shape that survived the geometric filters of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleCandidate {
    pub center: Point,
    pub major_axis: f32,
    pub minor_axis: f32,
    pub angle: f32,
    pub contour: RawContour,
    pub parent: Option<usize>,
    pub area: f32,
    pub perimeter: f32,
}

impl CircleCandidate {
    pub fn from_ellipse(ellipse: Ellipse, contour: RawContour, area: f32, perimeter: f32) -> Self {
        Self {
            center: ellipse.center,
            major_axis: ellipse.major_axis,
            minor_axis: ellipse.minor_axis,
            angle: ellipse.angle,
            parent: contour.parent,
            contour,
            area,
            perimeter,
        }
    }

    pub fn ellipse(&self) -> Ellipse {
        Ellipse {
            center: self.center,
            major_axis: self.major_axis,
            minor_axis: self.minor_axis,
            angle: self.angle,
        }
    }

    /// Projected area proxy used to rank candidates
    pub fn projected_area(&self) -> f32 {
        self.major_axis * self.minor_axis
    }

    /// Bounding box of the fitted ellipse, clipped to the image
    pub fn roi(&self, width: u32, height: u32) -> BoundingBox {
        let (half_w, half_h) = self.ellipse().half_extents();
        BoundingBox::clipped(
            self.center.x - half_w,
            self.center.y - half_h,
            self.center.x + half_w,
            self.center.y + half_h,
            width,
            height,
        )
    }
}

/// Small circle returned by the inner-circle detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
}

/// Anything with a center and a representative diameter, for duplicate checks.
pub trait CircularShape {
    fn center(&self) -> Point;
    fn mean_axis(&self) -> f32;
}

impl CircularShape for CircleCandidate {
    fn center(&self) -> Point {
        self.center
    }

    fn mean_axis(&self) -> f32 {
        (self.major_axis + self.minor_axis) / 2.0
    }
}

impl CircularShape for Circle {
    fn center(&self) -> Point {
        self.center
    }

    fn mean_axis(&self) -> f32 {
        self.radius * 2.0
    }
}

/// Marker identity resolved through the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerIdentity {
    Known(String),
    Unknown,
}

impl fmt::Display for MarkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerIdentity::Known(name) => f.write_str(name),
            MarkerIdentity::Unknown => f.write_str("Unknown marker"),
        }
    }
}

/// Classified, located marker for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerObservation {
    pub identity: MarkerIdentity,
    pub position: Point,
    pub distance_m: f32,
    pub angle: f32,
    pub direction: ClockDirection,
    pub inner_ring_count: usize,
}
