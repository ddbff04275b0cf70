use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::detection::contours;
use crate::detection::ellipse::{EllipseFitter, MIN_FIT_POINTS};
use crate::models::{Circle, CircleCandidate, CircularShape, Point, RawContour};

/// Shape filters applied to every traced contour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParams {
    pub min_area: f32,
    pub min_perimeter: f32,
    /// Contours must be strictly rounder than this (4π·area/perimeter²)
    pub min_circularity: f32,
    pub min_minor_axis: f32,
    pub min_major_axis: f32,
    pub min_axis_ratio: f32,
    pub max_axis_ratio: f32,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            min_area: 350.0,
            min_perimeter: 70.0,
            min_circularity: 0.7,
            min_minor_axis: 10.0,
            min_major_axis: 50.0,
            min_axis_ratio: 0.8,
            max_axis_ratio: 1.2,
        }
    }
}

/// Tolerances for treating two circles as the same physical ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupParams {
    /// Maximum center distance in pixels
    pub center_tolerance: f32,
    /// Maximum mean-axis difference as a fraction of the first circle's mean axis
    pub size_tolerance: f32,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            center_tolerance: 15.0,
            size_tolerance: 0.15,
        }
    }
}

/// Filter contours down to near-circular ellipse candidates.
///
/// Fit failures only drop the offending contour.
pub fn extract_candidates(
    contours: &[RawContour],
    fitter: &dyn EllipseFitter,
    params: &ExtractionParams,
) -> Vec<CircleCandidate> {
    let mut candidates = Vec::new();

    for (idx, contour) in contours.iter().enumerate() {
        let perimeter = contour.perimeter();
        if perimeter == 0.0 {
            continue;
        }

        let area = contour.area();
        if area < params.min_area || perimeter < params.min_perimeter {
            continue;
        }

        let circularity = 4.0 * std::f32::consts::PI * area / (perimeter * perimeter);
        if circularity <= params.min_circularity {
            continue;
        }

        let ellipse = match fitter.fit(&contour.points) {
            Ok(ellipse) => ellipse,
            Err(e) => {
                log::debug!("Contour {}: ellipse fit failed: {}", idx, e);
                continue;
            }
        };

        if ellipse.minor_axis < params.min_minor_axis || ellipse.major_axis < params.min_major_axis {
            continue;
        }

        let ratio = ellipse.axis_ratio();
        if ratio < params.min_axis_ratio || ratio > params.max_axis_ratio {
            continue;
        }

        candidates.push(CircleCandidate::from_ellipse(ellipse, contour.clone(), area, perimeter));
    }

    candidates
}

/// Whether `a` duplicates `b`: centers within tolerance and mean axes
/// differing by less than the size tolerance relative to `a`.
pub fn is_duplicate<A: CircularShape, B: CircularShape>(a: &A, b: &B, params: &DedupParams) -> bool {
    if a.center().distance(b.center()) > params.center_tolerance {
        return false;
    }

    let size_a = a.mean_axis();
    let size_b = b.mean_axis();
    if size_a <= 0.0 {
        return size_b <= 0.0;
    }
    (size_a - size_b).abs() / size_a < params.size_tolerance
}

/// Drop every item that duplicates an earlier accepted one. First seen wins.
pub fn dedup<T: CircularShape + Clone>(items: &[T], params: &DedupParams) -> Vec<T> {
    let mut accepted: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !accepted.iter().any(|existing| is_duplicate(item, existing, params)) {
            accepted.push(item.clone());
        }
    }
    accepted
}

/// Small-circle detection primitive used inside a marker's region of interest
pub trait CircleDetector: Send + Sync {
    /// Circles found in `roi`, in ROI-local coordinates
    fn detect_circles(&self, roi: &GrayImage) -> Vec<Circle>;
}

/// Tunables for the inner-circle search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerCircleParams {
    pub min_radius: f32,
    pub max_radius: f32,
    /// Minimum spacing between accepted circle centers
    pub min_center_distance: f32,
    /// Maximum radial standard deviation as a fraction of the mean radius
    pub max_radial_spread: f32,
}

impl Default for InnerCircleParams {
    fn default() -> Self {
        Self {
            min_radius: 5.0,
            max_radius: 30.0,
            min_center_distance: 10.0,
            max_radial_spread: 0.25,
        }
    }
}

/// Finds small round blobs by tracing outer borders in the ROI.
#[derive(Debug, Clone, Default)]
pub struct ContourCircleDetector {
    params: InnerCircleParams,
}

impl ContourCircleDetector {
    pub fn new(params: InnerCircleParams) -> Self {
        Self { params }
    }

    fn circle_from_contour(&self, contour: &RawContour) -> Option<Circle> {
        if contour.is_hole || contour.points.len() < MIN_FIT_POINTS {
            return None;
        }

        let n = contour.points.len() as f32;
        let center = Point::new(
            contour.points.iter().map(|p| p.x).sum::<f32>() / n,
            contour.points.iter().map(|p| p.y).sum::<f32>() / n,
        );
        let radii: Vec<f32> = contour.points.iter().map(|p| p.distance(center)).collect();
        let mean = radii.iter().sum::<f32>() / n;
        if mean < self.params.min_radius || mean > self.params.max_radius {
            return None;
        }

        let variance = radii.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / n;
        if variance.sqrt() / mean > self.params.max_radial_spread {
            return None;
        }

        Some(Circle { center, radius: mean })
    }
}

impl CircleDetector for ContourCircleDetector {
    fn detect_circles(&self, roi: &GrayImage) -> Vec<Circle> {
        let mut circles: Vec<Circle> = Vec::new();
        for contour in contours::find_contours(roi) {
            let Some(circle) = self.circle_from_contour(&contour) else {
                continue;
            };
            let too_close = circles
                .iter()
                .any(|c| c.center.distance(circle.center) < self.params.min_center_distance);
            if !too_close {
                circles.push(circle);
            }
        }
        circles
    }
}
