//! Ellipse fitting for traced contours.

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::error::ShapeFitError;
use crate::models::{Ellipse, Point};

/// Minimum number of points an ellipse fit accepts
pub const MIN_FIT_POINTS: usize = 5;

/// Ellipse fitting primitive
pub trait EllipseFitter: Send + Sync {
    fn fit(&self, points: &[Point]) -> Result<Ellipse, ShapeFitError>;
}

/// Direct least-squares conic fit (Fitzgibbon, Pilu and Fisher), solved in
/// the partitioned form of Halíř and Flusser.
///
/// Minimizes the algebraic distance of every point to the conic under the
/// constraint `4AC − B² = 1`, so the result is always an ellipse and does not
/// depend on how the points are spaced along the border.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectEllipseFitter;

impl EllipseFitter for DirectEllipseFitter {
    fn fit(&self, points: &[Point]) -> Result<Ellipse, ShapeFitError> {
        if points.len() < MIN_FIT_POINTS {
            return Err(ShapeFitError::TooFewPoints {
                points: points.len(),
                required: MIN_FIT_POINTS,
            });
        }

        let frame = Normalization::of(points).ok_or(ShapeFitError::Degenerate)?;

        // Scatter matrix of the design rows [x², xy, y², x, y, 1]
        let mut scatter = Matrix6::<f64>::zeros();
        for p in points {
            let (x, y) = frame.apply(p);
            let row = Vector6::new(x * x, x * y, y * y, x, y, 1.0);
            scatter += row * row.transpose();
        }

        let s1 = scatter.fixed_view::<3, 3>(0, 0).into_owned();
        let s2 = scatter.fixed_view::<3, 3>(0, 3).into_owned();
        let s3 = scatter.fixed_view::<3, 3>(3, 3).into_owned();

        let s3_inv = s3.try_inverse().ok_or(ShapeFitError::Degenerate)?;
        let linear_from_quadratic = -s3_inv * s2.transpose();
        let reduced = s1 + s2 * linear_from_quadratic;

        // Inverse of the constraint matrix [[0, 0, 2], [0, -1, 0], [2, 0, 0]]
        let constraint_inv = Matrix3::new(0.0, 0.0, 0.5, 0.0, -1.0, 0.0, 0.5, 0.0, 0.0);
        let system = constraint_inv * reduced;

        let quadratic = ellipse_eigenvector(&system).ok_or(ShapeFitError::NotAnEllipse)?;
        let linear = linear_from_quadratic * quadratic;

        let conic = [quadratic[0], quadratic[1], quadratic[2], linear[0], linear[1], linear[2]];
        let normalized = conic_to_ellipse(conic).ok_or(ShapeFitError::NotAnEllipse)?;
        frame.restore(normalized).ok_or(ShapeFitError::Degenerate)
    }
}

/// Centering and isotropic scaling that puts the points at RMS distance √2
/// from the origin.
struct Normalization {
    mean_x: f64,
    mean_y: f64,
    scale: f64,
}

impl Normalization {
    /// `None` when the points do not span two dimensions
    fn of(points: &[Point]) -> Option<Self> {
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.x as f64).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.y as f64).sum::<f64>() / n;

        let (mut sxx, mut syy, mut sxy) = (0.0f64, 0.0f64, 0.0f64);
        for p in points {
            let dx = p.x as f64 - mean_x;
            let dy = p.y as f64 - mean_y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        let rms = ((sxx + syy) / n).sqrt();
        if !(rms > 1e-9) {
            return None;
        }

        // Spread along the thinnest direction, relative to the overall spread
        let trace = sxx + syy;
        if (sxx * syy - sxy * sxy) / (trace * trace) < 1e-9 {
            return None;
        }

        Some(Self {
            mean_x,
            mean_y,
            scale: std::f64::consts::SQRT_2 / rms,
        })
    }

    fn apply(&self, p: &Point) -> (f64, f64) {
        (
            (p.x as f64 - self.mean_x) * self.scale,
            (p.y as f64 - self.mean_y) * self.scale,
        )
    }

    fn restore(&self, e: NormalizedEllipse) -> Option<Ellipse> {
        let ellipse = Ellipse {
            center: Point::new(
                (e.cx / self.scale + self.mean_x) as f32,
                (e.cy / self.scale + self.mean_y) as f32,
            ),
            major_axis: (e.major / self.scale) as f32,
            minor_axis: (e.minor / self.scale) as f32,
            angle: e.angle_deg as f32,
        };
        let finite = ellipse.center.x.is_finite()
            && ellipse.center.y.is_finite()
            && ellipse.major_axis.is_finite()
            && ellipse.minor_axis.is_finite();
        (finite && ellipse.minor_axis > 0.0).then_some(ellipse)
    }
}

/// Ellipse in normalized coordinates, full axis lengths
struct NormalizedEllipse {
    cx: f64,
    cy: f64,
    major: f64,
    minor: f64,
    angle_deg: f64,
}

/// Real eigenvector of the reduced system that satisfies `4AC − B² > 0`
fn ellipse_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    system
        .complex_eigenvalues()
        .iter()
        .filter(|ev| ev.im.abs() <= 1e-9 * (1.0 + ev.re.abs()))
        .filter_map(|ev| {
            let shifted = system - Matrix3::identity() * ev.re;
            null_vector(&shifted).map(|v| (ev.re, v))
        })
        .filter(|(_, v)| 4.0 * v[0] * v[2] - v[1] * v[1] > 0.0)
        .min_by(|a, b| a.0.abs().total_cmp(&b.0.abs()))
        .map(|(_, v)| v)
}

/// Null vector of a rank-2 matrix: the largest cross product of two of its rows
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let r0: Vector3<f64> = m.row(0).transpose();
    let r1: Vector3<f64> = m.row(1).transpose();
    let r2: Vector3<f64> = m.row(2).transpose();

    let best = [r0.cross(&r1), r0.cross(&r2), r1.cross(&r2)]
        .into_iter()
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?;
    let norm = best.norm();
    (norm > 1e-15).then(|| best / norm)
}

/// Geometric parameters of `A x² + B xy + C y² + D x + E y + F = 0`
fn conic_to_ellipse(coeffs: [f64; 6]) -> Option<NormalizedEllipse> {
    // Orient so the quadratic part is positive definite
    let sign = if coeffs[0] + coeffs[2] < 0.0 { -1.0 } else { 1.0 };
    let [a, b, c, d, e, f] = coeffs.map(|v| v * sign);

    let denom = 4.0 * a * c - b * b;
    if !(denom > 0.0) {
        return None;
    }
    let cx = (b * e - 2.0 * c * d) / denom;
    let cy = (b * d - 2.0 * a * e) / denom;

    // Conic value at the center
    let f0 = f + (d * cx + e * cy) / 2.0;
    if !(f0 < 0.0) {
        return None;
    }

    let half_trace = (a + c) / 2.0;
    let radius = (((a - c) / 2.0).powi(2) + (b / 2.0).powi(2)).sqrt();
    let lambda_max = half_trace + radius;
    let lambda_min = half_trace - radius;
    if !(lambda_min > 0.0) {
        return None;
    }

    // The largest eigenvalue points along the minor axis
    let minor_dir = 0.5 * b.atan2(a - c);
    let mut angle_deg = (minor_dir + std::f64::consts::FRAC_PI_2).to_degrees();
    while angle_deg > 90.0 {
        angle_deg -= 180.0;
    }
    while angle_deg <= -90.0 {
        angle_deg += 180.0;
    }

    Some(NormalizedEllipse {
        cx,
        cy,
        major: 2.0 * (-f0 / lambda_min).sqrt(),
        minor: 2.0 * (-f0 / lambda_max).sqrt(),
        angle_deg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ellipse_points(cx: f32, cy: f32, a: f32, b: f32, angle_deg: f32, ts: &[f32]) -> Vec<Point> {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        ts.iter()
            .map(|t| {
                let (x, y) = (a * t.cos(), b * t.sin());
                Point::new(cx + x * cos - y * sin, cy + x * sin + y * cos)
            })
            .collect()
    }

    fn even(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 / n as f32 * std::f32::consts::TAU).collect()
    }

    #[test]
    fn fits_axis_aligned_ellipse() {
        let fit = DirectEllipseFitter
            .fit(&ellipse_points(100.0, 80.0, 60.0, 40.0, 0.0, &even(360)))
            .unwrap();
        assert_relative_eq!(fit.center.x, 100.0, epsilon = 1e-2);
        assert_relative_eq!(fit.center.y, 80.0, epsilon = 1e-2);
        assert_relative_eq!(fit.major_axis, 120.0, epsilon = 0.05);
        assert_relative_eq!(fit.minor_axis, 80.0, epsilon = 0.05);
        assert_relative_eq!(fit.angle, 0.0, epsilon = 0.1);
    }

    #[test]
    fn fits_rotated_ellipse() {
        let fit = DirectEllipseFitter
            .fit(&ellipse_points(200.0, 150.0, 50.0, 30.0, 30.0, &even(200)))
            .unwrap();
        assert_relative_eq!(fit.major_axis, 100.0, epsilon = 0.05);
        assert_relative_eq!(fit.minor_axis, 60.0, epsilon = 0.05);
        assert_relative_eq!(fit.angle, 30.0, epsilon = 0.1);
    }

    #[test]
    fn uneven_sampling_does_not_bias_axes() {
        // Dense near the ends of the major axis, sparse along its flanks
        let ts: Vec<f32> = (0..120)
            .map(|i| {
                let u = i as f32 / 120.0 * std::f32::consts::TAU;
                u + 0.4 * (2.0 * u).sin()
            })
            .collect();
        let fit = DirectEllipseFitter
            .fit(&ellipse_points(0.0, 0.0, 60.0, 45.0, 0.0, &ts))
            .unwrap();
        assert_relative_eq!(fit.axis_ratio(), 0.75, epsilon = 1e-3);
    }

    #[test]
    fn rejects_short_contours() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)];
        assert_eq!(
            DirectEllipseFitter.fit(&points),
            Err(ShapeFitError::TooFewPoints { points: 3, required: MIN_FIT_POINTS })
        );
    }

    #[test]
    fn rejects_collinear_points() {
        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f32, 2.0 * i as f32)).collect();
        assert_eq!(DirectEllipseFitter.fit(&points), Err(ShapeFitError::Degenerate));
    }
}
