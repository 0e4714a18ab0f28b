//! Monotone piecewise-cubic interpolation.
//!
//! Fritsch-Carlson (PCHIP) slopes: the curve never overshoots its control
//! points, so a warp anchored at `(0, 0)` and `(1, 1)` stays inside the
//! unit square between knots of monotone data.

/// A single control point on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlPoint {
    /// X coordinate (input value).
    pub x: f32,
    /// Y coordinate (output value).
    pub y: f32,
}

impl ControlPoint {
    /// Create a new control point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Cubic Hermite curve through a set of control points.
#[derive(Debug, Clone)]
pub struct MonotoneCubic {
    points: Vec<ControlPoint>,
    slopes: Vec<f32>,
}

impl MonotoneCubic {
    /// Fits a curve through `points`.
    ///
    /// Returns `None` unless there are at least two points with strictly
    /// increasing `x`.
    pub fn new(points: Vec<ControlPoint>) -> Option<Self> {
        if points.len() < 2 || points.windows(2).any(|w| w[1].x <= w[0].x) {
            return None;
        }
        let slopes = estimate_slopes(&points);
        Some(Self { points, slopes })
    }

    /// Evaluates the curve. Inputs outside the knot range are clamped to it.
    pub fn eval(&self, x: f32) -> f32 {
        let n = self.points.len();
        let first = self.points[0];
        let last = self.points[n - 1];
        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }

        // Segment k with points[k].x <= x < points[k+1].x
        let k = self.points.partition_point(|p| p.x <= x) - 1;
        let p0 = self.points[k];
        let p1 = self.points[k + 1];
        let h = p1.x - p0.x;
        let t = (x - p0.x) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * p0.y + h10 * h * self.slopes[k] + h01 * p1.y + h11 * h * self.slopes[k + 1]
    }
}

/// Knot slopes: weighted harmonic mean of neighbouring secants inside,
/// shape-preserving three-point estimate at the ends.
fn estimate_slopes(points: &[ControlPoint]) -> Vec<f32> {
    let n = points.len();
    let h: Vec<f32> = points.windows(2).map(|w| w[1].x - w[0].x).collect();
    let d: Vec<f32> = points
        .windows(2)
        .zip(&h)
        .map(|(w, &hk)| (w[1].y - w[0].y) / hk)
        .collect();

    if n == 2 {
        return vec![d[0], d[0]];
    }

    let mut m = vec![0.0f32; n];
    for k in 1..n - 1 {
        let (d0, d1) = (d[k - 1], d[k]);
        if d0 * d1 <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        m[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
    }
    m[0] = end_slope(h[0], h[1], d[0], d[1]);
    m[n - 1] = end_slope(h[n - 2], h[n - 3], d[n - 2], d[n - 3]);
    m
}

fn end_slope(h0: f32, h1: f32, d0: f32, d1: f32) -> f32 {
    let m = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if m.signum() != d0.signum() || d0 == 0.0 {
        0.0
    } else if d0.signum() != d1.signum() && m.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn curve(pts: &[(f32, f32)]) -> MonotoneCubic {
        MonotoneCubic::new(pts.iter().map(|&(x, y)| ControlPoint::new(x, y)).collect()).unwrap()
    }

    #[test]
    fn test_passes_through_points() {
        let c = curve(&[(0.0, 0.0), (0.3, 0.5), (1.0, 1.0)]);
        assert_abs_diff_eq!(c.eval(0.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(c.eval(0.3), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(c.eval(1.0), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_linear_data_stays_linear() {
        let c = curve(&[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)]);
        for i in 0..=10 {
            let x = i as f32 / 10.0;
            assert_abs_diff_eq!(c.eval(x), x, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_monotone_without_overshoot() {
        let c = curve(&[(0.0, 0.0), (0.15, 0.25), (1.0, 1.0)]);
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = c.eval(i as f32 / 100.0);
            assert!(v >= prev - 1e-6);
            assert!((0.0..=1.0 + 1e-6).contains(&v));
            prev = v;
        }
    }

    #[test]
    fn test_clamps_outside_knots() {
        let c = curve(&[(0.0, 0.0), (0.5, 0.7), (1.0, 1.0)]);
        assert_eq!(c.eval(-0.5), 0.0);
        assert_eq!(c.eval(1.5), 1.0);
    }

    #[test]
    fn test_rejects_unsorted() {
        let pts = vec![ControlPoint::new(0.5, 0.0), ControlPoint::new(0.5, 1.0)];
        assert!(MonotoneCubic::new(pts).is_none());
        assert!(MonotoneCubic::new(vec![ControlPoint::default()]).is_none());
    }
}
