//! Soft range selection over a scalar field.
//!
//! A [`RangeSelector`] produces a trapezoid-shaped mask: 1 inside
//! `[low, high]`, 0 beyond the feather zones, and a smoothstep ramp in
//! between. The field may be linear (channel intensity, luminance) or
//! circular (hue, wrapping at 1.0).
//!
//! When `low > high` on a circular domain the selected arc wraps through 0,
//! so `low = 0.9, high = 0.1` selects reds on both sides of the seam.
//!
//! # Example
//!
//! ```rust
//! use pixblend_ops::range::{Domain, RangeSelector};
//!
//! let sel = RangeSelector::new(0.4, 0.6, 0.1, 0.1);
//! assert_eq!(sel.value(0.5, Domain::Linear), 1.0);
//! assert_eq!(sel.value(0.8, Domain::Linear), 0.0);
//! assert!((sel.value(0.35, Domain::Linear) - 0.5).abs() < 1e-6);
//! ```

use pixblend_core::{clamp01, Mask, PixelBuffer};
use tracing::trace;

use crate::parallel::map_pixels;
use crate::OpsResult;

/// Cubic Hermite smoothstep `3t^2 - 2t^3` with `t` clamped to `[0, 1]`.
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = clamp01(t);
    t * t * (3.0 - 2.0 * t)
}

/// Smoothstep between two edges: 0 at or below `edge0`, 1 at or above
/// `edge1`. Coincident edges give a hard step at `edge1`.
#[inline]
pub fn smoothstep_ramp(edge0: f32, edge1: f32, x: f32) -> f32 {
    if x >= edge1 {
        1.0
    } else if x <= edge0 {
        0.0
    } else {
        smoothstep((x - edge0) / (edge1 - edge0))
    }
}

/// Topology of the scalar field being selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Domain {
    /// Open interval; feathers never wrap.
    #[default]
    Linear,
    /// Unit circle; distances are taken modulo 1.
    Circular,
}

/// Bounds and feather widths of a soft selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSelector {
    /// Lower bound of the fully selected range.
    pub low: f32,
    /// Upper bound of the fully selected range.
    pub high: f32,
    /// Width of the rising ramp below `low`.
    pub low_feather: f32,
    /// Width of the falling ramp above `high`.
    pub high_feather: f32,
}

impl RangeSelector {
    /// Creates a selector on a normalized field.
    pub fn new(low: f32, high: f32, low_feather: f32, high_feather: f32) -> Self {
        Self {
            low,
            high,
            low_feather,
            high_feather,
        }
    }

    /// Creates a hue selector from angles in degrees.
    pub fn from_degrees(low: f32, high: f32, low_feather: f32, high_feather: f32) -> Self {
        Self::new(low / 360.0, high / 360.0, low_feather / 360.0, high_feather / 360.0)
    }

    /// True when `x` lies in the fully selected range.
    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        if self.low <= self.high {
            x >= self.low && x <= self.high
        } else {
            x >= self.low || x <= self.high
        }
    }

    /// Mask value in `[0, 1]` at `x`.
    #[inline]
    pub fn value(&self, x: f32, domain: Domain) -> f32 {
        if self.contains(x) {
            return 1.0;
        }
        let rise = feather(self.low - x, self.low_feather, domain);
        let fall = feather(x - self.high, self.high_feather, domain);
        rise.max(fall)
    }
}

/// Ramp value at distance `d` outside an edge, for a feather of `width`.
#[inline]
fn feather(d: f32, width: f32, domain: Domain) -> f32 {
    let d = match domain {
        Domain::Linear => d,
        Domain::Circular => d.rem_euclid(1.0),
    };
    if width <= 0.0 || d <= 0.0 || d >= width {
        0.0
    } else {
        smoothstep(1.0 - d / width)
    }
}

/// Evaluates `selector` over every value of a scalar field.
pub fn range_mask(field: &Mask, selector: &RangeSelector, domain: Domain) -> OpsResult<Mask> {
    trace!(
        batch = field.batch(),
        height = field.height(),
        width = field.width(),
        ?domain,
        "range::range_mask"
    );
    let data = map_pixels(field.data(), 1, 1, |_, src, dst| {
        dst[0] = selector.value(src[0], domain);
    });
    Ok(Mask::from_data(field.batch(), field.height(), field.width(), data)?)
}

/// Hue selection of one `[H, S, V]` pixel. Achromatic pixels score 0.
#[inline]
pub fn hue_selection(hsv: [f32; 3], selector: &RangeSelector) -> f32 {
    if hsv[1] > 0.0 {
        selector.value(hsv[0], Domain::Circular)
    } else {
        0.0
    }
}

/// Hue selection over an HSV buffer (`[H, S, V]` channel order).
///
/// Hue is treated as circular. Achromatic pixels (`S == 0`) are never
/// selected.
pub fn hue_range_mask(hsv: &PixelBuffer, selector: &RangeSelector) -> OpsResult<Mask> {
    let (batch, height, width, channels) = hsv.shape();
    trace!(batch, height, width, "range::hue_range_mask");
    let data = map_pixels(hsv.data(), channels, 1, |_, src, dst| {
        dst[0] = hue_selection([src[0], src[1], src[2]], selector);
    });
    Ok(Mask::from_data(batch, height, width, data)?)
}
