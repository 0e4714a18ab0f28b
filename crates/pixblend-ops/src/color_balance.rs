//! Color balance: shadow/midtone/highlight shifts along the three
//! complementary axes (cyan-red, magenta-green, yellow-blue).
//!
//! Each RGB channel is warped three times in sequence, once per tonal band.
//! A band warp is the monotone cubic through `(0, 0)`,
//! `(center, center + value * max_adjustment)` and `(1, 1)`, clamped to
//! `[0, 1]`. With `preserve_luminosity` the result is rescaled so its BT.709
//! luminance matches the input's.
//!
//! # Example
//!
//! ```rust
//! use pixblend_core::PixelBuffer;
//! use pixblend_ops::color_balance::{color_balance, ColorBalanceParams, ToneShift};
//!
//! let img = PixelBuffer::filled(1, 1, 1, &[0.5, 0.5, 0.5]).unwrap();
//! let params = ColorBalanceParams {
//!     midtones: ToneShift { cyan_red: 1.0, ..Default::default() },
//!     preserve_luminosity: false,
//!     ..Default::default()
//! };
//! let out = color_balance(&img, &params).unwrap();
//! // Midtone red pushed up by the full midtone radius
//! assert!((out.pixel(0, 0, 0)[0] - 0.8).abs() < 1e-5);
//! ```

use pixblend_core::{clamp01, luminance_rec709, PixelBuffer};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::parallel::map_pixels;
use crate::spline::{ControlPoint, MonotoneCubic};
use crate::{OpsError, OpsResult};

/// Luminance below which preserve-luminosity leaves the pixel unscaled.
const MIN_LUMINANCE: f32 = 1e-6;

/// A shift along the three complementary axes, each in `[-1, 1]`.
///
/// Positive values push toward red, green and blue respectively.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneShift {
    /// Cyan (-) to red (+).
    pub cyan_red: f32,
    /// Magenta (-) to green (+).
    pub magenta_green: f32,
    /// Yellow (-) to blue (+).
    pub yellow_blue: f32,
}

impl ToneShift {
    /// Per-channel values in RGB order.
    #[inline]
    pub fn to_rgb(self) -> [f32; 3] {
        [self.cyan_red, self.magenta_green, self.yellow_blue]
    }

    /// True when no axis is shifted.
    pub fn is_zero(&self) -> bool {
        self.to_rgb().iter().all(|&v| v == 0.0)
    }
}

/// Position and strength of one tonal band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneBand {
    /// Input level the band is anchored at, in `(0, 1)`.
    pub center: f32,
    /// Output displacement at `center` for a slider value of 1.
    pub max_adjustment: f32,
}

impl ToneBand {
    /// Default shadow band.
    pub const SHADOWS: Self = Self::new(0.15, 0.1);
    /// Default midtone band.
    pub const MIDTONES: Self = Self::new(0.5, 0.3);
    /// Default highlight band.
    pub const HIGHLIGHTS: Self = Self::new(0.8, 0.2);

    /// Create a band.
    pub const fn new(center: f32, max_adjustment: f32) -> Self {
        Self {
            center,
            max_adjustment,
        }
    }

    /// Builds the warp curve for slider `value`, or `None` for a zero value.
    fn curve(&self, value: f32) -> OpsResult<Option<MonotoneCubic>> {
        if value == 0.0 {
            return Ok(None);
        }
        let points = vec![
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(self.center, self.center + value * self.max_adjustment),
            ControlPoint::new(1.0, 1.0),
        ];
        MonotoneCubic::new(points).map(Some).ok_or_else(|| {
            OpsError::InvalidParameter(format!(
                "band center must be inside (0, 1), got {}",
                self.center
            ))
        })
    }
}

/// Parameters of the three-band color balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorBalanceParams {
    /// Shift applied in the shadows.
    pub shadows: ToneShift,
    /// Shift applied in the midtones.
    pub midtones: ToneShift,
    /// Shift applied in the highlights.
    pub highlights: ToneShift,
    /// Rescale to keep each pixel's luminance.
    pub preserve_luminosity: bool,
    /// Shadow band placement.
    pub shadow_band: ToneBand,
    /// Midtone band placement.
    pub midtone_band: ToneBand,
    /// Highlight band placement.
    pub highlight_band: ToneBand,
}

impl Default for ColorBalanceParams {
    fn default() -> Self {
        Self {
            shadows: ToneShift::default(),
            midtones: ToneShift::default(),
            highlights: ToneShift::default(),
            preserve_luminosity: true,
            shadow_band: ToneBand::SHADOWS,
            midtone_band: ToneBand::MIDTONES,
            highlight_band: ToneBand::HIGHLIGHTS,
        }
    }
}

impl ColorBalanceParams {
    /// Check if this is identity (no-op).
    pub fn is_identity(&self) -> bool {
        self.shadows.is_zero() && self.midtones.is_zero() && self.highlights.is_zero()
    }
}

/// Midtone-only balance with a movable midtone anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorBalanceAdvancedParams {
    /// Input level the shift is anchored at, `[0.001, 0.999]`.
    pub brightness_target: f32,
    /// Shift applied at the target.
    pub shift: ToneShift,
    /// Rescale to keep each pixel's luminance.
    pub preserve_luminosity: bool,
}

impl Default for ColorBalanceAdvancedParams {
    fn default() -> Self {
        Self {
            brightness_target: 0.5,
            shift: ToneShift::default(),
            preserve_luminosity: true,
        }
    }
}

impl From<&ColorBalanceAdvancedParams> for ColorBalanceParams {
    fn from(p: &ColorBalanceAdvancedParams) -> Self {
        Self {
            midtones: p.shift,
            preserve_luminosity: p.preserve_luminosity,
            midtone_band: ToneBand::new(p.brightness_target, 1.0),
            ..Self::default()
        }
    }
}

/// Applies a three-band color balance.
///
/// # Errors
///
/// Returns [`OpsError::InvalidParameter`] if an active band's center is not
/// strictly inside `(0, 1)`.
pub fn color_balance(image: &PixelBuffer, params: &ColorBalanceParams) -> OpsResult<PixelBuffer> {
    let (batch, height, width, channels) = image.shape();
    trace!(batch, height, width, "color_balance::color_balance");
    debug!(
        shadows = ?params.shadows.to_rgb(),
        midtones = ?params.midtones.to_rgb(),
        highlights = ?params.highlights.to_rgb(),
        preserve_luminosity = params.preserve_luminosity,
        "Applying color balance"
    );

    if params.is_identity() {
        return Ok(image.clone());
    }

    // curves[channel] = [shadow, midtone, highlight] warps
    let mut curves: [[Option<MonotoneCubic>; 3]; 3] = Default::default();
    let bands = [
        (params.shadow_band, params.shadows.to_rgb()),
        (params.midtone_band, params.midtones.to_rgb()),
        (params.highlight_band, params.highlights.to_rgb()),
    ];
    for (c, channel_curves) in curves.iter_mut().enumerate() {
        for (slot, (band, values)) in channel_curves.iter_mut().zip(&bands) {
            *slot = band.curve(values[c])?;
        }
    }

    let preserve = params.preserve_luminosity;
    let data = map_pixels(image.data(), channels, channels, |_, src, dst| {
        let original = [src[0], src[1], src[2]];
        let mut rgb = original;
        for (v, channel_curves) in rgb.iter_mut().zip(&curves) {
            for curve in channel_curves.iter().flatten() {
                *v = clamp01(curve.eval(*v));
            }
        }

        if preserve {
            let current = luminance_rec709(rgb);
            if current.abs() > MIN_LUMINANCE {
                let ratio = luminance_rec709(original) / current;
                for v in &mut rgb {
                    *v = clamp01(*v * ratio);
                }
            }
        }

        dst[..3].copy_from_slice(&rgb);
        if channels == 4 {
            dst[3] = src[3];
        }
    });
    Ok(PixelBuffer::from_data(batch, height, width, channels, data)?)
}

/// Applies the midtone-only variant.
///
/// ```rust
/// use pixblend_core::PixelBuffer;
/// use pixblend_ops::color_balance::{color_balance_advanced, ColorBalanceAdvancedParams};
///
/// let img = PixelBuffer::filled(1, 2, 2, &[0.2, 0.4, 0.6]).unwrap();
/// let out = color_balance_advanced(&img, &ColorBalanceAdvancedParams::default()).unwrap();
/// assert_eq!(out, img);
/// ```
pub fn color_balance_advanced(
    image: &PixelBuffer,
    params: &ColorBalanceAdvancedParams,
) -> OpsResult<PixelBuffer> {
    debug!(target = params.brightness_target, "Color balance around brightness target");
    color_balance(image, &ColorBalanceParams::from(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gradient() -> PixelBuffer {
        let data = (0..16)
            .flat_map(|i| {
                let v = i as f32 / 15.0;
                [v, 1.0 - v, (v * 0.5 + 0.25), 0.7]
            })
            .collect();
        PixelBuffer::from_data(1, 4, 4, 4, data).unwrap()
    }

    #[test]
    fn test_zero_is_identity() {
        let img = gradient();
        let out = color_balance(&img, &ColorBalanceParams::default()).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_shadow_shift_toward_blue() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.15, 0.15, 0.15]).unwrap();
        let params = ColorBalanceParams {
            shadows: ToneShift {
                yellow_blue: 1.0,
                ..Default::default()
            },
            preserve_luminosity: false,
            ..Default::default()
        };
        let out = color_balance(&img, &params).unwrap();
        let px = out.pixel(0, 0, 0);
        assert_abs_diff_eq!(px[2], 0.25, epsilon = 1e-5);
        assert_eq!(px[0], 0.15);
    }

    #[test]
    fn test_endpoints_fixed() {
        let img = PixelBuffer::from_data(1, 1, 2, 3, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let params = ColorBalanceParams {
            midtones: ToneShift {
                cyan_red: -1.0,
                magenta_green: 1.0,
                yellow_blue: 0.5,
            },
            preserve_luminosity: false,
            ..Default::default()
        };
        let out = color_balance(&img, &params).unwrap();
        for (a, b) in out.data().iter().zip(img.data()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_preserve_luminosity() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.4, 0.4, 0.4, 0.5]).unwrap();
        let params = ColorBalanceParams {
            midtones: ToneShift {
                cyan_red: 0.5,
                ..Default::default()
            },
            ..Default::default()
        };
        let out = color_balance(&img, &params).unwrap();
        let px = out.pixel(0, 0, 0);
        assert!(px[0] > px[1]);
        assert_abs_diff_eq!(luminance_rec709([px[0], px[1], px[2]]), 0.4, epsilon = 1e-5);
        assert_eq!(px[3], 0.5);
    }

    #[test]
    fn test_black_pixel_with_preserve() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.0, 0.0, 0.0]).unwrap();
        let params = ColorBalanceParams {
            shadows: ToneShift {
                cyan_red: -1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let out = color_balance(&img, &params).unwrap();
        assert!(out.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_advanced_moves_anchor() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.3, 0.3, 0.3]).unwrap();
        let params = ColorBalanceAdvancedParams {
            brightness_target: 0.3,
            shift: ToneShift {
                magenta_green: 0.2,
                ..Default::default()
            },
            preserve_luminosity: false,
        };
        let out = color_balance_advanced(&img, &params).unwrap();
        assert_abs_diff_eq!(out.pixel(0, 0, 0)[1], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_invalid_center() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.3, 0.3, 0.3]).unwrap();
        let params = ColorBalanceAdvancedParams {
            brightness_target: 1.0,
            shift: ToneShift {
                cyan_red: 0.5,
                ..Default::default()
            },
            preserve_luminosity: false,
        };
        assert!(matches!(
            color_balance_advanced(&img, &params),
            Err(OpsError::InvalidParameter(_))
        ));
    }
}
