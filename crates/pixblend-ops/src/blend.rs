//! Blend mode library.
//!
//! Pure functions from `(backdrop RGB, source RGB)` to blended RGB. Inputs
//! are straight (not alpha-weighted); alpha and opacity are folded in by
//! [`crate::composite`].
//!
//! # Groups
//!
//! - Separable: evaluated per channel and clamped to `[0, 1]`
//!   (everything except the groups below; `normal` is not clamped)
//! - Selection: [`BlendMode::Dissolve`], [`BlendMode::DarkerColor`],
//!   [`BlendMode::LighterColor`] pick a whole pixel from one layer
//! - HSV transplant: [`BlendMode::Hue`], [`BlendMode::Saturation`],
//!   [`BlendMode::Color`], [`BlendMode::Luminosity`]
//!
//! # Example
//!
//! ```rust
//! use pixblend_ops::blend::{blend_pixel, BlendMode};
//!
//! let out = blend_pixel(BlendMode::Multiply, [0.8, 0.4, 0.2], [0.5, 0.5, 0.5], 1.0, 0.0);
//! assert!((out[0] - 0.4).abs() < 1e-6);
//! ```

use std::fmt;
use std::str::FromStr;

use pixblend_core::clamp01;
use serde::{Deserialize, Serialize};

use crate::color::{hsv_to_rgb_pixel, rgb_to_hsv_pixel};
use crate::OpsError;

/// Blend mode for compositing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlendMode {
    // Normal group
    /// Source replaces backdrop.
    #[default]
    Normal,
    /// Per-pixel random pick of source with probability `opacity * alpha`.
    Dissolve,

    // Darken group
    /// `min(b, s)`
    Darken,
    /// `b * s`
    Multiply,
    /// `1 - (1 - b) / s`
    ColorBurn,
    /// `b + s - 1`
    LinearBurn,
    /// Whole pixel with the lower HSV value.
    DarkerColor,

    // Lighten group
    /// `max(b, s)`
    Lighten,
    /// `1 - (1 - b)(1 - s)`
    Screen,
    /// `min(b / (1 - s), 1)`
    Dodge,
    /// `b / (1 - s)`
    ColorDodge,
    /// `b + s` (addition)
    LinearDodge,
    /// Whole pixel with the higher HSV value.
    LighterColor,

    // Contrast group
    /// Multiply or screen keyed on the backdrop.
    Overlay,
    /// Gentle contrast keyed on the source.
    SoftLight,
    /// Multiply or screen keyed on the source.
    HardLight,
    /// Color burn or dodge keyed on the source.
    VividLight,
    /// `b + 2s - 1`
    LinearLight,
    /// Darken or lighten keyed on the source.
    PinLight,
    /// Linear light rounded to 0 or 1.
    HardMix,

    // Inversion group
    /// `|b - s|`
    Difference,
    /// `b + s - 2bs`
    Exclusion,
    /// `b - s`
    Subtract,
    /// `b / s`
    Divide,

    // Component group
    /// Source hue with backdrop saturation and value.
    Hue,
    /// Saturation interpolated toward the source.
    Saturation,
    /// Hue and saturation interpolated toward the source.
    Color,
    /// HSV value interpolated toward the source.
    Luminosity,

    // GIMP grain modes
    /// `b - s + 0.5`
    GrainExtract,
    /// `b + s - 0.5`
    GrainMerge,
}

impl BlendMode {
    /// All blend modes in display order.
    pub const ALL: [BlendMode; 30] = [
        Self::Normal,
        Self::Dissolve,
        Self::Darken,
        Self::Multiply,
        Self::ColorBurn,
        Self::LinearBurn,
        Self::DarkerColor,
        Self::Lighten,
        Self::Screen,
        Self::Dodge,
        Self::ColorDodge,
        Self::LinearDodge,
        Self::LighterColor,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::VividLight,
        Self::LinearLight,
        Self::PinLight,
        Self::HardMix,
        Self::Difference,
        Self::Exclusion,
        Self::Subtract,
        Self::Divide,
        Self::Hue,
        Self::Saturation,
        Self::Color,
        Self::Luminosity,
        Self::GrainExtract,
        Self::GrainMerge,
    ];

    /// Lower-case display name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Dissolve => "dissolve",
            Self::Darken => "darken",
            Self::Multiply => "multiply",
            Self::ColorBurn => "color burn",
            Self::LinearBurn => "linear burn",
            Self::DarkerColor => "darker color",
            Self::Lighten => "lighten",
            Self::Screen => "screen",
            Self::Dodge => "dodge",
            Self::ColorDodge => "color dodge",
            Self::LinearDodge => "linear dodge (add)",
            Self::LighterColor => "lighter color",
            Self::Overlay => "overlay",
            Self::SoftLight => "soft light",
            Self::HardLight => "hard light",
            Self::VividLight => "vivid light",
            Self::LinearLight => "linear light",
            Self::PinLight => "pin light",
            Self::HardMix => "hard mix",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::Subtract => "subtract",
            Self::Divide => "divide",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Color => "color",
            Self::Luminosity => "luminosity",
            Self::GrainExtract => "grain extract",
            Self::GrainMerge => "grain merge",
        }
    }

    /// True for modes that already fold `opacity * source_alpha` into
    /// their result and are mixed by source alpha alone afterwards.
    #[inline]
    pub fn weighs_itself(self) -> bool {
        matches!(
            self,
            Self::Dissolve | Self::Saturation | Self::Color | Self::Luminosity
        )
    }

    /// True when the mode consumes a random sample per pixel.
    #[inline]
    pub fn is_stochastic(self) -> bool {
        self == Self::Dissolve
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendMode {
    type Err = OpsError;

    /// Parses a display name. Case, `_`/`-` separators and surrounding
    /// whitespace are ignored; a few common aliases are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let mode = match key.as_str() {
            "addition" | "add" | "linear dodge" => Self::LinearDodge,
            "luminance" => Self::Luminosity,
            other => match Self::ALL.iter().find(|m| m.name() == other) {
                Some(m) => *m,
                None => return Err(OpsError::unknown("blend mode", s)),
            },
        };
        Ok(mode)
    }
}

impl TryFrom<String> for BlendMode {
    type Error = OpsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BlendMode> for String {
    fn from(m: BlendMode) -> Self {
        m.name().to_string()
    }
}

/// Evaluates a separable mode on one channel, before clamping.
///
/// Non-separable modes fall through to `s`.
#[inline]
fn blend_channel(mode: BlendMode, b: f32, s: f32) -> f32 {
    match mode {
        BlendMode::Multiply => b * s,
        BlendMode::Screen => 1.0 - (1.0 - b) * (1.0 - s),
        BlendMode::Darken => b.min(s),
        BlendMode::Lighten => b.max(s),
        BlendMode::Difference => (b - s).abs(),
        BlendMode::LinearDodge => b + s,
        BlendMode::Subtract => b - s,
        BlendMode::Divide => {
            if s == 0.0 {
                1.0
            } else {
                b / s
            }
        }
        BlendMode::Overlay => {
            if b <= 0.5 {
                2.0 * b * s
            } else {
                1.0 - 2.0 * (1.0 - b) * (1.0 - s)
            }
        }
        BlendMode::HardLight => {
            if s <= 0.5 {
                2.0 * s * b
            } else {
                1.0 - 2.0 * (1.0 - b) * (1.0 - s)
            }
        }
        BlendMode::SoftLight => {
            if s <= 0.5 {
                2.0 * b * s + b * b * (1.0 - 2.0 * s)
            } else {
                2.0 * b * (1.0 - s) + b.sqrt() * (2.0 * s - 1.0)
            }
        }
        BlendMode::ColorDodge | BlendMode::Dodge => dodge(b, 1.0 - s),
        BlendMode::ColorBurn => burn(b, s),
        BlendMode::LinearBurn => b + s - 1.0,
        BlendMode::LinearLight => b + 2.0 * s - 1.0,
        BlendMode::VividLight => {
            if s <= 0.5 {
                dodge(b, 1.0 - 2.0 * s)
            } else {
                1.0 - (1.0 - b) / (2.0 * s - 0.5)
            }
        }
        BlendMode::PinLight => {
            if s <= 0.5 {
                b.min(2.0 * s)
            } else {
                b.max(2.0 * (s - 0.5))
            }
        }
        BlendMode::HardMix => clamp01(b + 2.0 * s - 1.0).round_ties_even(),
        BlendMode::Exclusion => b + s - 2.0 * b * s,
        BlendMode::GrainExtract => b - s + 0.5,
        BlendMode::GrainMerge => b + s - 0.5,
        _ => s,
    }
}

/// `b / denom`, saturating to 1 when the denominator is exactly zero.
#[inline]
fn dodge(b: f32, denom: f32) -> f32 {
    if denom == 0.0 { 1.0 } else { b / denom }
}

/// `1 - (1 - b) / s`, saturating to 0 when `s` is exactly zero.
#[inline]
fn burn(b: f32, s: f32) -> f32 {
    if s == 0.0 { 0.0 } else { 1.0 - (1.0 - b) / s }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// HSV-space component transplant.
fn blend_hsv(mode: BlendMode, b: [f32; 3], s: [f32; 3], weight: f32) -> [f32; 3] {
    let hb = rgb_to_hsv_pixel(b);
    let hs = rgb_to_hsv_pixel(s);
    let out = match mode {
        // Achromatic sources have H = 0 and still transplant it.
        BlendMode::Hue => [hs[0], hb[1], hb[2]],
        BlendMode::Saturation => [hb[0], lerp(hb[1], hs[1], weight), hb[2]],
        BlendMode::Color => [
            lerp(hb[0], hs[0], weight),
            lerp(hb[1], hs[1], weight),
            hb[2],
        ],
        _ => [hb[0], hb[1], lerp(hb[2], hs[2], weight)],
    };
    hsv_to_rgb_pixel(out)
}

/// Blends one pixel.
///
/// # Arguments
///
/// * `mode` - Blend mode
/// * `b` - Backdrop RGB
/// * `s` - Source RGB
/// * `weight` - `opacity * source_alpha`; read by dissolve and the
///   interpolating HSV modes
/// * `sample` - uniform draw in `[0, 1)`; read by dissolve only
#[inline]
pub fn blend_pixel(mode: BlendMode, b: [f32; 3], s: [f32; 3], weight: f32, sample: f32) -> [f32; 3] {
    match mode {
        BlendMode::Normal => s,
        BlendMode::Dissolve => {
            if sample < weight { s } else { b }
        }
        BlendMode::DarkerColor => {
            if s[0].max(s[1]).max(s[2]) < b[0].max(b[1]).max(b[2]) { s } else { b }
        }
        BlendMode::LighterColor => {
            if s[0].max(s[1]).max(s[2]) > b[0].max(b[1]).max(b[2]) { s } else { b }
        }
        BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Luminosity => {
            blend_hsv(mode, b, s, weight)
        }
        _ => [
            clamp01(blend_channel(mode, b[0], s[0])),
            clamp01(blend_channel(mode, b[1], s[1])),
            clamp01(blend_channel(mode, b[2], s[2])),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn one(mode: BlendMode, b: f32, s: f32) -> f32 {
        blend_pixel(mode, [b; 3], [s; 3], 1.0, 0.0)[0]
    }

    #[test]
    fn test_basic_formulas() {
        assert_abs_diff_eq!(one(BlendMode::Multiply, 0.8, 0.5), 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::Screen, 0.5, 0.5), 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::Darken, 0.3, 0.6), 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::Lighten, 0.3, 0.6), 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::Difference, 0.3, 0.6), 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::Exclusion, 0.5, 0.5), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::GrainExtract, 0.5, 0.2), 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::GrainMerge, 0.5, 0.2), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_add_and_subtract_clamp() {
        assert_eq!(one(BlendMode::LinearDodge, 0.6, 0.5), 1.0);
        assert_eq!(one(BlendMode::Subtract, 0.2, 0.5), 0.0);
        assert_eq!(one(BlendMode::LinearBurn, 0.2, 0.3), 0.0);
    }

    #[test]
    fn test_division_guards() {
        assert_eq!(one(BlendMode::ColorDodge, 0.5, 1.0), 1.0);
        assert_eq!(one(BlendMode::Dodge, 0.0, 1.0), 1.0);
        assert_eq!(one(BlendMode::ColorBurn, 0.5, 0.0), 0.0);
        assert_eq!(one(BlendMode::Divide, 0.5, 0.0), 1.0);
        assert_eq!(one(BlendMode::VividLight, 0.4, 0.5), 1.0);
        assert!(one(BlendMode::Divide, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_contrast_modes() {
        // Overlay keys on the backdrop, hard light on the source
        assert_abs_diff_eq!(one(BlendMode::Overlay, 0.25, 0.8), 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::HardLight, 0.8, 0.25), 0.4, epsilon = 1e-6);
        // Soft light with neutral source is identity
        assert_abs_diff_eq!(one(BlendMode::SoftLight, 0.3, 0.5), 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::PinLight, 0.8, 0.2), 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(one(BlendMode::PinLight, 0.1, 0.8), 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_hard_mix_is_binary() {
        for &(b, s) in &[(0.1, 0.2), (0.9, 0.7), (0.5, 0.5), (0.3, 0.6)] {
            let v = one(BlendMode::HardMix, b, s);
            assert!(v == 0.0 || v == 1.0);
        }
        // 0.5 + 2*0.25 - 1 = 0.0
        assert_eq!(one(BlendMode::HardMix, 0.5, 0.25), 0.0);
        assert_eq!(one(BlendMode::HardMix, 0.5, 0.5), 0.0);
        assert_eq!(one(BlendMode::HardMix, 0.9, 0.6), 1.0);
    }

    #[test]
    fn test_darker_lighter_color_pick_whole_pixel() {
        let b = [0.9, 0.1, 0.1];
        let s = [0.5, 0.5, 0.5];
        assert_eq!(blend_pixel(BlendMode::DarkerColor, b, s, 1.0, 0.0), s);
        assert_eq!(blend_pixel(BlendMode::LighterColor, b, s, 1.0, 0.0), b);
    }

    #[test]
    fn test_dissolve_uses_sample() {
        let b = [0.0; 3];
        let s = [1.0; 3];
        assert_eq!(blend_pixel(BlendMode::Dissolve, b, s, 0.5, 0.2), s);
        assert_eq!(blend_pixel(BlendMode::Dissolve, b, s, 0.5, 0.7), b);
        assert_eq!(blend_pixel(BlendMode::Dissolve, b, s, 0.0, 0.0), b);
    }

    #[test]
    fn test_hue_transplant() {
        // Red backdrop, pure blue source: hue becomes blue, S and V kept
        let out = blend_pixel(BlendMode::Hue, [0.8, 0.2, 0.2], [0.0, 0.0, 1.0], 1.0, 0.0);
        assert_abs_diff_eq!(out[0], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_hue_from_achromatic_source_is_red() {
        let out = blend_pixel(BlendMode::Hue, [0.2, 0.8, 0.2], [0.5, 0.5, 0.5], 1.0, 0.0);
        assert_abs_diff_eq!(out[0], 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_luminosity_interpolates_value() {
        let out = blend_pixel(BlendMode::Luminosity, [0.4, 0.2, 0.2], [1.0, 1.0, 1.0], 0.5, 0.0);
        // V: 0.4 -> 0.7, saturation 0.5 kept
        assert_abs_diff_eq!(out[0], 0.7, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.35, epsilon = 1e-6);
    }

    #[test]
    fn test_saturation_full_weight_desaturates() {
        let out = blend_pixel(BlendMode::Saturation, [0.8, 0.2, 0.4], [0.5, 0.5, 0.5], 1.0, 0.0);
        assert_abs_diff_eq!(out[0], 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_names_round_trip() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.name().parse::<BlendMode>().unwrap(), mode);
        }
        assert_eq!("Linear_Dodge".parse::<BlendMode>().unwrap(), BlendMode::LinearDodge);
        assert_eq!("addition".parse::<BlendMode>().unwrap(), BlendMode::LinearDodge);
        assert!(matches!(
            "sparkle".parse::<BlendMode>(),
            Err(OpsError::UnknownVariant { kind: "blend mode", .. })
        ));
    }
}
