//! Levels: black point, gamma and white point remap.
//!
//! ```text
//! n   = clamp((in - in_black) / (in_white - in_black), 0, 1)
//! out = out_black + n^gamma * (out_white - out_black)
//! ```
//!
//! The remap applies to all RGB channels or to one of them. Alpha passes
//! through unchanged.

use std::fmt;
use std::str::FromStr;

use pixblend_core::PixelBuffer;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::parallel::map_pixels;
use crate::{OpsError, OpsResult};

/// Input ranges narrower than this collapse to a hard threshold.
const MIN_INPUT_RANGE: f32 = 1e-6;

/// Channels affected by a levels adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LevelsChannel {
    /// Red, green and blue together.
    #[default]
    Rgb,
    /// Red only.
    Red,
    /// Green only.
    Green,
    /// Blue only.
    Blue,
}

impl LevelsChannel {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    /// Whether channel index `c` (0..3) is adjusted.
    #[inline]
    pub fn selects(self, c: usize) -> bool {
        match self {
            Self::Rgb => c < 3,
            Self::Red => c == 0,
            Self::Green => c == 1,
            Self::Blue => c == 2,
        }
    }
}

impl fmt::Display for LevelsChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LevelsChannel {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "red" | "r" => Ok(Self::Red),
            "green" | "g" => Ok(Self::Green),
            "blue" | "b" => Ok(Self::Blue),
            _ => Err(OpsError::unknown("levels channel", s)),
        }
    }
}

impl TryFrom<String> for LevelsChannel {
    type Error = OpsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LevelsChannel> for String {
    fn from(c: LevelsChannel) -> Self {
        c.name().to_string()
    }
}

/// Levels parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsParams {
    /// Channels to adjust.
    pub channel: LevelsChannel,
    /// Input value mapped to black, `[0, 0.98]`.
    pub input_black_point: f32,
    /// Exponent applied to the normalized input, `[0.01, 9.99]`.
    pub input_gamma: f32,
    /// Input value mapped to white, `[0, 1]`.
    pub input_white_point: f32,
    /// Output value for black.
    pub output_black_point: f32,
    /// Output value for white.
    pub output_white_point: f32,
}

impl Default for LevelsParams {
    fn default() -> Self {
        Self {
            channel: LevelsChannel::Rgb,
            input_black_point: 0.0,
            input_gamma: 1.0,
            input_white_point: 1.0,
            output_black_point: 0.0,
            output_white_point: 1.0,
        }
    }
}

impl LevelsParams {
    /// Check if this is identity (no-op).
    pub fn is_identity(&self) -> bool {
        self.input_black_point == 0.0
            && self.input_gamma == 1.0
            && self.input_white_point == 1.0
            && self.output_black_point == 0.0
            && self.output_white_point == 1.0
    }

    fn validate(&self) -> OpsResult<()> {
        if !(self.input_gamma.is_finite() && self.input_gamma > 0.0) {
            return Err(OpsError::InvalidParameter(format!(
                "input_gamma must be positive, got {}",
                self.input_gamma
            )));
        }
        Ok(())
    }

    /// Remaps one channel value.
    ///
    /// A collapsed input range (white point equal to black point) becomes a
    /// hard threshold at the black point. A white point below the black
    /// point inverts the ramp.
    #[inline]
    pub fn apply_value(&self, v: f32) -> f32 {
        let range = self.input_white_point - self.input_black_point;
        let n = if range.abs() < MIN_INPUT_RANGE {
            if v > self.input_black_point { 1.0 } else { 0.0 }
        } else {
            ((v - self.input_black_point) / range).clamp(0.0, 1.0)
        };
        let n = n.powf(self.input_gamma);
        self.output_black_point + n * (self.output_white_point - self.output_black_point)
    }
}

/// Applies levels to every image of `image`.
///
/// # Errors
///
/// Returns [`OpsError::InvalidParameter`] for a non-positive gamma.
///
/// ```rust
/// use pixblend_core::PixelBuffer;
/// use pixblend_ops::levels::{levels, LevelsParams};
///
/// let img = PixelBuffer::filled(1, 1, 1, &[0.5, 0.2, 0.8, 1.0]).unwrap();
/// let params = LevelsParams {
///     input_black_point: 0.2,
///     input_white_point: 0.8,
///     ..Default::default()
/// };
/// let out = levels(&img, &params).unwrap();
/// let px = out.pixel(0, 0, 0);
/// assert!((px[0] - 0.5).abs() < 1e-6);
/// assert_eq!(px[1], 0.0);
/// assert!((px[2] - 1.0).abs() < 1e-6);
/// ```
pub fn levels(image: &PixelBuffer, params: &LevelsParams) -> OpsResult<PixelBuffer> {
    let (batch, height, width, channels) = image.shape();
    trace!(batch, height, width, "levels::levels");
    debug!(
        channel = %params.channel,
        black = params.input_black_point,
        gamma = params.input_gamma,
        white = params.input_white_point,
        "Applying levels"
    );
    params.validate()?;

    if params.is_identity() {
        return Ok(image.clone());
    }

    let data = map_pixels(image.data(), channels, channels, |_, src, dst| {
        for (c, (d, &s)) in dst.iter_mut().zip(src).enumerate() {
            *d = if params.channel.selects(c) {
                params.apply_value(s)
            } else {
                s
            };
        }
    });
    Ok(PixelBuffer::from_data(batch, height, width, channels, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_midpoint_unchanged() {
        let p = LevelsParams {
            input_black_point: 0.2,
            input_white_point: 0.8,
            ..Default::default()
        };
        assert_abs_diff_eq!(p.apply_value(0.5), 0.5, epsilon = 1e-6);
        assert_eq!(p.apply_value(0.1), 0.0);
        assert_eq!(p.apply_value(0.95), 1.0);
    }

    #[test]
    fn test_gamma_and_output_range() {
        let p = LevelsParams {
            input_gamma: 2.0,
            output_black_point: 0.1,
            output_white_point: 0.9,
            ..Default::default()
        };
        // 0.5^2 = 0.25 -> 0.1 + 0.25 * 0.8
        assert_abs_diff_eq!(p.apply_value(0.5), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_collapsed_range_thresholds() {
        let p = LevelsParams {
            input_black_point: 0.5,
            input_white_point: 0.5,
            ..Default::default()
        };
        assert_eq!(p.apply_value(0.4), 0.0);
        assert_eq!(p.apply_value(0.6), 1.0);
    }

    #[test]
    fn test_single_channel_and_alpha() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.5, 0.5, 0.5, 0.3]).unwrap();
        let p = LevelsParams {
            channel: LevelsChannel::Green,
            input_white_point: 0.5,
            ..Default::default()
        };
        let out = levels(&img, &p).unwrap();
        assert_eq!(out.pixel(0, 0, 0), &[0.5, 1.0, 0.5, 0.3]);
    }

    #[test]
    fn test_bad_gamma() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.5; 3]).unwrap();
        let p = LevelsParams {
            input_gamma: 0.0,
            ..Default::default()
        };
        assert!(matches!(levels(&img, &p), Err(OpsError::InvalidParameter(_))));
    }

    #[test]
    fn test_channel_names() {
        assert_eq!("RGB".parse::<LevelsChannel>().unwrap(), LevelsChannel::Rgb);
        assert_eq!("blue".parse::<LevelsChannel>().unwrap(), LevelsChannel::Blue);
        assert!("alpha".parse::<LevelsChannel>().is_err());
    }
}
