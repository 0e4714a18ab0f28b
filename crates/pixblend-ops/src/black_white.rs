//! Black & white conversion with per-hue-family weights.
//!
//! Each pixel is split into its gray floor `m = min(r, g, b)` plus the
//! excess of each channel over it. The excess is attributed to one
//! secondary (cyan, magenta or yellow: the overlap of the two non-minimum
//! channels) and two primaries, and each part is scaled by its weight.
//! With all weights at zero every pixel becomes `min(r, g, b)`.

use pixblend_core::{clamp01, PixelBuffer};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::parallel::map_pixels;
use crate::OpsResult;

/// Hue-family weights, each in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackWhiteParams {
    /// Weight of red content.
    pub red: f32,
    /// Weight of green content.
    pub green: f32,
    /// Weight of blue content.
    pub blue: f32,
    /// Weight of cyan content.
    pub cyan: f32,
    /// Weight of magenta content.
    pub magenta: f32,
    /// Weight of yellow content.
    pub yellow: f32,
}

impl BlackWhiteParams {
    /// Gray level of one RGB pixel.
    #[inline]
    pub fn gray(&self, rgb: [f32; 3]) -> f32 {
        let [r, g, b] = rgb;
        let m = r.min(g).min(b);
        let (dr, dg, db) = (r - m, g - m, b - m);

        let level = if dr == 0.0 {
            let c = dg.min(db);
            m + c * self.cyan + (dg - c) * self.green + (db - c) * self.blue
        } else if dg == 0.0 {
            let k = dr.min(db);
            m + k * self.magenta + (dr - k) * self.red + (db - k) * self.blue
        } else {
            let y = dr.min(dg);
            m + y * self.yellow + (dr - y) * self.red + (dg - y) * self.green
        };
        clamp01(level)
    }
}

/// Converts `image` to gray, replicated to RGB. Alpha passes through.
///
/// ```rust
/// use pixblend_core::PixelBuffer;
/// use pixblend_ops::black_white::{black_white, BlackWhiteParams};
///
/// let img = PixelBuffer::filled(1, 1, 1, &[1.0, 0.2, 0.2]).unwrap();
/// let params = BlackWhiteParams { red: 0.5, ..Default::default() };
/// let out = black_white(&img, &params).unwrap();
/// assert!((out.pixel(0, 0, 0)[1] - 0.6).abs() < 1e-6);
/// ```
pub fn black_white(image: &PixelBuffer, params: &BlackWhiteParams) -> OpsResult<PixelBuffer> {
    let (batch, height, width, channels) = image.shape();
    trace!(batch, height, width, "black_white::black_white");
    debug!(?params, "Converting to black and white");

    let data = map_pixels(image.data(), channels, channels, |_, src, dst| {
        let gray = params.gray([src[0], src[1], src[2]]);
        dst[..3].fill(gray);
        if channels == 4 {
            dst[3] = src[3];
        }
    });
    Ok(PixelBuffer::from_data(batch, height, width, channels, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_weights_take_minimum() {
        let p = BlackWhiteParams::default();
        assert_eq!(p.gray([0.7, 0.3, 0.5]), 0.3);
        assert_eq!(p.gray([0.4, 0.4, 0.4]), 0.4);
    }

    #[test]
    fn test_secondary_weights() {
        let p = BlackWhiteParams {
            cyan: 1.0,
            magenta: 0.5,
            yellow: 0.25,
            ..Default::default()
        };
        // Cyan: red is the minimum, excess shared by green and blue
        assert_abs_diff_eq!(p.gray([0.0, 0.8, 0.8]), 0.8, epsilon = 1e-6);
        // Magenta: green is the minimum
        assert_abs_diff_eq!(p.gray([0.8, 0.0, 0.8]), 0.4, epsilon = 1e-6);
        // Yellow: blue is the minimum
        assert_abs_diff_eq!(p.gray([0.8, 0.8, 0.0]), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_primary_split() {
        let p = BlackWhiteParams {
            red: 1.0,
            yellow: -1.0,
            ..Default::default()
        };
        // m = 0.1, dr = 0.8, dg = 0.3: yellow part 0.3, red part 0.5
        assert_abs_diff_eq!(p.gray([0.9, 0.4, 0.1]), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_clamped_and_alpha_kept() {
        let img = PixelBuffer::filled(1, 2, 1, &[0.0, 0.0, 1.0, 0.6]).unwrap();
        let p = BlackWhiteParams {
            blue: -1.0,
            ..Default::default()
        };
        let out = black_white(&img, &p).unwrap();
        assert_eq!(out.pixel(0, 1, 0), &[0.0, 0.0, 0.0, 0.6]);
    }
}
