//! RGB <-> HSV conversion.
//!
//! HSV channels are ordered `[H, S, V]` with hue expressed as a fraction of a
//! full turn (`[0, 1)`), saturation and value in `[0, 1]`.
//!
//! Achromatic pixels (`max == min`) map to `H = 0, S = 0`. Downstream hue
//! selection relies on `S == 0` meaning "no hue present".
//!
//! # Example
//!
//! ```rust
//! use pixblend_ops::color::{hsv_to_rgb_pixel, rgb_to_hsv_pixel};
//!
//! let hsv = rgb_to_hsv_pixel([0.0, 0.0, 1.0]);
//! assert!((hsv[0] - 2.0 / 3.0).abs() < 1e-6);
//! let rgb = hsv_to_rgb_pixel(hsv);
//! assert!((rgb[2] - 1.0).abs() < 1e-6);
//! ```

use pixblend_core::PixelBuffer;
use tracing::trace;

use crate::parallel::map_pixels;
use crate::OpsResult;

/// Converts one RGB triple to HSV.
#[inline]
pub fn rgb_to_hsv_pixel(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    if diff == 0.0 {
        return [0.0, 0.0, max];
    }

    let s = if max != 0.0 { diff / max } else { 0.0 };

    // Blue wins ties over green, green over red.
    let h = if max == b {
        (r - g) / diff / 6.0 + 2.0 / 3.0
    } else if max == g {
        (b - r) / diff / 6.0 + 1.0 / 3.0
    } else if g >= b {
        (g - b) / diff / 6.0
    } else {
        (g - b) / diff / 6.0 + 1.0
    };
    // Reds just below the seam can round up to a full turn.
    let h = if h >= 1.0 { h - 1.0 } else { h };

    [h, s, max]
}

/// Converts one HSV triple to RGB.
#[inline]
pub fn hsv_to_rgb_pixel(hsv: [f32; 3]) -> [f32; 3] {
    let [h, s, v] = hsv;
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    match (sector as i64).rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// Converts a whole buffer from RGB to HSV. Alpha passes through untouched.
///
/// ```rust
/// use pixblend_core::PixelBuffer;
/// use pixblend_ops::color::rgb_to_hsv;
///
/// let img = PixelBuffer::filled(1, 2, 2, &[0.5, 0.5, 0.5, 0.8]).unwrap();
/// let hsv = rgb_to_hsv(&img).unwrap();
/// assert_eq!(hsv.pixel(0, 0, 0), &[0.0, 0.0, 0.5, 0.8]);
/// ```
pub fn rgb_to_hsv(buffer: &PixelBuffer) -> OpsResult<PixelBuffer> {
    trace!(shape = ?buffer.shape(), "color::rgb_to_hsv");
    convert(buffer, rgb_to_hsv_pixel)
}

/// Converts a whole buffer from HSV to RGB. Alpha passes through untouched.
pub fn hsv_to_rgb(buffer: &PixelBuffer) -> OpsResult<PixelBuffer> {
    trace!(shape = ?buffer.shape(), "color::hsv_to_rgb");
    convert(buffer, hsv_to_rgb_pixel)
}

fn convert(buffer: &PixelBuffer, f: fn([f32; 3]) -> [f32; 3]) -> OpsResult<PixelBuffer> {
    let c = buffer.channels();
    let data = map_pixels(buffer.data(), c, c, |_, src, dst| {
        let out = f([src[0], src[1], src[2]]);
        dst[..3].copy_from_slice(&out);
        if c == 4 {
            dst[3] = src[3];
        }
    });
    let (batch, height, width, channels) = buffer.shape();
    Ok(PixelBuffer::from_data(batch, height, width, channels, data)?)
}
