//! Resampling and aspect-aware fitting.
//!
//! Brings a "source" buffer to the exact pixel size of a "backdrop":
//!
//! - [`FitPolicy::Stretch`] - resample straight to the target size
//! - [`FitPolicy::Cover`] - uniform scale so both sides cover the target,
//!   then keep the **top-left** `height x width` region
//!
//! # Filters
//!
//! - [`Filter::Nearest`] - no interpolation, used for hard-edged masks
//! - [`Filter::Bilinear`] - triangle kernel; widened when downscaling so
//!   every source pixel contributes
//!
//! # Example
//!
//! ```rust
//! use pixblend_ops::resize::{resize_f32, Filter};
//!
//! let src = vec![0.5f32; 16 * 16 * 4];
//! let dst = resize_f32(&src, 16, 16, 4, 32, 32, Filter::Bilinear).unwrap();
//! assert_eq!(dst.len(), 32 * 32 * 4);
//! ```

use std::fmt;
use std::str::FromStr;

use pixblend_core::{Mask, PixelBuffer};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::parallel::for_each_row;
use crate::{OpsError, OpsResult};

/// Resampling filter for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Nearest-neighbor (no fractional values introduced).
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Bilinear,
}

impl Filter {
    /// Returns the support radius for this filter.
    #[inline]
    pub fn support(&self) -> f32 {
        match self {
            Filter::Nearest => 0.5,
            Filter::Bilinear => 1.0,
        }
    }
}

/// Bilinear (triangle) weight function.
#[inline]
fn bilinear_weight(x: f32) -> f32 {
    let ax = x.abs();
    if ax < 1.0 { 1.0 - ax } else { 0.0 }
}

/// How a source is brought to the backdrop's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FitPolicy {
    /// Non-uniform resize to the exact target size.
    Stretch,
    /// Uniform scale to fill, then crop from the top-left corner.
    #[default]
    Cover,
}

impl FitPolicy {
    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stretch => "stretch",
            Self::Cover => "cover",
        }
    }
}

impl fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitPolicy {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stretch" => Ok(Self::Stretch),
            // "crop" is the name the node UI used for cover fitting
            "cover" | "crop" => Ok(Self::Cover),
            _ => Err(OpsError::unknown("fit policy", s)),
        }
    }
}

impl TryFrom<String> for FitPolicy {
    type Error = OpsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FitPolicy> for String {
    fn from(p: FitPolicy) -> Self {
        p.name().to_string()
    }
}

/// Resizes one f32 image.
///
/// # Arguments
///
/// * `src` - Source pixel data
/// * `src_w` - Source width
/// * `src_h` - Source height
/// * `channels` - Number of channels
/// * `dst_w` - Destination width
/// * `dst_h` - Destination height
/// * `filter` - Resampling filter
pub fn resize_f32(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
    filter: Filter,
) -> OpsResult<Vec<f32>> {
    let expected = src_w * src_h * channels;
    if src.len() != expected || expected == 0 {
        return Err(OpsError::InvalidDimensions(format!(
            "expected {} values, got {}",
            expected,
            src.len()
        )));
    }
    if dst_w == 0 || dst_h == 0 {
        return Err(OpsError::InvalidDimensions(
            "destination size must be > 0".into(),
        ));
    }
    if src_w == dst_w && src_h == dst_h {
        return Ok(src.to_vec());
    }

    Ok(match filter {
        Filter::Nearest => resize_nearest(src, src_w, src_h, channels, dst_w, dst_h),
        Filter::Bilinear => {
            // Two-pass separable resize: horizontal then vertical
            let temp = resize_horizontal(src, src_w, src_h, channels, dst_w);
            resize_vertical(&temp, dst_w, src_h, channels, dst_h)
        }
    })
}

/// Nearest-neighbor resize: `src = floor(dst * src_size / dst_size)`.
fn resize_nearest(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<f32> {
    let mut dst = vec![0.0f32; dst_w * dst_h * channels];
    let sx_scale = src_w as f32 / dst_w as f32;
    let sy_scale = src_h as f32 / dst_h as f32;

    for_each_row(&mut dst, dst_w * channels, |y, row| {
        let sy = ((y as f32 * sy_scale).floor() as usize).min(src_h - 1);
        for x in 0..dst_w {
            let sx = ((x as f32 * sx_scale).floor() as usize).min(src_w - 1);
            let s = (sy * src_w + sx) * channels;
            row[x * channels..(x + 1) * channels].copy_from_slice(&src[s..s + channels]);
        }
    });

    dst
}

/// Horizontal bilinear pass.
fn resize_horizontal(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
) -> Vec<f32> {
    let mut dst = vec![0.0f32; dst_w * src_h * channels];
    let scale = src_w as f32 / dst_w as f32;
    let support = Filter::Bilinear.support() * scale.max(1.0);

    for_each_row(&mut dst, dst_w * channels, |y, row| {
        let mut sum = vec![0.0f32; channels];
        for x in 0..dst_w {
            // Map destination x to source x
            let center = (x as f32 + 0.5) * scale - 0.5;
            let left = ((center - support).floor() as isize).max(0) as usize;
            let right = ((center + support).ceil().max(0.0) as usize).min(src_w - 1);

            sum.fill(0.0);
            let mut weight_sum = 0.0f32;

            for sx in left..=right {
                let w = bilinear_weight((sx as f32 - center) / scale.max(1.0));
                if w == 0.0 {
                    continue;
                }
                weight_sum += w;
                let src_idx = (y * src_w + sx) * channels;
                for c in 0..channels {
                    sum[c] += src[src_idx + c] * w;
                }
            }

            let dst_idx = x * channels;
            if weight_sum > 0.0 {
                for c in 0..channels {
                    row[dst_idx + c] = sum[c] / weight_sum;
                }
            } else {
                // Sample center fell past the edge: clamp to nearest border pixel
                let sx = (center.round().max(0.0) as usize).min(src_w - 1);
                let src_idx = (y * src_w + sx) * channels;
                row[dst_idx..dst_idx + channels].copy_from_slice(&src[src_idx..src_idx + channels]);
            }
        }
    });

    dst
}

/// Vertical bilinear pass.
fn resize_vertical(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_h: usize,
) -> Vec<f32> {
    let mut dst = vec![0.0f32; src_w * dst_h * channels];
    let scale = src_h as f32 / dst_h as f32;
    let support = Filter::Bilinear.support() * scale.max(1.0);

    for_each_row(&mut dst, src_w * channels, |y, row| {
        let center = (y as f32 + 0.5) * scale - 0.5;
        let top = ((center - support).floor() as isize).max(0) as usize;
        let bottom = ((center + support).ceil().max(0.0) as usize).min(src_h - 1);

        let taps: Vec<(usize, f32)> = (top..=bottom)
            .map(|sy| (sy, bilinear_weight((sy as f32 - center) / scale.max(1.0))))
            .filter(|&(_, w)| w > 0.0)
            .collect();
        let weight_sum: f32 = taps.iter().map(|&(_, w)| w).sum();

        if weight_sum <= 0.0 {
            let sy = (center.round().max(0.0) as usize).min(src_h - 1);
            row.copy_from_slice(&src[sy * src_w * channels..(sy + 1) * src_w * channels]);
            return;
        }

        for x in 0..src_w {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for &(sy, w) in &taps {
                    sum += src[(sy * src_w + x) * channels + c] * w;
                }
                row[x * channels + c] = sum / weight_sum;
            }
        }
    });

    dst
}

/// Dimensions `(height, width)` a source must be scaled to so that it covers
/// the target in both directions while keeping its aspect ratio.
///
/// ```rust
/// use pixblend_ops::resize::cover_dimensions;
///
/// // 1080x1920 source over a 640x640 backdrop
/// assert_eq!(cover_dimensions(1080, 1920, 640, 640), (640, 1138));
/// ```
pub fn cover_dimensions(src_h: usize, src_w: usize, dst_h: usize, dst_w: usize) -> (usize, usize) {
    let scale = (dst_h as f64 / src_h as f64).max(dst_w as f64 / src_w as f64);
    let new_h = ((src_h as f64 * scale).round() as usize).max(dst_h);
    let new_w = ((src_w as f64 * scale).round() as usize).max(dst_w);
    (new_h, new_w)
}

/// Copies the top-left `dst_h x dst_w` region out of a larger image.
fn crop_top_left(
    src: &[f32],
    src_w: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<f32> {
    let row = dst_w * channels;
    let mut out = Vec::with_capacity(row * dst_h);
    for y in 0..dst_h {
        let start = y * src_w * channels;
        out.extend_from_slice(&src[start..start + row]);
    }
    out
}

/// Resizes or covers one image according to `policy`.
fn fit_image(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
    policy: FitPolicy,
    filter: Filter,
) -> OpsResult<Vec<f32>> {
    match policy {
        FitPolicy::Stretch => resize_f32(src, src_w, src_h, channels, dst_w, dst_h, filter),
        FitPolicy::Cover => {
            let (mid_h, mid_w) = cover_dimensions(src_h, src_w, dst_h, dst_w);
            let scaled = resize_f32(src, src_w, src_h, channels, mid_w, mid_h, filter)?;
            Ok(crop_top_left(&scaled, mid_w, channels, dst_w, dst_h))
        }
    }
}

/// Fits every image of `source` to `(height, width)` using bilinear
/// resampling. Channel count and batch are preserved.
///
/// # Errors
///
/// Returns [`OpsError::InvalidDimensions`] for a zero-sized target.
pub fn fit(source: &PixelBuffer, target: (usize, usize), policy: FitPolicy) -> OpsResult<PixelBuffer> {
    let (dst_h, dst_w) = target;
    trace!(src = ?source.shape(), dst_h, dst_w, "resize::fit");
    debug!(%policy, "Fitting source to backdrop");

    let (batch, src_h, src_w, channels) = source.shape();
    let mut data = Vec::with_capacity(batch * dst_h * dst_w * channels);
    for image in source.images() {
        data.extend(fit_image(
            image,
            src_w,
            src_h,
            channels,
            dst_w,
            dst_h,
            policy,
            Filter::Bilinear,
        )?);
    }
    Ok(PixelBuffer::from_data(batch, dst_h, dst_w, channels, data)?)
}

/// Fits a mask with the same scale/crop rules as [`fit`].
///
/// Masks usually go through [`Filter::Nearest`] so hard edges stay hard.
pub fn fit_mask(
    mask: &Mask,
    target: (usize, usize),
    policy: FitPolicy,
    filter: Filter,
) -> OpsResult<Mask> {
    let (dst_h, dst_w) = target;
    trace!(src_h = mask.height(), src_w = mask.width(), dst_h, dst_w, "resize::fit_mask");

    let mut data = Vec::with_capacity(mask.batch() * dst_h * dst_w);
    for b in 0..mask.batch() {
        data.extend(fit_image(
            mask.image(b),
            mask.width(),
            mask.height(),
            1,
            dst_w,
            dst_h,
            policy,
            filter,
        )?);
    }
    Ok(Mask::from_data(mask.batch(), dst_h, dst_w, data)?)
}

/// Resizes a mask to exactly `(height, width)`.
pub fn resize_mask(mask: &Mask, target: (usize, usize), filter: Filter) -> OpsResult<Mask> {
    fit_mask(mask, target, FitPolicy::Stretch, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_resize_identity() {
        let src = vec![
            1.0, 0.0, 0.0, 1.0, // Red
            0.0, 1.0, 0.0, 1.0, // Green
            0.0, 0.0, 1.0, 1.0, // Blue
            1.0, 1.0, 1.0, 1.0, // White
        ];
        let dst = resize_f32(&src, 2, 2, 4, 2, 2, Filter::Bilinear).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_resize_upscale_constant() {
        let src = vec![0.5f32; 4 * 4 * 4];
        let dst = resize_f32(&src, 4, 4, 4, 8, 8, Filter::Bilinear).unwrap();
        assert_eq!(dst.len(), 8 * 8 * 4);
        for v in dst {
            assert_abs_diff_eq!(v, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_bilinear_upscale_interpolates() {
        // 2x1 gradient doubled: torch-style half-pixel centers
        let src = vec![0.0, 1.0];
        let dst = resize_f32(&src, 2, 1, 1, 4, 1, Filter::Bilinear).unwrap();
        assert_abs_diff_eq!(dst[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(dst[1], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(dst[2], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(dst[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nearest_keeps_hard_values() {
        let src = vec![0.0, 1.0, 1.0, 0.0];
        let dst = resize_f32(&src, 2, 2, 1, 5, 3, Filter::Nearest).unwrap();
        assert!(dst.iter().all(|&v| v == 0.0 || v == 1.0));
        assert_eq!(dst[0], 0.0);
        assert_eq!(dst[4], 1.0);
    }

    #[test]
    fn test_zero_destination_rejected() {
        let src = vec![0.0; 4];
        assert!(resize_f32(&src, 2, 2, 1, 0, 2, Filter::Bilinear).is_err());
    }

    #[test]
    fn test_cover_dimensions_cover_target() {
        for &(sh, sw, dh, dw) in &[(3, 7, 5, 5), (100, 10, 20, 33), (9, 9, 4, 13), (1, 1, 7, 3)] {
            let (h, w) = cover_dimensions(sh, sw, dh, dw);
            assert!(h >= dh && w >= dw, "{sh}x{sw} -> {h}x{w} for {dh}x{dw}");
        }
    }

    #[test]
    fn test_cover_crops_top_left() {
        // 2 rows x 4 cols, left half 0, right half 1; cover into 2x2 keeps the left
        let src = PixelBuffer::from_data(
            1, 2, 4, 3,
            [[0.0; 3], [0.0; 3], [1.0; 3], [1.0; 3], [0.0; 3], [0.0; 3], [1.0; 3], [1.0; 3]].concat(),
        )
        .unwrap();
        let out = fit(&src, (2, 2), FitPolicy::Cover).unwrap();
        assert_eq!(out.shape(), (1, 2, 2, 3));
        assert_eq!(out.pixel(0, 0, 0), &[0.0, 0.0, 0.0]);
        assert_eq!(out.pixel(0, 1, 1), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_stretch_hits_target() {
        let src = PixelBuffer::filled(2, 3, 5, &[0.2, 0.4, 0.6, 1.0]).unwrap();
        let out = fit(&src, (7, 2), FitPolicy::Stretch).unwrap();
        assert_eq!(out.shape(), (2, 7, 2, 4));
    }

    #[test]
    fn test_policy_names() {
        assert_eq!("crop".parse::<FitPolicy>().unwrap(), FitPolicy::Cover);
        assert_eq!("Stretch".parse::<FitPolicy>().unwrap(), FitPolicy::Stretch);
        assert!(matches!(
            "squeeze".parse::<FitPolicy>(),
            Err(OpsError::UnknownVariant { .. })
        ));
    }
}
