//! Alpha compositing of blended layers.
//!
//! The compositor mixes a blend-mode result back over the backdrop using the
//! source alpha and a global opacity. It is not Porter-Duff "over": the
//! output alpha is always the backdrop's alpha.
//!
//! - [`composite_pixel`] - one pixel
//! - [`composite`] - two same-shape buffers
//! - [`blend_layers`] - full layer blend: mask resolution, source fitting,
//!   then [`composite`]
//!
//! # Example
//!
//! ```rust
//! use pixblend_core::PixelBuffer;
//! use pixblend_ops::blend::BlendMode;
//! use pixblend_ops::composite::composite;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let backdrop = PixelBuffer::filled(1, 2, 2, &[1.0, 1.0, 1.0, 1.0]).unwrap();
//! let source = PixelBuffer::filled(1, 2, 2, &[0.5, 0.5, 0.5, 1.0]).unwrap();
//! let mut rng = StdRng::seed_from_u64(7);
//!
//! let out = composite(&backdrop, &source, BlendMode::Multiply, 1.0, &mut rng).unwrap();
//! assert_eq!(out.pixel(0, 0, 0), &[0.5, 0.5, 0.5, 1.0]);
//! ```

use pixblend_core::{clamp01, Mask, PixelBuffer};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::blend::{blend_pixel, BlendMode};
use crate::mask::with_resolved_alpha;
use crate::parallel::map_pixels;
use crate::resize::{fit, FitPolicy};
use crate::{OpsError, OpsResult};

/// Parameters of a full layer blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendParams {
    /// Blend mode.
    pub mode: BlendMode,
    /// Global opacity in `[0, 1]`.
    pub opacity: f32,
    /// How the source is fitted to the backdrop.
    pub fit_policy: FitPolicy,
    /// Invert the external mask before it becomes the source alpha.
    ///
    /// Defaults to `true`: host masks conventionally mark transparent
    /// areas with 1.
    pub invert_mask: bool,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            mode: BlendMode::Normal,
            opacity: 1.0,
            fit_policy: FitPolicy::Cover,
            invert_mask: true,
        }
    }
}

impl BlendParams {
    /// Params for `mode` at `opacity`, other fields default.
    pub fn new(mode: BlendMode, opacity: f32) -> Self {
        Self {
            mode,
            opacity,
            ..Self::default()
        }
    }
}

/// Composites one pixel and returns the new RGB.
///
/// `sample` is the uniform draw used by [`BlendMode::Dissolve`]; other modes
/// ignore it.
///
/// When `opacity * source_alpha` is zero the backdrop is returned
/// bit-for-bit.
#[inline]
pub fn composite_pixel(
    mode: BlendMode,
    backdrop: [f32; 3],
    source: [f32; 3],
    source_alpha: f32,
    opacity: f32,
    sample: f32,
) -> [f32; 3] {
    let weight = opacity * source_alpha;
    if weight <= 0.0 {
        return backdrop;
    }

    let blended = blend_pixel(mode, backdrop, source, weight, sample);
    let mix = if mode.weighs_itself() {
        source_alpha
    } else {
        weight
    };

    let inv = 1.0 - mix;
    [
        clamp01(inv * backdrop[0] + mix * blended[0]),
        clamp01(inv * backdrop[1] + mix * blended[1]),
        clamp01(inv * backdrop[2] + mix * blended[2]),
    ]
}

/// Checks that `opacity` lies in `[0, 1]`.
pub(crate) fn check_opacity(opacity: f32) -> OpsResult<()> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(())
    } else {
        Err(OpsError::InvalidParameter(format!(
            "opacity must be in [0, 1], got {opacity}"
        )))
    }
}

/// Composites `source` over `backdrop` with `mode` and a global `opacity`.
///
/// Both buffers must share batch, height and width. A buffer without an
/// alpha channel is treated as opaque. The output is RGBA carrying the
/// backdrop's alpha.
///
/// `rng` is only drawn from for [`BlendMode::Dissolve`], one value per
/// pixel in buffer order, so a seeded generator reproduces the result.
///
/// # Errors
///
/// - [`OpsError::BatchMismatch`] if the batches differ
/// - [`OpsError::SizeMismatch`] if height or width differ
/// - [`OpsError::InvalidParameter`] if `opacity` is outside `[0, 1]`
pub fn composite<R: Rng + ?Sized>(
    backdrop: &PixelBuffer,
    source: &PixelBuffer,
    mode: BlendMode,
    opacity: f32,
    rng: &mut R,
) -> OpsResult<PixelBuffer> {
    let (batch, height, width, bc) = backdrop.shape();
    trace!(batch, height, width, "composite::composite");
    debug!(%mode, opacity, "Compositing layers");

    if source.batch() != batch {
        return Err(OpsError::BatchMismatch {
            backdrop: batch,
            source_batch: source.batch(),
        });
    }
    if source.height() != height || source.width() != width {
        return Err(OpsError::SizeMismatch(format!(
            "backdrop is {}x{}, source is {}x{}",
            width,
            height,
            source.width(),
            source.height()
        )));
    }
    check_opacity(opacity)?;

    let samples: Vec<f32> = if mode.is_stochastic() {
        (0..batch * height * width)
            .map(|_| rng.gen_range(0.0f32..1.0))
            .collect()
    } else {
        Vec::new()
    };

    let sc = source.channels();
    let src = source.data();
    let data = map_pixels(backdrop.data(), bc, 4, |idx, b, out| {
        let s = &src[idx * sc..(idx + 1) * sc];
        let source_alpha = if sc == 4 { s[3] } else { 1.0 };
        let sample = samples.get(idx).copied().unwrap_or(1.0);
        let rgb = composite_pixel(
            mode,
            [b[0], b[1], b[2]],
            [s[0], s[1], s[2]],
            source_alpha,
            opacity,
            sample,
        );
        out[..3].copy_from_slice(&rgb);
        out[3] = if bc == 4 { b[3] } else { 1.0 };
    });

    Ok(PixelBuffer::from_data(batch, height, width, 4, data)?)
}

/// Blends a whole layer over a backdrop.
///
/// 1. The backdrop keeps its own alpha (opaque when it has none).
/// 2. The source alpha comes from `mask` when given (resized bilinearly to
///    the source, inverted per `params.invert_mask`), else from the source.
/// 3. The source is fitted to the backdrop with `params.fit_policy`.
/// 4. The two are passed to [`composite`].
///
/// A single-image source or mask is broadcast over the backdrop batch.
///
/// # Errors
///
/// Fails on batch mismatch or an out-of-range opacity.
pub fn blend_layers<R: Rng + ?Sized>(
    backdrop: &PixelBuffer,
    source: &PixelBuffer,
    params: &BlendParams,
    mask: Option<&Mask>,
    rng: &mut R,
) -> OpsResult<PixelBuffer> {
    trace!(
        backdrop = ?backdrop.shape(),
        source = ?source.shape(),
        has_mask = mask.is_some(),
        "composite::blend_layers"
    );
    debug!(mode = %params.mode, opacity = params.opacity, fit = %params.fit_policy, "Blending layer");

    let source = with_resolved_alpha(source, mask, params.invert_mask)?;
    let source = fit(&source, (backdrop.height(), backdrop.width()), params.fit_policy)?;
    let source = broadcast_batch(source, backdrop.batch())?;

    composite(backdrop, &source, params.mode, params.opacity, rng)
}

/// Repeats a single-image buffer `batch` times. Other buffers are
/// returned as is.
pub(crate) fn broadcast_batch(buffer: PixelBuffer, batch: usize) -> OpsResult<PixelBuffer> {
    if buffer.batch() == batch || buffer.batch() != 1 {
        return Ok(buffer);
    }
    let (_, height, width, channels) = buffer.shape();
    let data = buffer.data().repeat(batch);
    Ok(PixelBuffer::from_data(batch, height, width, channels, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_zero_opacity_is_noop() {
        let b = [0.2, 0.4, 0.6];
        for mode in BlendMode::ALL {
            assert_eq!(composite_pixel(mode, b, [0.9, 0.1, 0.5], 1.0, 0.0, 0.0), b);
            assert_eq!(composite_pixel(mode, b, [0.9, 0.1, 0.5], 0.0, 1.0, 0.0), b);
        }
    }

    #[test]
    fn test_half_opacity_multiply() {
        // blend = 0.4, mixed halfway with 0.8
        let out = composite_pixel(BlendMode::Multiply, [0.8; 3], [0.5; 3], 1.0, 0.5, 0.0);
        assert_abs_diff_eq!(out[0], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_self_weighted_modes_mix_by_alpha() {
        // Luminosity at weight 0.5 already moves V halfway; the outer mix
        // uses source alpha 1, so the interpolated value is final.
        let out = composite_pixel(BlendMode::Luminosity, [0.4, 0.2, 0.2], [1.0; 3], 1.0, 0.5, 0.0);
        assert_abs_diff_eq!(out[0], 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_alpha_is_backdrop_alpha() {
        let backdrop = PixelBuffer::filled(1, 2, 3, &[0.1, 0.2, 0.3, 0.25]).unwrap();
        let source = PixelBuffer::filled(1, 2, 3, &[0.9, 0.9, 0.9, 1.0]).unwrap();
        let out = composite(&backdrop, &source, BlendMode::Screen, 1.0, &mut rng()).unwrap();
        assert!(out.data().chunks_exact(4).all(|px| px[3] == 0.25));
    }

    #[test]
    fn test_rgb_inputs_are_opaque() {
        let backdrop = PixelBuffer::filled(1, 1, 1, &[0.0, 0.0, 0.0]).unwrap();
        let source = PixelBuffer::filled(1, 1, 1, &[0.3, 0.3, 0.3]).unwrap();
        let out = composite(&backdrop, &source, BlendMode::Normal, 1.0, &mut rng()).unwrap();
        assert_abs_diff_eq!(out.pixel(0, 0, 0)[0], 0.3, epsilon = 1e-6);
        assert_eq!(out.pixel(0, 0, 0)[3], 1.0);
    }

    #[test]
    fn test_shape_errors() {
        let a = PixelBuffer::filled(2, 2, 2, &[0.0; 4]).unwrap();
        let b = PixelBuffer::filled(1, 2, 2, &[0.0; 4]).unwrap();
        let c = PixelBuffer::filled(2, 3, 2, &[0.0; 4]).unwrap();
        assert!(matches!(
            composite(&a, &b, BlendMode::Normal, 1.0, &mut rng()),
            Err(OpsError::BatchMismatch { backdrop: 2, source_batch: 1 })
        ));
        assert!(matches!(
            composite(&a, &c, BlendMode::Normal, 1.0, &mut rng()),
            Err(OpsError::SizeMismatch(_))
        ));
        assert!(matches!(
            composite(&a, &a, BlendMode::Normal, 1.5, &mut rng()),
            Err(OpsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_dissolve_is_seeded() {
        let backdrop = PixelBuffer::filled(1, 8, 8, &[0.0, 0.0, 0.0, 1.0]).unwrap();
        let source = PixelBuffer::filled(1, 8, 8, &[1.0, 1.0, 1.0, 1.0]).unwrap();
        let a = composite(&backdrop, &source, BlendMode::Dissolve, 0.5, &mut rng()).unwrap();
        let b = composite(&backdrop, &source, BlendMode::Dissolve, 0.5, &mut rng()).unwrap();
        assert_eq!(a, b);
        // Every pixel is taken whole from one layer
        assert!(a.data().chunks_exact(4).all(|px| px[0] == 0.0 || px[0] == 1.0));
    }

    #[test]
    fn test_blend_layers_fits_and_masks() {
        let backdrop = PixelBuffer::filled(1, 4, 4, &[1.0, 1.0, 1.0, 1.0]).unwrap();
        let source = PixelBuffer::filled(1, 2, 2, &[0.5, 0.5, 0.5]).unwrap();
        // Mask of 1 inverted to 0: source fully transparent
        let mask = Mask::ones(1, 2, 2).unwrap();
        let params = BlendParams::new(BlendMode::Multiply, 1.0);
        let out = blend_layers(&backdrop, &source, &params, Some(&mask), &mut rng()).unwrap();
        assert_eq!(out.shape(), (1, 4, 4, 4));
        assert!(out.data().iter().all(|&v| v == 1.0));

        let params = BlendParams {
            invert_mask: false,
            ..params
        };
        let out = blend_layers(&backdrop, &source, &params, Some(&mask), &mut rng()).unwrap();
        assert_abs_diff_eq!(out.pixel(0, 3, 3)[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_blend_layers_broadcasts_source() {
        let backdrop = PixelBuffer::filled(3, 2, 2, &[0.0, 0.0, 0.0]).unwrap();
        let source = PixelBuffer::filled(1, 2, 2, &[0.3, 0.3, 0.3]).unwrap();
        let params = BlendParams::new(BlendMode::Screen, 1.0);
        let out = blend_layers(&backdrop, &source, &params, None, &mut rng()).unwrap();
        assert_eq!(out.batch(), 3);
        assert_abs_diff_eq!(out.pixel(2, 1, 1)[1], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_params_yaml() {
        let p: BlendParams = serde_yaml::from_str("mode: soft light\nopacity: 0.5\n").unwrap();
        assert_eq!(p.mode, BlendMode::SoftLight);
        assert_eq!(p.fit_policy, FitPolicy::Cover);
        assert!(p.invert_mask);
    }
}
