//! Alpha resolution for layers.
//!
//! A layer's alpha comes from, in order of preference:
//! 1. an external mask (resized to the image, optionally inverted),
//! 2. the image's own 4th channel,
//! 3. an implicit fully opaque channel.

use pixblend_core::{Mask, PixelBuffer};
use tracing::trace;

use crate::resize::{fit_mask, resize_mask, Filter, FitPolicy};
use crate::OpsResult;

/// Resolves the per-pixel alpha for `image`.
///
/// An external `mask` is resized bilinearly to the image's height and width,
/// inverted when `invert` is set, and replaces any existing alpha channel.
/// `invert` has no effect without a mask.
///
/// # Errors
///
/// Fails if the mask batch is neither 1 nor the image batch.
///
/// ```rust
/// use pixblend_core::{Mask, PixelBuffer};
/// use pixblend_ops::mask::resolve_alpha;
///
/// let img = PixelBuffer::filled(1, 2, 2, &[1.0, 0.0, 0.0]).unwrap();
/// assert_eq!(resolve_alpha(&img, None, true).unwrap().data(), &[1.0; 4]);
///
/// let mask = Mask::filled(1, 1, 1, 0.25).unwrap();
/// let alpha = resolve_alpha(&img, Some(&mask), true).unwrap();
/// assert_eq!(alpha.data(), &[0.75; 4]);
/// ```
pub fn resolve_alpha(image: &PixelBuffer, mask: Option<&Mask>, invert: bool) -> OpsResult<Mask> {
    let (batch, height, width, _) = image.shape();
    trace!(batch, height, width, has_mask = mask.is_some(), invert, "mask::resolve_alpha");

    let Some(mask) = mask else {
        return Ok(match image.alpha() {
            Some(alpha) => alpha,
            None => Mask::ones(batch, height, width)?,
        });
    };

    mask.check_broadcast(batch)?;
    let resized = resize_mask(mask, (height, width), Filter::Bilinear)?;
    Ok(if invert { resized.inverted() } else { resized })
}

/// Returns `image` as RGBA with its alpha resolved by [`resolve_alpha`].
pub fn with_resolved_alpha(
    image: &PixelBuffer,
    mask: Option<&Mask>,
    invert: bool,
) -> OpsResult<PixelBuffer> {
    let alpha = resolve_alpha(image, mask, invert)?;
    Ok(image.with_alpha(&alpha)?)
}

/// Combines an optional external mask into a per-pixel multiplier for a
/// `(height, width)` target, fitted with `policy` and nearest-neighbor
/// sampling. Absent masks yield `None` so callers can skip the multiply.
pub(crate) fn fitted_mask(
    mask: Option<&Mask>,
    batch: usize,
    target: (usize, usize),
    policy: FitPolicy,
    invert: bool,
) -> OpsResult<Option<Mask>> {
    let Some(mask) = mask else {
        return Ok(None);
    };
    mask.check_broadcast(batch)?;
    let fitted = fit_mask(mask, target, policy, Filter::Nearest)?;
    Ok(Some(if invert { fitted.inverted() } else { fitted }))
}
