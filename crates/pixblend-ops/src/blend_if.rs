//! Blend If: composite a top layer over a bottom layer with an opacity
//! driven by one channel of either layer.
//!
//! ```text
//!   1 |        ____________
//!     |       /            \
//!   0 |______/              \______
//!          sr  er        sf  ef
//! ```
//!
//! `sr`/`er` bound the rising smoothstep, `sf`/`ef` the falling one.
//! Breakpoints are forced into `ef >= sf >= er >= sr` before use.

use std::fmt;
use std::str::FromStr;

use pixblend_core::{luminance_rec709, Mask, PixelBuffer};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::composite::{broadcast_batch, check_opacity};
use crate::mask::fitted_mask;
use crate::range::smoothstep_ramp;
use crate::resize::{fit, FitPolicy};
use crate::{OpsError, OpsResult};

/// Layer the threshold channel is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlendIfLayer {
    /// The layer being composited.
    #[default]
    Top,
    /// The layer underneath.
    Bottom,
}

/// Channel the threshold is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BlendIfChannel {
    /// BT.709 luminance.
    #[default]
    Gray,
    /// Red channel.
    Red,
    /// Green channel.
    Green,
    /// Blue channel.
    Blue,
}

impl BlendIfLayer {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl BlendIfChannel {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    /// Scalar value of one pixel.
    #[inline]
    pub fn value(self, px: &[f32]) -> f32 {
        match self {
            Self::Gray => luminance_rec709([px[0], px[1], px[2]]),
            Self::Red => px[0],
            Self::Green => px[1],
            Self::Blue => px[2],
        }
    }
}

impl fmt::Display for BlendIfLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for BlendIfChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlendIfLayer {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            _ => Err(OpsError::unknown("blend-if layer", s)),
        }
    }
}

impl FromStr for BlendIfChannel {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gray" | "grey" | "luminance" => Ok(Self::Gray),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            _ => Err(OpsError::unknown("blend-if channel", s)),
        }
    }
}

impl TryFrom<String> for BlendIfLayer {
    type Error = OpsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for BlendIfChannel {
    type Error = OpsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BlendIfLayer> for String {
    fn from(v: BlendIfLayer) -> Self {
        v.name().to_string()
    }
}

impl From<BlendIfChannel> for String {
    fn from(v: BlendIfChannel) -> Self {
        v.name().to_string()
    }
}

/// The four ramp breakpoints, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoints {
    /// Rising ramp starts.
    pub start_rise: f32,
    /// Rising ramp reaches 1.
    pub end_rise: f32,
    /// Falling ramp starts.
    pub start_fall: f32,
    /// Falling ramp reaches 0.
    pub end_fall: f32,
}

impl Breakpoints {
    /// Orders the breakpoints so that
    /// `end_fall >= start_fall >= end_rise >= start_rise`.
    ///
    /// Each breakpoint is raised to the largest of those that should lie
    /// below it; `start_rise` is never moved.
    ///
    /// ```rust
    /// use pixblend_ops::blend_if::Breakpoints;
    ///
    /// let bp = Breakpoints { start_rise: 0.6, end_rise: 0.2, start_fall: 0.9, end_fall: 0.4 }.sorted();
    /// assert_eq!(
    ///     (bp.end_fall, bp.start_fall, bp.end_rise, bp.start_rise),
    ///     (0.9, 0.9, 0.6, 0.6)
    /// );
    /// ```
    pub fn sorted(self) -> Self {
        let mut p = [self.end_fall, self.start_fall, self.end_rise, self.start_rise];
        for i in 0..p.len() - 1 {
            for j in i + 1..p.len() {
                if p[i] < p[j] {
                    p[i] = p[j];
                }
            }
        }
        let [end_fall, start_fall, end_rise, start_rise] = p;
        Self {
            start_rise,
            end_rise,
            start_fall,
            end_fall,
        }
    }

    /// Base opacity at channel value `t`. Expects sorted breakpoints.
    ///
    /// The plateau `[end_rise, start_fall]` is 1 even when the falling
    /// breakpoints coincide.
    #[inline]
    pub fn opacity(&self, t: f32) -> f32 {
        let rise = smoothstep_ramp(self.start_rise, self.end_rise, t);
        let fall = if t <= self.start_fall {
            1.0
        } else {
            1.0 - smoothstep_ramp(self.start_fall, self.end_fall, t)
        };
        rise.min(fall)
    }
}

/// Blend If parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendIfParams {
    /// Layer the threshold channel is read from.
    pub layer: BlendIfLayer,
    /// Threshold channel.
    pub channel: BlendIfChannel,
    /// Rising ramp starts.
    pub start_rise: f32,
    /// Rising ramp reaches 1.
    pub end_rise: f32,
    /// Falling ramp starts.
    pub start_fall: f32,
    /// Falling ramp reaches 0.
    pub end_fall: f32,
    /// Global opacity in `[0, 1]`.
    pub opacity: f32,
    /// How the top layer and mask are fitted to the bottom layer.
    pub fit_policy: FitPolicy,
    /// Invert the external mask.
    pub invert_mask: bool,
}

impl Default for BlendIfParams {
    fn default() -> Self {
        Self {
            layer: BlendIfLayer::Top,
            channel: BlendIfChannel::Gray,
            start_rise: 0.0,
            end_rise: 0.0,
            start_fall: 1.0,
            end_fall: 1.0,
            opacity: 1.0,
            fit_policy: FitPolicy::Cover,
            invert_mask: true,
        }
    }
}

impl BlendIfParams {
    /// Breakpoints after ordering.
    pub fn breakpoints(&self) -> Breakpoints {
        Breakpoints {
            start_rise: self.start_rise,
            end_rise: self.end_rise,
            start_fall: self.start_fall,
            end_fall: self.end_fall,
        }
        .sorted()
    }
}

/// Composites `top` over `bottom` with a channel-driven opacity.
///
/// The top layer is fitted bilinearly and `mask` with nearest-neighbor to
/// the bottom layer. Alpha channels are ignored and the output is RGB.
/// Returns the composite and the base opacity (before mask and global
/// opacity).
///
/// # Errors
///
/// Fails on batch mismatch or an out-of-range opacity.
pub fn blend_if(
    top: &PixelBuffer,
    bottom: &PixelBuffer,
    params: &BlendIfParams,
    mask: Option<&Mask>,
) -> OpsResult<(PixelBuffer, Mask)> {
    let (batch, height, width, _) = bottom.shape();
    trace!(top = ?top.shape(), bottom = ?bottom.shape(), has_mask = mask.is_some(), "blend_if::blend_if");
    debug!(
        layer = %params.layer,
        channel = %params.channel,
        opacity = params.opacity,
        "Blend if"
    );
    check_opacity(params.opacity)?;

    let bp = params.breakpoints();
    let top = fit(&top.rgb_only(), (height, width), params.fit_policy)?;
    let top = broadcast_batch(top, batch)?;
    if top.batch() != batch {
        return Err(OpsError::BatchMismatch {
            backdrop: batch,
            source_batch: top.batch(),
        });
    }
    let bottom = bottom.rgb_only();
    let mask = fitted_mask(mask, batch, (height, width), params.fit_policy, params.invert_mask)?;

    let mut data = Vec::with_capacity(batch * height * width * 3);
    let mut base = Vec::with_capacity(batch * height * width);
    for b in 0..batch {
        let ext = mask.as_ref().map(|m| m.image_for(b));
        let pixels = top.image(b).chunks_exact(3).zip(bottom.image(b).chunks_exact(3));
        for (i, (t, u)) in pixels.enumerate() {
            let driver = match params.layer {
                BlendIfLayer::Top => t,
                BlendIfLayer::Bottom => u,
            };
            let o = bp.opacity(params.channel.value(driver));
            let m = ext.map_or(1.0, |e| e[i]);
            let f = o * m * params.opacity;
            for c in 0..3 {
                data.push(f * t[c] + (1.0 - f) * u[c]);
            }
            base.push(o);
        }
    }

    Ok((
        PixelBuffer::from_data(batch, height, width, 3, data)?,
        Mask::from_data(batch, height, width, base)?,
    ))
}
