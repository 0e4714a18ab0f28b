//! Hue/Saturation adjustment restricted to a hue range.
//!
//! The image is converted to HSV, a circular hue selection is built with
//! [`crate::range`], hue/saturation/lightness offsets are applied, and the
//! adjusted pixels are mixed back into the original through the selection.
//!
//! Two entry points:
//! - [`hue_sat`] - explicit range in degrees with independent feathers
//! - [`hue_sat_preset`] - named hue family, width and feather

use std::fmt;
use std::str::FromStr;

use pixblend_core::{clamp01, Mask, PixelBuffer};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::color::{hsv_to_rgb_pixel, rgb_to_hsv_pixel};
use crate::parallel::map_pixels;
use crate::range::{hue_selection, RangeSelector};
use crate::{OpsError, OpsResult};

/// Offsets applied inside the selection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HslOffsets {
    /// Hue rotation in degrees, `[-180, 180]`.
    pub hue_offset: f32,
    /// Saturation change in percent, `[-100, 100]`.
    pub sat_offset: f32,
    /// Lightness change in percent, `[-100, 100]`.
    pub lightness_offset: f32,
}

impl HslOffsets {
    /// Applies the offsets to one HSV pixel.
    #[inline]
    pub fn apply(&self, hsv: [f32; 3]) -> [f32; 3] {
        let [mut h, mut s, mut v] = hsv;

        h = (h + self.hue_offset / 360.0).rem_euclid(1.0);

        let so = self.sat_offset / 100.0;
        s = if so < 0.0 {
            clamp01(s + so * s)
        } else {
            clamp01(s + so * (1.0 - s))
        };

        let lo = self.lightness_offset / 100.0;
        if lo < 0.0 {
            v *= 1.0 + lo;
        } else if lo > 0.0 {
            v = v * (1.0 - lo) + lo;
            s *= (1.0 - lo).powf(0.45);
        }

        [h, s, v]
    }
}

/// Hue/Saturation with an explicit hue range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HueSatParams {
    /// Start of the selected range in degrees, `[0, 360]`.
    pub hue_low: f32,
    /// Feather below `hue_low` in degrees, `[0, 180]`.
    pub hue_low_feather: f32,
    /// End of the selected range in degrees, `[0, 360]`.
    pub hue_high: f32,
    /// Feather above `hue_high` in degrees, `[0, 180]`.
    pub hue_high_feather: f32,
    /// Offsets applied inside the range.
    #[serde(flatten)]
    pub offsets: HslOffsets,
}

impl Default for HueSatParams {
    fn default() -> Self {
        Self {
            hue_low: 0.0,
            hue_low_feather: 0.0,
            hue_high: 360.0,
            hue_high_feather: 0.0,
            offsets: HslOffsets::default(),
        }
    }
}

impl HueSatParams {
    /// The hue selection these params describe.
    pub fn selector(&self) -> RangeSelector {
        RangeSelector::from_degrees(
            self.hue_low,
            self.hue_high,
            self.hue_low_feather,
            self.hue_high_feather,
        )
    }
}

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Display name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = OpsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(OpsError::unknown($kind, s)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = OpsError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.name().to_string()
            }
        }
    };
}

named_enum!(
    /// Named hue family.
    HuePreset, "hue", {
        #[default]
        /// 0 degrees.
        Red => "red",
        /// 60 degrees.
        Yellow => "yellow",
        /// 120 degrees.
        Green => "green",
        /// 180 degrees.
        Cyan => "cyan",
        /// 240 degrees.
        Blue => "blue",
        /// 300 degrees.
        Magenta => "magenta",
    }
);

named_enum!(
    /// Width of the fully selected arc.
    HueWidth, "hue width", {
        /// 15 degrees.
        Narrow => "narrow",
        #[default]
        /// 30 degrees.
        Normal => "normal",
        /// 60 degrees.
        Wide => "wide",
    }
);

named_enum!(
    /// Total feather, split evenly between both sides.
    HueFeather, "feather", {
        /// Hard edges.
        None => "none",
        #[default]
        /// 25 degrees.
        Normal => "normal",
        /// 50 degrees.
        Wide => "wide",
    }
);

impl HuePreset {
    /// Center of the family in degrees.
    pub fn degrees(self) -> f32 {
        match self {
            Self::Red => 0.0,
            Self::Yellow => 60.0,
            Self::Green => 120.0,
            Self::Cyan => 180.0,
            Self::Blue => 240.0,
            Self::Magenta => 300.0,
        }
    }
}

impl HueWidth {
    /// Arc width in degrees.
    pub fn degrees(self) -> f32 {
        match self {
            Self::Narrow => 15.0,
            Self::Normal => 30.0,
            Self::Wide => 60.0,
        }
    }
}

impl HueFeather {
    /// Total feather in degrees.
    pub fn degrees(self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Normal => 25.0,
            Self::Wide => 50.0,
        }
    }
}

/// Hue/Saturation with a named hue family.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HueSatPresetParams {
    /// Hue family to select.
    pub hue: HuePreset,
    /// Width of the selected arc.
    pub hue_width: HueWidth,
    /// Feather of the arc edges.
    pub feather: HueFeather,
    /// Offsets applied inside the range.
    #[serde(flatten)]
    pub offsets: HslOffsets,
}

impl HueSatPresetParams {
    /// Expands the preset into explicit range params.
    pub fn to_params(&self) -> HueSatParams {
        let center = self.hue.degrees();
        let half = self.hue_width.degrees() / 2.0;
        let mut low = center - half;
        if low < 0.0 {
            low += 360.0;
        }
        let feather = self.feather.degrees() / 2.0;
        HueSatParams {
            hue_low: low,
            hue_low_feather: feather,
            hue_high: center + half,
            hue_high_feather: feather,
            offsets: self.offsets,
        }
    }
}

/// Applies a hue-ranged HSL adjustment.
///
/// Returns the adjusted image and the hue selection mask. Achromatic
/// pixels are never selected. Alpha passes through.
///
/// ```rust
/// use pixblend_core::PixelBuffer;
/// use pixblend_ops::hue_sat::{hue_sat, HueSatParams, HslOffsets};
///
/// let img = PixelBuffer::from_data(1, 1, 2, 3, vec![1.0, 0.0, 0.0, 0.5, 0.5, 0.5]).unwrap();
/// let params = HueSatParams {
///     offsets: HslOffsets { hue_offset: 120.0, ..Default::default() },
///     ..Default::default()
/// };
/// let (out, mask) = hue_sat(&img, &params).unwrap();
/// assert_eq!(mask.data(), &[1.0, 0.0]);
/// assert!((out.pixel(0, 0, 0)[1] - 1.0).abs() < 1e-6);
/// assert_eq!(out.pixel(0, 0, 1), &[0.5, 0.5, 0.5]);
/// ```
pub fn hue_sat(image: &PixelBuffer, params: &HueSatParams) -> OpsResult<(PixelBuffer, Mask)> {
    let (batch, height, width, channels) = image.shape();
    trace!(batch, height, width, "hue_sat::hue_sat");
    debug!(
        low = params.hue_low,
        high = params.hue_high,
        offsets = ?params.offsets,
        "Applying hue/saturation"
    );

    let selector = params.selector();
    let offsets = params.offsets;

    // Output pixel plus its mask value in the trailing slot
    let packed = map_pixels(image.data(), channels, channels + 1, |_, src, dst| {
        let rgb = [src[0], src[1], src[2]];
        let hsv = rgb_to_hsv_pixel(rgb);
        let m = hue_selection(hsv, &selector);
        let adjusted = hsv_to_rgb_pixel(offsets.apply(hsv));
        for c in 0..3 {
            dst[c] = m * adjusted[c] + (1.0 - m) * rgb[c];
        }
        if channels == 4 {
            dst[3] = src[3];
        }
        dst[channels] = m;
    });

    let mut data = Vec::with_capacity(batch * height * width * channels);
    let mut mask = Vec::with_capacity(batch * height * width);
    for px in packed.chunks_exact(channels + 1) {
        data.extend_from_slice(&px[..channels]);
        mask.push(px[channels]);
    }

    Ok((
        PixelBuffer::from_data(batch, height, width, channels, data)?,
        Mask::from_data(batch, height, width, mask)?,
    ))
}

/// Applies a hue/saturation adjustment to a named hue family.
pub fn hue_sat_preset(
    image: &PixelBuffer,
    params: &HueSatPresetParams,
) -> OpsResult<(PixelBuffer, Mask)> {
    debug!(hue = %params.hue, width = %params.hue_width, feather = %params.feather, "Hue/saturation preset");
    hue_sat(image, &params.to_params())
}
