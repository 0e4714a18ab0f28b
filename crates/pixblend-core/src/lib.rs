//! # pixblend-core
//!
//! Core buffer types for per-pixel compositing and tonal adjustment.
//!
//! - [`PixelBuffer`] - batched NHWC float buffer, 3 (RGB) or 4 (RGBA) channels
//! - [`Mask`] - batched single-channel buffer
//! - [`luminance_rec709`] - BT.709 luminance weights
//!
//! ## Crate Structure
//!
//! ```text
//! pixblend-core (this crate)
//!    ^
//!    |
//!    +-- pixblend-ops (blend modes, compositing, tone curves)
//!    +-- pixblend-bench
//! ```
//!
//! All values are conceptually normalized to `[0, 1]`. Buffers are plain
//! owned data: operations borrow their inputs and return new buffers.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod pixel;

pub use buffer::{Mask, PixelBuffer};
pub use error::{Error, Result};
pub use pixel::{clamp01, luminance_rec709, REC709_LUMA, REC709_LUMA_B, REC709_LUMA_G, REC709_LUMA_R};
