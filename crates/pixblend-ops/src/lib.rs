//! # pixblend-ops
//!
//! Per-pixel compositing and tonal adjustment over batched float buffers.
//!
//! # Modules
//!
//! - [`blend`] - 30 blend modes as pure RGB functions
//! - [`composite`] - alpha/opacity compositing and full layer blends
//! - [`mask`] - alpha resolution from external masks
//! - [`resize`] - stretch and cover fitting
//! - [`color`] - RGB <-> HSV
//! - [`range`] - soft range selection masks
//! - [`levels`], [`color_balance`], [`hue_sat`], [`black_white`] - tonal
//!   adjustments
//! - [`blend_if`] - channel-threshold compositing
//! - [`recipe`] - YAML chains of tonal adjustments
//!
//! # Example
//!
//! ```rust
//! use pixblend_core::PixelBuffer;
//! use pixblend_ops::{blend_layers, BlendMode, BlendParams};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let backdrop = PixelBuffer::filled(1, 4, 4, &[0.0, 0.0, 0.0]).unwrap();
//! let source = PixelBuffer::filled(1, 8, 8, &[0.3, 0.3, 0.3, 1.0]).unwrap();
//! let params = BlendParams::new(BlendMode::Screen, 1.0);
//!
//! let out = blend_layers(&backdrop, &source, &params, None, &mut StdRng::seed_from_u64(0)).unwrap();
//! assert_eq!(out.shape(), (1, 4, 4, 4));
//! assert!((out.pixel(0, 2, 2)[0] - 0.3).abs() < 1e-5);
//! ```
//!
//! # Features
//!
//! - `parallel` (default) - run per-pixel work on the Rayon pool. Output is
//!   identical with the feature off.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod parallel;

pub mod black_white;
pub mod blend;
pub mod blend_if;
pub mod color;
pub mod color_balance;
pub mod composite;
pub mod hue_sat;
pub mod levels;
pub mod mask;
pub mod range;
pub mod recipe;
pub mod resize;
pub mod spline;

pub use blend::BlendMode;
pub use composite::{blend_layers, composite, BlendParams};
pub use error::{OpsError, OpsResult};
pub use recipe::Recipe;
pub use resize::{FitPolicy, Filter};
