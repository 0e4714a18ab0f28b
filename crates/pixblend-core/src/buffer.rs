//! Batched pixel and mask buffers.
//!
//! This module provides the two containers every operation works on:
//! - [`PixelBuffer`] - `batch x height x width x channels` floats, channels 3 or 4
//! - [`Mask`] - `batch x height x width` floats, a single channel
//!
//! # Memory Layout
//!
//! Buffers store images back to back, each in **row-major** order,
//! top-to-bottom, with channels interleaved:
//!
//! ```text
//! Image 0: [R G B A R G B A ...]  <- Row 0
//!          [R G B A R G B A ...]  <- Row 1
//!          ...
//! Image 1: ...
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pixblend_core::{Mask, PixelBuffer};
//!
//! let img = PixelBuffer::filled(1, 4, 4, &[1.0, 0.5, 0.25, 1.0]).unwrap();
//! assert!(img.has_alpha());
//! assert_eq!(img.pixel(0, 2, 3), &[1.0, 0.5, 0.25, 1.0]);
//!
//! let mask = Mask::ones(1, 4, 4).unwrap();
//! assert_eq!(mask.inverted().value(0, 0, 0), 0.0);
//! ```

use crate::{Error, Result};

/// Validates a batch/height/width triple and returns the per-image pixel count.
fn checked_area(batch: usize, height: usize, width: usize) -> Result<usize> {
    if batch == 0 || height == 0 || width == 0 {
        return Err(Error::invalid_dimensions(
            width,
            height,
            format!("zero-area buffer (batch {batch})"),
        ));
    }
    height
        .checked_mul(width)
        .and_then(|v| v.checked_mul(batch).map(|_| v))
        .ok_or_else(|| Error::invalid_dimensions(width, height, "dimensions overflow"))
}

/// Owned batch of RGB or RGBA float images.
///
/// Every image in the batch shares the same height, width and channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    data: Vec<f32>,
    batch: usize,
    height: usize,
    width: usize,
    channels: usize,
}

impl PixelBuffer {
    /// Creates a zero-filled buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for zero-area shapes and
    /// [`Error::UnsupportedChannels`] unless `channels` is 3 or 4.
    pub fn new(batch: usize, height: usize, width: usize, channels: usize) -> Result<Self> {
        let area = checked_area(batch, height, width)?;
        if channels != 3 && channels != 4 {
            return Err(Error::UnsupportedChannels(channels));
        }
        Ok(Self {
            data: vec![0.0; area * batch * channels],
            batch,
            height,
            width,
            channels,
        })
    }

    /// Creates a buffer from existing NHWC data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `data.len()` does not equal
    /// `batch * height * width * channels`.
    ///
    /// ```rust
    /// use pixblend_core::PixelBuffer;
    ///
    /// let buf = PixelBuffer::from_data(1, 1, 2, 3, vec![0.0; 6]).unwrap();
    /// assert_eq!(buf.pixel_count(), 2);
    /// assert!(PixelBuffer::from_data(1, 1, 2, 3, vec![0.0; 5]).is_err());
    /// ```
    pub fn from_data(
        batch: usize,
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self> {
        let area = checked_area(batch, height, width)?;
        if channels != 3 && channels != 4 {
            return Err(Error::UnsupportedChannels(channels));
        }
        let expected = area * batch * channels;
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} elements, got {}", expected, data.len()),
            ));
        }
        Ok(Self {
            data,
            batch,
            height,
            width,
            channels,
        })
    }

    /// Creates a buffer where every pixel equals `pixel`.
    ///
    /// The channel count is taken from `pixel.len()`.
    pub fn filled(batch: usize, height: usize, width: usize, pixel: &[f32]) -> Result<Self> {
        let mut buf = Self::new(batch, height, width, pixel.len())?;
        for px in buf.data.chunks_exact_mut(pixel.len()) {
            px.copy_from_slice(pixel);
        }
        Ok(buf)
    }

    /// Number of images in the batch.
    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Channels per pixel (3 or 4).
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// `(batch, height, width, channels)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (self.batch, self.height, self.width, self.channels)
    }

    /// True when the buffer carries a 4th (alpha) channel.
    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Pixels per image.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }

    /// Floats per image.
    #[inline]
    pub fn image_len(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// Raw NHWC data.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the buffer and returns its data.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// One image of the batch.
    ///
    /// # Panics
    ///
    /// Panics if `index >= batch`.
    #[inline]
    pub fn image(&self, index: usize) -> &[f32] {
        let len = self.image_len();
        &self.data[index * len..(index + 1) * len]
    }

    /// Iterates over the images of the batch.
    pub fn images(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.image_len())
    }

    /// Channel values of a single pixel.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of range.
    #[inline]
    pub fn pixel(&self, index: usize, y: usize, x: usize) -> &[f32] {
        let start = ((index * self.height + y) * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Drops the alpha channel if present.
    pub fn rgb_only(&self) -> PixelBuffer {
        if !self.has_alpha() {
            return self.clone();
        }
        let data = self
            .data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Self {
            data,
            batch: self.batch,
            height: self.height,
            width: self.width,
            channels: 3,
        }
    }

    /// Extracts the alpha channel, if the buffer has one.
    pub fn alpha(&self) -> Option<Mask> {
        if !self.has_alpha() {
            return None;
        }
        Some(Mask {
            data: self.data.chunks_exact(4).map(|px| px[3]).collect(),
            batch: self.batch,
            height: self.height,
            width: self.width,
        })
    }

    /// Returns an RGBA copy whose alpha channel is `alpha`.
    ///
    /// Any existing alpha channel is overwritten. A single-image mask is
    /// broadcast over the whole batch.
    ///
    /// # Errors
    ///
    /// Fails if the mask's height/width differ from this buffer's or its
    /// batch is neither 1 nor equal to this buffer's batch.
    pub fn with_alpha(&self, alpha: &Mask) -> Result<PixelBuffer> {
        if alpha.height() != self.height || alpha.width() != self.width {
            return Err(Error::invalid_dimensions(
                alpha.width(),
                alpha.height(),
                format!("alpha must be {}x{}", self.width, self.height),
            ));
        }
        alpha.check_broadcast(self.batch)?;

        let pixels = self.pixel_count();
        let mut data = Vec::with_capacity(self.batch * pixels * 4);
        for (b, image) in self.images().enumerate() {
            let a = alpha.image_for(b);
            for (px, &av) in image.chunks_exact(self.channels).zip(a) {
                data.extend_from_slice(&[px[0], px[1], px[2], av]);
            }
        }
        Ok(Self {
            data,
            batch: self.batch,
            height: self.height,
            width: self.width,
            channels: 4,
        })
    }
}

/// Owned batch of single-channel masks.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Vec<f32>,
    batch: usize,
    height: usize,
    width: usize,
}

impl Mask {
    /// Creates a mask filled with `value`.
    pub fn filled(batch: usize, height: usize, width: usize, value: f32) -> Result<Self> {
        let area = checked_area(batch, height, width)?;
        Ok(Self {
            data: vec![value; area * batch],
            batch,
            height,
            width,
        })
    }

    /// Creates a fully opaque mask.
    pub fn ones(batch: usize, height: usize, width: usize) -> Result<Self> {
        Self::filled(batch, height, width, 1.0)
    }

    /// Creates a mask from existing NHW data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] on zero area or length mismatch.
    pub fn from_data(batch: usize, height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        let area = checked_area(batch, height, width)?;
        if data.len() != area * batch {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} elements, got {}", area * batch, data.len()),
            ));
        }
        Ok(Self {
            data,
            batch,
            height,
            width,
        })
    }

    /// Number of masks in the batch.
    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Mask height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Mask width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raw NHW data.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the mask and returns its data.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// One mask of the batch.
    ///
    /// # Panics
    ///
    /// Panics if `index >= batch`.
    #[inline]
    pub fn image(&self, index: usize) -> &[f32] {
        let len = self.height * self.width;
        &self.data[index * len..(index + 1) * len]
    }

    /// The mask that applies to image `index` of a batch, broadcasting a
    /// single-image mask.
    #[inline]
    pub fn image_for(&self, index: usize) -> &[f32] {
        if self.batch == 1 {
            self.image(0)
        } else {
            self.image(index)
        }
    }

    /// Value at a single position.
    #[inline]
    pub fn value(&self, index: usize, y: usize, x: usize) -> f32 {
        self.data[(index * self.height + y) * self.width + x]
    }

    /// Returns `1 - mask`.
    pub fn inverted(&self) -> Mask {
        Self {
            data: self.data.iter().map(|v| 1.0 - v).collect(),
            ..*self
        }
    }

    /// Checks that this mask can be applied to a batch of `batch` images.
    pub fn check_broadcast(&self, batch: usize) -> Result<()> {
        if self.batch == 1 || self.batch == batch {
            Ok(())
        } else {
            Err(Error::BatchMismatch {
                expected: batch,
                actual: self.batch,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_area_rejected() {
        assert!(PixelBuffer::new(1, 0, 4, 4).is_err());
        assert!(PixelBuffer::new(0, 4, 4, 4).is_err());
        assert!(Mask::ones(1, 4, 0).is_err());
    }

    #[test]
    fn test_channel_count_checked() {
        assert!(matches!(
            PixelBuffer::new(1, 2, 2, 2),
            Err(Error::UnsupportedChannels(2))
        ));
    }

    #[test]
    fn test_with_alpha_replaces_existing() {
        let img = PixelBuffer::filled(2, 1, 2, &[0.1, 0.2, 0.3, 1.0]).unwrap();
        let mask = Mask::filled(1, 1, 2, 0.25).unwrap();
        let out = img.with_alpha(&mask).unwrap();
        assert_eq!(out.channels(), 4);
        assert_eq!(out.pixel(1, 0, 1), &[0.1, 0.2, 0.3, 0.25]);
    }

    #[test]
    fn test_with_alpha_appends_to_rgb() {
        let img = PixelBuffer::filled(1, 2, 2, &[0.5, 0.5, 0.5]).unwrap();
        let out = img.with_alpha(&Mask::ones(1, 2, 2).unwrap()).unwrap();
        assert_eq!(out.pixel(0, 1, 1), &[0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_with_alpha_batch_mismatch() {
        let img = PixelBuffer::filled(3, 1, 1, &[0.0, 0.0, 0.0]).unwrap();
        let mask = Mask::ones(2, 1, 1).unwrap();
        assert!(matches!(
            img.with_alpha(&mask),
            Err(Error::BatchMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_rgb_only_and_alpha_split() {
        let img = PixelBuffer::filled(1, 1, 1, &[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(img.rgb_only().data(), &[0.1, 0.2, 0.3]);
        assert_eq!(img.alpha().unwrap().data(), &[0.4]);
        assert!(img.rgb_only().alpha().is_none());
    }
}
