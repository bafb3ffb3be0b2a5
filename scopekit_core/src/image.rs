// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster images and signal inputs.
//!
//! [`Image`] is a plain premultiplied-alpha RGBA buffer. Pixels are packed as
//! `0xAARRGGBB` in a `u32`. Renderers produce layer images already composited
//! with alpha, so the compositor only needs source-over blits.
//!
//! [`SignalInput`] is the snapshot a scope layer renders from: either the last
//! video frame or the last audio block delivered by the signal source.

use std::sync::Arc;

use kurbo::Size;

/// Packs premultiplied channel values into a pixel.
#[inline]
#[must_use]
pub const fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Splits a pixel into `[a, r, g, b]`.
#[inline]
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "each channel is masked to 8 bits before the cast"
)]
pub const fn unpack_argb(px: u32) -> [u8; 4] {
    [
        (px >> 24) as u8,
        ((px >> 16) & 0xff) as u8,
        ((px >> 8) & 0xff) as u8,
        (px & 0xff) as u8,
    ]
}

/// Fully transparent pixel.
pub const TRANSPARENT: u32 = 0;

/// A premultiplied RGBA raster.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl core::fmt::Debug for Image {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// A 0×0 image. Layer caches start out empty.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// Creates a transparent image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    /// Creates an image with every pixel set to `px`.
    #[must_use]
    pub fn filled(width: u32, height: u32, px: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![px; width as usize * height as usize],
        }
    }

    /// Creates a transparent image covering `size`, rounding down to whole
    /// pixels.
    #[must_use]
    pub fn with_size(size: Size) -> Self {
        let (w, h) = pixel_dims(size);
        Self::new(w, h)
    }

    /// Wraps an existing pixel buffer.
    ///
    /// Returns `None` if `pixels.len() != width * height`.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns `true` if the image has no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel buffer in row-major order.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable pixel buffer in row-major order.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Returns the pixel at `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Sets the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: u32) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = px;
        }
    }

    /// Fills the whole image with `px`.
    pub fn fill(&mut self, px: u32) {
        self.pixels.fill(px);
    }

    /// Draws `src` over `self` with its top-left corner at `(x, y)` using
    /// premultiplied source-over blending. Parts falling outside `self` are
    /// clipped.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "offsets are clipped to the destination bounds before the cast"
    )]
    pub fn blit_over(&mut self, src: &Self, x: i64, y: i64) {
        if src.is_empty() || self.is_empty() {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(src.width)).min(i64::from(self.width));
        let y1 = (y + i64::from(src.height)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for dy in y0..y1 {
            let sy = (dy - y) as usize;
            let src_row = sy * src.width as usize;
            let dst_row = dy as usize * self.width as usize;
            for dx in x0..x1 {
                let sx = (dx - x) as usize;
                let s = src.pixels[src_row + sx];
                let d = &mut self.pixels[dst_row + dx as usize];
                *d = source_over(s, *d);
            }
        }
    }
}

/// Premultiplied source-over of a single pixel.
#[must_use]
pub fn source_over(src: u32, dst: u32) -> u32 {
    let [sa, sr, sg, sb] = unpack_argb(src);
    if sa == 255 {
        return src;
    }
    // Zero alpha with non-zero colour is additive in premultiplied space.
    if src == TRANSPARENT {
        return dst;
    }
    let [da, dr, dg, db] = unpack_argb(dst);
    let inv = 255 - u32::from(sa);
    let mix = |s: u8, d: u8| -> u8 {
        let v = u32::from(s) + (u32::from(d) * inv + 127) / 255;
        u8::try_from(v).unwrap_or(u8::MAX)
    };
    pack_argb(mix(sa, da), mix(sr, dr), mix(sg, dg), mix(sb, db))
}

/// Converts a logical size into whole pixel dimensions, clamping negatives
/// and non-finite values to zero.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "dimensions are clamped to the u32 range before the cast"
)]
pub fn pixel_dims(size: Size) -> (u32, u32) {
    let clamp = |v: f64| {
        if v.is_finite() && v > 0.0 {
            v.floor().min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    };
    (clamp(size.width), clamp(size.height))
}

/// A block of interleaved 16-bit audio samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioBlock {
    /// Interleaved samples, `channels` values per frame.
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub frequency: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Number of samples per channel in this block.
    pub samples_per_channel: usize,
}

impl AudioBlock {
    /// Samples per channel actually present in `samples`.
    ///
    /// This is `samples_per_channel`, limited to the complete frames the
    /// interleaved buffer holds.
    #[must_use]
    pub fn available_per_channel(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples_per_channel
            .min(self.samples.len() / usize::from(self.channels))
    }

    /// Iterates over the samples of one channel.
    ///
    /// Yields nothing if `channel` is out of range.
    pub fn channel(&self, channel: u16) -> impl Iterator<Item = i16> + '_ {
        let stride = usize::from(self.channels.max(1));
        let valid = channel < self.channels;
        self.samples
            .iter()
            .skip(usize::from(channel))
            .step_by(stride)
            .take(if valid { self.available_per_channel() } else { 0 })
            .copied()
    }
}

/// The data a scope layer renders from.
#[derive(Clone, Debug)]
pub enum SignalInput {
    /// The last video frame delivered to the widget.
    Frame(Arc<Image>),
    /// The last audio block delivered to the widget.
    Audio(Arc<AudioBlock>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrips_channels() {
        let px = pack_argb(0x80, 0x10, 0x20, 0x30);
        assert_eq!(px, 0x8010_2030);
        assert_eq!(unpack_argb(px), [0x80, 0x10, 0x20, 0x30]);
    }

    #[test]
    fn opaque_source_replaces_destination() {
        let src = pack_argb(255, 1, 2, 3);
        assert_eq!(source_over(src, pack_argb(255, 200, 200, 200)), src);
    }

    #[test]
    fn transparent_source_keeps_destination() {
        let dst = pack_argb(255, 9, 9, 9);
        assert_eq!(source_over(TRANSPARENT, dst), dst);
    }

    #[test]
    fn half_alpha_blends() {
        // 50% white over opaque black.
        let src = pack_argb(128, 128, 128, 128);
        let dst = pack_argb(255, 0, 0, 0);
        let [a, r, g, b] = unpack_argb(source_over(src, dst));
        assert_eq!(a, 255);
        assert_eq!((r, g, b), (128, 128, 128));
    }

    #[test]
    fn blit_is_clipped_to_destination() {
        let mut dst = Image::new(4, 4);
        let src = Image::filled(3, 3, pack_argb(255, 255, 0, 0));
        dst.blit_over(&src, 2, -1);
        assert_eq!(dst.pixel(2, 0), Some(pack_argb(255, 255, 0, 0)));
        assert_eq!(dst.pixel(3, 1), Some(pack_argb(255, 255, 0, 0)));
        assert_eq!(dst.pixel(1, 0), Some(TRANSPARENT));
        assert_eq!(dst.pixel(2, 2), Some(TRANSPARENT));
    }

    #[test]
    fn pixel_dims_clamps_degenerate_sizes() {
        assert_eq!(pixel_dims(Size::new(-3.0, 10.7)), (0, 10));
        assert_eq!(pixel_dims(Size::new(f64::NAN, 2.0)), (0, 2));
    }

    #[test]
    fn from_pixels_checks_length() {
        assert!(Image::from_pixels(2, 2, vec![0; 3]).is_none());
        assert!(Image::from_pixels(2, 2, vec![0; 4]).is_some());
    }

    #[test]
    fn audio_channel_deinterleaves() {
        let block = AudioBlock {
            samples: vec![1, -1, 2, -2, 3, -3],
            frequency: 48_000,
            channels: 2,
            samples_per_channel: 3,
        };
        assert_eq!(block.channel(0).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(block.channel(1).collect::<Vec<_>>(), vec![-1, -2, -3]);
        assert_eq!(block.channel(2).count(), 0);
    }
}
