// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small raster helpers shared by the scopes.

use kurbo::Point;
use scopekit_core::image::{Image, pack_argb, source_over, unpack_argb};

pub(crate) const DARK_WHITE: u32 = pack_argb(255, 220, 220, 210);
pub(crate) const GRID: u32 = pack_argb(96, 83, 83, 79);
pub(crate) const HIGHLIGHT: u32 = pack_argb(255, 255, 220, 64);
pub(crate) const RED: u32 = pack_argb(255, 255, 128, 0);
pub(crate) const GREEN: u32 = pack_argb(255, 128, 255, 0);
pub(crate) const BLUE: u32 = pack_argb(255, 0, 128, 255);

/// Rec. 601 luma of an ARGB pixel, in `0..=255`.
pub(crate) fn luma(px: u32) -> f64 {
    let [_, r, g, b] = unpack_argb(px);
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Scales an opaque colour to coverage `a`, premultiplied.
pub(crate) fn with_alpha(color: u32, a: u8) -> u32 {
    let [_, r, g, b] = unpack_argb(color);
    let scale = |c: u8| u8::try_from(u32::from(c) * u32::from(a) / 255).unwrap_or(u8::MAX);
    pack_argb(a, scale(r), scale(g), scale(b))
}

/// Blends `color` over the pixel at `(x, y)`; out-of-bounds writes are
/// dropped.
pub(crate) fn blend(img: &mut Image, x: u32, y: u32, color: u32) {
    if let Some(dst) = img.pixel(x, y) {
        img.set_pixel(x, y, source_over(color, dst));
    }
}

pub(crate) fn hline(img: &mut Image, y: u32, x0: u32, x1: u32, color: u32) {
    for x in x0..x1.min(img.width()) {
        blend(img, x, y, color);
    }
}

pub(crate) fn vline(img: &mut Image, x: u32, y0: u32, y1: u32, color: u32) {
    for y in y0..y1.min(img.height()) {
        blend(img, x, y, color);
    }
}

/// Crosshair through `at`, used by HUDs that follow the pointer.
#[expect(
    clippy::cast_possible_truncation,
    reason = "pointer positions are inside the image"
)]
pub(crate) fn crosshair(img: &mut Image, at: Point, color: u32) {
    if at.x < 0.0 || at.y < 0.0 {
        return;
    }
    let (x, y) = (at.x as u32, at.y as u32);
    if x >= img.width() || y >= img.height() {
        return;
    }
    hline(img, y, 0, img.width(), color);
    vline(img, x, 0, img.height(), color);
}

/// Maps `value` in `0..=1` to a row, with 1 at the top.
#[expect(
    clippy::cast_possible_truncation,
    reason = "result is clamped to the image height"
)]
pub(crate) fn row_for(value: f64, height: u32) -> u32 {
    if height == 0 {
        return 0;
    }
    let max = f64::from(height - 1);
    (max - value.clamp(0.0, 1.0) * max).round() as u32
}

/// Brightness ramp for hit counts: `n` hits out of an expected `scale`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to 0..=255"
)]
pub(crate) fn intensity(n: u32, scale: f64) -> u8 {
    if scale <= 0.0 {
        return u8::MAX;
    }
    (f64::from(n) / scale * 255.0).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_of_primaries() {
        assert!((luma(pack_argb(255, 255, 255, 255)) - 255.0).abs() < 1e-9);
        assert!(luma(pack_argb(255, 0, 0, 0)).abs() < 1e-9);
        assert!((luma(pack_argb(255, 0, 255, 0)) - 149.685).abs() < 1e-9);
    }

    #[test]
    fn rows_put_full_scale_at_top() {
        assert_eq!(row_for(1.0, 10), 0);
        assert_eq!(row_for(0.0, 10), 9);
        assert_eq!(row_for(2.0, 10), 0);
        assert_eq!(row_for(0.5, 0), 0);
    }

    #[test]
    fn alpha_premultiplies() {
        assert_eq!(with_alpha(DARK_WHITE, 255), DARK_WHITE);
        assert_eq!(with_alpha(DARK_WHITE, 0), 0);
        assert_eq!(unpack_argb(with_alpha(DARK_WHITE, 51)), [51, 44, 44, 42]);
    }

    #[test]
    fn crosshair_outside_is_ignored() {
        let mut img = Image::new(4, 4);
        crosshair(&mut img, Point::new(-1.0, 2.0), DARK_WHITE);
        crosshair(&mut img, Point::new(9.0, 2.0), DARK_WHITE);
        assert!(img.pixels().iter().all(|&p| p == 0));
        crosshair(&mut img, Point::new(1.0, 2.0), DARK_WHITE);
        assert_eq!(img.pixel(3, 2), Some(DARK_WHITE));
        assert_eq!(img.pixel(1, 0), Some(DARK_WHITE));
    }
}
