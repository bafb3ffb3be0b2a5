// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Luma waveform: one column of the plot per group of frame columns, with
//! the level of every sampled pixel drawn at its height.

use scopekit_core::image::{Image, SignalInput};
use scopekit_core::layer::Layer;
use scopekit_core::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

use crate::paint::{self, DARK_WHITE, GRID};

/// Share of a column's samples landing on one pixel that saturates it.
const SATURATION: f64 = 1.0 / 16.0;

/// Plots `level(px)` (in `0..=255`) of every pixel in every `stride`th row
/// of `frame` into the columns `x0..x0 + width` of `out`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "column indices are bounded by the panel width"
)]
pub(crate) fn plot_columns(
    out: &mut Image,
    x0: u32,
    width: u32,
    frame: &Image,
    stride: u32,
    level: impl Fn(u32) -> f64,
    color: u32,
) {
    let h = out.height();
    let fw = frame.width();
    if width == 0 || h == 0 || fw == 0 {
        return;
    }
    let mut hits = vec![0_u32; width as usize * h as usize];
    let mut rows = 0_u32;
    for row in frame.pixels().chunks_exact(fw as usize).step_by(stride.max(1) as usize) {
        rows += 1;
        for (sx, &px) in row.iter().enumerate() {
            let x = (sx as u64 * u64::from(width) / u64::from(fw)) as usize;
            let y = paint::row_for(level(px) / 255.0, h) as usize;
            hits[y * width as usize + x] += 1;
        }
    }
    let per_column = f64::from(rows) * f64::from(fw) / f64::from(width);
    let scale = (per_column * SATURATION).max(1.0);
    for y in 0..h {
        for x in 0..width {
            let n = hits[y as usize * width as usize + x as usize];
            if n > 0 {
                let a = paint::intensity(n, scale).max(32);
                paint::blend(out, x0 + x, y, paint::with_alpha(color, a));
            }
        }
    }
}

/// Level grid every 25 % of the range.
pub(crate) fn draw_level_grid(out: &mut Image, x0: u32, width: u32) {
    let h = out.height();
    for step in 0..=4 {
        let y = paint::row_for(f64::from(step) / 4.0, h);
        paint::hline(out, y, x0, x0 + width, GRID);
    }
}

/// Luma waveform scope.
#[derive(Debug, Default)]
pub struct Waveform;

impl Waveform {
    /// Creates a waveform scope.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScopeRenderer for Waveform {
    fn kind(&self) -> ScopeKind {
        ScopeKind::Waveform
    }

    fn depends_on_input(&self, layer: Layer) -> bool {
        layer == Layer::Scope
    }

    fn render_hud(&self, request: &RenderRequest) -> Image {
        let mut out = Image::with_size(request.size);
        if let Some(at) = request.mouse
            && at.y >= 0.0
        {
            let w = out.width();
            let y = paint::row_for(1.0 - at.y / request.size.height.max(1.0), out.height());
            paint::hline(&mut out, y, 0, w, DARK_WHITE);
        }
        out
    }

    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image {
        let mut out = Image::with_size(request.size);
        if let Some(SignalInput::Frame(frame)) = input {
            let w = out.width();
            plot_columns(
                &mut out,
                0,
                w,
                frame,
                request.accel_factor,
                paint::luma,
                DARK_WHITE,
            );
        }
        out
    }

    fn render_background(&self, request: &RenderRequest) -> Image {
        let mut out = Image::with_size(request.size);
        let w = out.width();
        draw_level_grid(&mut out, 0, w);
        out
    }

    fn tracks_mouse(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kurbo::{Point, Size};
    use scopekit_core::image::pack_argb;

    use super::*;

    fn frame_with_levels(levels: &[u8], rows: u32) -> Arc<Image> {
        let w = u32::try_from(levels.len()).unwrap();
        let mut img = Image::new(w, rows);
        for y in 0..rows {
            for (x, &v) in levels.iter().enumerate() {
                img.set_pixel(u32::try_from(x).unwrap(), y, pack_argb(255, v, v, v));
            }
        }
        Arc::new(img)
    }

    #[test]
    fn levels_land_at_their_height() {
        let frame = frame_with_levels(&[0, 255], 4);
        let req = RenderRequest::new(Size::new(2.0, 11.0));
        let img = Waveform.render_scope(&req, Some(&SignalInput::Frame(frame)));
        assert_ne!(img.pixel(0, 10), Some(0), "black at the bottom");
        assert_ne!(img.pixel(1, 0), Some(0), "white at the top");
        assert_eq!(img.pixel(0, 0), Some(0));
        assert_eq!(img.pixel(1, 10), Some(0));
    }

    #[test]
    fn stride_skips_rows() {
        let mut img = Image::filled(1, 4, pack_argb(255, 0, 0, 0));
        img.set_pixel(0, 1, pack_argb(255, 255, 255, 255));
        let frame = SignalInput::Frame(Arc::new(img));
        let mut req = RenderRequest::new(Size::new(1.0, 5.0));
        req.accel_factor = 2;
        let out = Waveform.render_scope(&req, Some(&frame));
        assert_eq!(out.pixel(0, 0), Some(0), "row 1 is skipped");
        req.accel_factor = 1;
        let out = Waveform.render_scope(&req, Some(&frame));
        assert_ne!(out.pixel(0, 0), Some(0));
    }

    #[test]
    fn hud_follows_pointer() {
        let mut req = RenderRequest::new(Size::new(4.0, 5.0));
        assert!(Waveform.render_hud(&req).pixels().iter().all(|&p| p == 0));
        req.mouse = Some(Point::new(1.0, 2.0));
        let hud = Waveform.render_hud(&req);
        assert!(hud.pixels().iter().any(|&p| p != 0));
    }

    #[test]
    fn background_draws_grid() {
        let bg = Waveform.render_background(&RenderRequest::new(Size::new(3.0, 9.0)));
        assert_eq!(bg.pixel(0, 0), Some(GRID));
        assert_eq!(bg.pixel(0, 8), Some(GRID));
        assert_eq!(bg.pixel(0, 1), Some(0));
    }
}
