// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer compositing into the widget surface.

use kurbo::{Rect, Size};

use crate::image::{Image, pixel_dims};
use crate::layer::Layer;

/// Owns a widget's surface and paints cached layer images into it.
#[derive(Debug, Default)]
pub struct LayerCompositor {
    surface: Image,
    background: u32,
    paints: u64,
}

impl LayerCompositor {
    /// Creates a compositor whose surface is cleared to `background` before
    /// each paint.
    #[must_use]
    pub fn new(background: u32) -> Self {
        Self {
            surface: Image::empty(),
            background,
            paints: 0,
        }
    }

    /// Reallocates the surface for a widget of size `size`.
    pub fn resize(&mut self, size: Size) {
        let (w, h) = pixel_dims(size);
        if (w, h) != (self.surface.width(), self.surface.height()) {
            self.surface = Image::filled(w, h, self.background);
        }
    }

    /// Paints the cached images bottom to top at the origin of `scope_rect`.
    ///
    /// `layers` yields images in any order; they are sorted into paint order.
    pub fn compose<'a>(
        &mut self,
        scope_rect: Rect,
        layers: impl IntoIterator<Item = (Layer, &'a Image)>,
    ) -> &Image {
        let mut ordered: [Option<&Image>; 3] = [None; 3];
        for (layer, image) in layers {
            ordered[layer.index()] = Some(image);
        }
        self.surface.fill(self.background);
        let (x, y) = origin(scope_rect);
        for image in ordered.into_iter().flatten() {
            self.surface.blit_over(image, x, y);
        }
        self.paints += 1;
        &self.surface
    }

    /// The last composed surface.
    #[must_use]
    pub const fn surface(&self) -> &Image {
        &self.surface
    }

    /// Number of compositions so far.
    #[must_use]
    pub const fn paints(&self) -> u64 {
        self.paints
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "widget coordinates are far inside the i64 range"
)]
fn origin(rect: Rect) -> (i64, i64) {
    (rect.x0.round() as i64, rect.y0.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::pack_argb;

    #[test]
    fn hud_paints_over_scope_over_background() {
        let mut comp = LayerCompositor::new(0);
        comp.resize(Size::new(3.0, 1.0));

        let red = pack_argb(255, 255, 0, 0);
        let green = pack_argb(255, 0, 255, 0);
        let blue = pack_argb(255, 0, 0, 255);
        let bg = Image::filled(3, 1, red);
        let mut scope = Image::new(3, 1);
        scope.set_pixel(1, 0, green);
        scope.set_pixel(2, 0, green);
        let mut hud = Image::new(3, 1);
        hud.set_pixel(2, 0, blue);

        // Pass them out of order; paint order must still hold.
        let out = comp.compose(
            Rect::new(0.0, 0.0, 3.0, 1.0),
            [(Layer::Hud, &hud), (Layer::Background, &bg), (Layer::Scope, &scope)],
        );
        assert_eq!(out.pixels(), &[red, green, blue]);
        assert_eq!(comp.paints(), 1);
    }

    #[test]
    fn layers_are_placed_at_scope_rect_origin() {
        let mut comp = LayerCompositor::new(0);
        comp.resize(Size::new(4.0, 4.0));
        let dot = Image::filled(1, 1, pack_argb(255, 1, 1, 1));
        let out = comp.compose(Rect::new(2.0, 3.0, 3.0, 4.0), [(Layer::Scope, &dot)]);
        assert_eq!(out.pixel(2, 3), Some(pack_argb(255, 1, 1, 1)));
        assert_eq!(out.pixel(0, 0), Some(0));
    }

    #[test]
    fn resize_to_zero_yields_empty_surface() {
        let mut comp = LayerCompositor::new(0);
        comp.resize(Size::new(0.0, 5.0));
        assert!(comp.surface().is_empty());
    }
}
