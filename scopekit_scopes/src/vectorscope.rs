// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vectorscope: chroma of every sampled pixel plotted on the Cb/Cr plane.
//!
//! The plot is a square centred in the scope rect. Saturated primaries land
//! close to the edge of the circle at gain 1; higher gains magnify weakly
//! saturated material.

use std::sync::Mutex;

use kurbo::{Point, Vec2};
use scopekit_core::config::{ConfigStore, read_parsed};
use scopekit_core::image::{Image, SignalInput, unpack_argb};
use scopekit_core::layer::Layer;
use scopekit_core::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

use crate::lock;
use crate::paint::{self, DARK_WHITE, GRID};

/// Gain limits.
pub const MIN_GAIN: f32 = 0.1;
/// See [`MIN_GAIN`].
pub const MAX_GAIN: f32 = 5.0;

/// Chroma matrix used for plotting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    /// Analogue YUV weights.
    #[default]
    Yuv,
    /// Component `YPbPr` weights.
    YPbPr,
}

impl ColorSpace {
    /// `(u, v)` of an 8-bit RGB triple, each roughly in `-0.5..=0.5`.
    #[must_use]
    pub fn chroma(self, r: u8, g: u8, b: u8) -> Vec2 {
        let (r, g, b) = (f64::from(r) / 255.0, f64::from(g) / 255.0, f64::from(b) / 255.0);
        match self {
            Self::Yuv => Vec2::new(
                -0.147 * r - 0.289 * g + 0.436 * b,
                0.615 * r - 0.515 * g - 0.100 * b,
            ),
            Self::YPbPr => Vec2::new(
                -0.168_736 * r - 0.331_264 * g + 0.5 * b,
                0.5 * r - 0.418_688 * g - 0.081_312 * b,
            ),
        }
    }
}

/// Vectorscope parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorscopeSettings {
    /// Chroma magnification, in `MIN_GAIN..=MAX_GAIN`.
    pub gain: f32,
    /// Chroma matrix.
    pub color_space: ColorSpace,
    /// Draw U/V axes in the background.
    pub axis: bool,
}

impl Default for VectorscopeSettings {
    fn default() -> Self {
        Self {
            gain: 1.0,
            color_space: ColorSpace::Yuv,
            axis: false,
        }
    }
}

/// Vectorscope.
#[derive(Debug, Default)]
pub struct Vectorscope {
    settings: Mutex<VectorscopeSettings>,
}

impl Vectorscope {
    /// Creates a vectorscope with gain 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings.
    pub fn settings(&self) -> VectorscopeSettings {
        *lock(&self.settings)
    }

    /// Replaces the settings, clamping the gain.
    pub fn set_settings(&self, mut settings: VectorscopeSettings) {
        settings.gain = settings.gain.clamp(MIN_GAIN, MAX_GAIN);
        *lock(&self.settings) = settings;
    }
}

/// Centre and radius of the plot circle in an image `w`×`h`.
fn circle(w: u32, h: u32) -> (Point, f64) {
    let side = f64::from(w.min(h));
    (
        Point::new(f64::from(w) / 2.0, f64::from(h) / 2.0),
        (side / 2.0 - 1.0).max(0.0),
    )
}

impl ScopeRenderer for Vectorscope {
    fn kind(&self) -> ScopeKind {
        ScopeKind::Vectorscope
    }

    fn depends_on_input(&self, layer: Layer) -> bool {
        layer == Layer::Scope
    }

    fn render_hud(&self, request: &RenderRequest) -> Image {
        let mut out = Image::with_size(request.size);
        if let Some(at) = request.mouse {
            paint::crosshair(&mut out, at, DARK_WHITE);
        }
        out
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "plot coordinates are checked against the image bounds"
    )]
    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image {
        let mut out = Image::with_size(request.size);
        let Some(SignalInput::Frame(frame)) = input else {
            return out;
        };
        if out.is_empty() || frame.is_empty() {
            return out;
        }
        let settings = self.settings();
        let (w, h) = (out.width(), out.height());
        let (center, radius) = circle(w, h);
        // Full-scale chroma (|u| = 0.5) reaches the rim at gain 1.
        let reach = 2.0 * radius * f64::from(settings.gain);
        let mut hits = vec![0_u32; w as usize * h as usize];
        let stride = request.accel_factor.max(1) as usize;
        let mut sampled = 0_u32;
        for &px in frame.pixels().iter().step_by(stride) {
            sampled += 1;
            let [_, r, g, b] = unpack_argb(px);
            let uv = settings.color_space.chroma(r, g, b);
            let x = (center.x + uv.x * reach).floor();
            let y = (center.y - uv.y * reach).floor();
            if x < 0.0 || y < 0.0 || x >= f64::from(w) || y >= f64::from(h) {
                continue;
            }
            hits[y as usize * w as usize + x as usize] += 1;
        }
        let avg = f64::from(sampled) / (f64::from(w) * f64::from(h));
        let scale = (avg * 4.0).max(1.0);
        for (i, &n) in hits.iter().enumerate() {
            if n > 0 {
                let (x, y) = ((i % w as usize) as u32, (i / w as usize) as u32);
                let a = paint::intensity(n, scale).max(48);
                paint::blend(&mut out, x, y, paint::with_alpha(DARK_WHITE, a));
            }
        }
        out
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "circle points lie inside the image"
    )]
    fn render_background(&self, request: &RenderRequest) -> Image {
        let mut out = Image::with_size(request.size);
        let (w, h) = (out.width(), out.height());
        let (center, radius) = circle(w, h);
        if radius <= 0.0 {
            return out;
        }
        let steps = (radius * 8.0).ceil().max(8.0) as u32;
        for i in 0..steps {
            let t = f64::from(i) / f64::from(steps) * core::f64::consts::TAU;
            let p = center + Vec2::new(t.cos(), t.sin()) * radius;
            if p.x >= 0.0 && p.y >= 0.0 {
                paint::blend(&mut out, p.x as u32, p.y as u32, GRID);
            }
        }
        if self.settings().axis {
            let (cx, cy) = (center.x as u32, center.y as u32);
            paint::hline(&mut out, cy, 0, w, GRID);
            paint::vline(&mut out, cx, 0, h, GRID);
        }
        out
    }

    fn tracks_mouse(&self) -> bool {
        true
    }

    fn read_config(&self, store: &dyn ConfigStore, group: &str) {
        let d = VectorscopeSettings::default();
        let color_space = if read_parsed(store, group, "colorspace_ypbpr", false) {
            ColorSpace::YPbPr
        } else {
            ColorSpace::Yuv
        };
        self.set_settings(VectorscopeSettings {
            gain: read_parsed(store, group, "gain", d.gain),
            color_space,
            axis: read_parsed(store, group, "axis", d.axis),
        });
    }

    fn write_config(&self, store: &mut dyn ConfigStore, group: &str) {
        let s = self.settings();
        store.write(group, "gain", s.gain.to_string());
        store.write(
            group,
            "colorspace_ypbpr",
            (s.color_space == ColorSpace::YPbPr).to_string(),
        );
        store.write(group, "axis", s.axis.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kurbo::Size;
    use scopekit_core::config::MemoryConfig;
    use scopekit_core::image::pack_argb;

    use super::*;

    fn render(scope: &Vectorscope, px: u32, accel: u32) -> Image {
        let frame = Arc::new(Image::filled(8, 8, px));
        let mut req = RenderRequest::new(Size::new(41.0, 41.0));
        req.accel_factor = accel;
        scope.render_scope(&req, Some(&SignalInput::Frame(frame)))
    }

    fn lit(img: &Image) -> Vec<(u32, u32)> {
        let mut v = Vec::new();
        for y in 0..img.height() {
            for x in 0..img.width() {
                if img.pixel(x, y) != Some(0) {
                    v.push((x, y));
                }
            }
        }
        v
    }

    #[test]
    fn gray_plots_at_centre() {
        let img = render(&Vectorscope::new(), pack_argb(255, 128, 128, 128), 1);
        assert_eq!(lit(&img), vec![(20, 20)]);
    }

    #[test]
    fn blue_plots_right_of_centre() {
        let img = render(&Vectorscope::new(), pack_argb(255, 0, 0, 255), 3);
        let pts = lit(&img);
        assert_eq!(pts.len(), 1);
        assert!(pts[0].0 > 30, "u of blue is strongly positive: {pts:?}");
    }

    #[test]
    fn gain_is_clamped_and_persisted() {
        let scope = Vectorscope::new();
        scope.set_settings(VectorscopeSettings {
            gain: 50.0,
            ..VectorscopeSettings::default()
        });
        assert!((scope.settings().gain - MAX_GAIN).abs() < f32::EPSILON);

        let mut store = MemoryConfig::new();
        scope.write_config(&mut store, "Scope_Vectorscope");
        let fresh = Vectorscope::new();
        fresh.read_config(&store, "Scope_Vectorscope");
        assert_eq!(fresh.settings(), scope.settings());
    }

    #[test]
    fn background_draws_a_circle() {
        let bg = Vectorscope::new().render_background(&RenderRequest::new(Size::new(41.0, 41.0)));
        assert_ne!(bg.pixel(40, 20), Some(0));
        assert_eq!(bg.pixel(20, 20), Some(0));
    }
}
