// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Luma and per-channel histograms.

use std::sync::Mutex;

use scopekit_core::config::{ConfigStore, read_parsed};
use scopekit_core::image::{Image, SignalInput, unpack_argb};
use scopekit_core::layer::Layer;
use scopekit_core::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

use crate::lock;
use crate::paint::{self, BLUE, DARK_WHITE, GREEN, RED};

/// Gap between stacked component plots, in pixels.
const PART_GAP: u32 = 4;

/// Luma weights for the two supported colour standards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LumaStandard {
    /// ITU-R BT.601.
    Rec601,
    /// ITU-R BT.709.
    #[default]
    Rec709,
}

impl LumaStandard {
    fn weights(self) -> [f64; 3] {
        match self {
            Self::Rec601 => [0.299, 0.587, 0.114],
            Self::Rec709 => [0.2126, 0.7152, 0.0722],
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "weights sum to 1, so the result stays in 0..=255"
    )]
    fn luma(self, px: u32) -> usize {
        let [_, r, g, b] = unpack_argb(px);
        let [wr, wg, wb] = self.weights();
        let y = wr * f64::from(r) + wg * f64::from(g) + wb * f64::from(b);
        (y.round() as usize).min(255)
    }
}

/// Which components are plotted, top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Components {
    /// Luma.
    pub y: bool,
    /// Sum of R, G and B counts.
    pub sum: bool,
    /// Red.
    pub r: bool,
    /// Green.
    pub g: bool,
    /// Blue.
    pub b: bool,
}

impl Components {
    /// Luma and the three channels.
    pub const STANDARD: Self = Self {
        y: true,
        sum: false,
        r: true,
        g: true,
        b: true,
    };
}

/// User-adjustable histogram parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistogramSettings {
    /// Enabled components.
    pub components: Components,
    /// Luma weights.
    pub standard: LumaStandard,
    /// Logarithmic bar heights.
    pub log_scale: bool,
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self {
            components: Components::STANDARD,
            standard: LumaStandard::Rec709,
            log_scale: false,
        }
    }
}

/// Bin counts of one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bins {
    /// Luma bins.
    pub y: [u32; 256],
    /// Red bins.
    pub r: [u32; 256],
    /// Green bins.
    pub g: [u32; 256],
    /// Blue bins.
    pub b: [u32; 256],
    /// Pixels sampled.
    pub samples: u32,
}

impl Bins {
    /// Counts every `stride`th pixel of each row of `frame`.
    #[must_use]
    pub fn count(frame: &Image, stride: u32, standard: LumaStandard) -> Self {
        let mut bins = Self {
            y: [0; 256],
            r: [0; 256],
            g: [0; 256],
            b: [0; 256],
            samples: 0,
        };
        let width = frame.width() as usize;
        if width == 0 {
            return bins;
        }
        for row in frame.pixels().chunks_exact(width) {
            for &px in row.iter().step_by(stride.max(1) as usize) {
                let [_, r, g, b] = unpack_argb(px);
                bins.r[usize::from(r)] += 1;
                bins.g[usize::from(g)] += 1;
                bins.b[usize::from(b)] += 1;
                bins.y[standard.luma(px)] += 1;
                bins.samples += 1;
            }
        }
        bins
    }

    fn sum(&self) -> [u32; 256] {
        core::array::from_fn(|i| self.r[i] + self.g[i] + self.b[i])
    }
}

/// Histogram scope.
#[derive(Debug, Default)]
pub struct Histogram {
    settings: Mutex<HistogramSettings>,
}

impl Histogram {
    /// Creates a histogram with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings.
    pub fn settings(&self) -> HistogramSettings {
        *lock(&self.settings)
    }

    /// Replaces the settings. The caller forces a Scope render.
    pub fn set_settings(&self, settings: HistogramSettings) {
        *lock(&self.settings) = settings;
    }
}

impl ScopeRenderer for Histogram {
    fn kind(&self) -> ScopeKind {
        ScopeKind::Histogram
    }

    fn depends_on_input(&self, layer: Layer) -> bool {
        layer == Layer::Scope
    }

    fn render_hud(&self, request: &RenderRequest) -> Image {
        Image::with_size(request.size)
    }

    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image {
        let mut out = Image::with_size(request.size);
        let Some(SignalInput::Frame(frame)) = input else {
            return out;
        };
        if out.is_empty() || frame.is_empty() {
            return out;
        }
        let settings = self.settings();
        let bins = Bins::count(frame, request.accel_factor, settings.standard);
        let c = settings.components;
        let mut parts: Vec<([u32; 256], u32, f64)> = Vec::new();
        let samples = f64::from(bins.samples);
        if c.y {
            parts.push((bins.y, DARK_WHITE, samples));
        }
        if c.sum {
            parts.push((bins.sum(), DARK_WHITE, samples * 3.0));
        }
        if c.r {
            parts.push((bins.r, RED, samples));
        }
        if c.g {
            parts.push((bins.g, GREEN, samples));
        }
        if c.b {
            parts.push((bins.b, BLUE, samples));
        }
        draw_parts(&mut out, &parts, settings.log_scale);
        out
    }

    fn render_background(&self, request: &RenderRequest) -> Image {
        Image::with_size(request.size)
    }

    fn read_config(&self, store: &dyn ConfigStore, group: &str) {
        let d = HistogramSettings::default();
        let components = Components {
            y: read_parsed(store, group, "yEnabled", d.components.y),
            sum: read_parsed(store, group, "sEnabled", d.components.sum),
            r: read_parsed(store, group, "rEnabled", d.components.r),
            g: read_parsed(store, group, "gEnabled", d.components.g),
            b: read_parsed(store, group, "bEnabled", d.components.b),
        };
        let standard = if read_parsed(store, group, "rec601", false) {
            LumaStandard::Rec601
        } else {
            LumaStandard::Rec709
        };
        self.set_settings(HistogramSettings {
            components,
            standard,
            log_scale: read_parsed(store, group, "logScale", d.log_scale),
        });
    }

    fn write_config(&self, store: &mut dyn ConfigStore, group: &str) {
        let s = self.settings();
        let c = s.components;
        store.write(group, "yEnabled", c.y.to_string());
        store.write(group, "sEnabled", c.sum.to_string());
        store.write(group, "rEnabled", c.r.to_string());
        store.write(group, "gEnabled", c.g.to_string());
        store.write(group, "bEnabled", c.b.to_string());
        store.write(group, "rec601", (s.standard == LumaStandard::Rec601).to_string());
        store.write(group, "logScale", s.log_scale.to_string());
    }
}

/// Stacks one bar plot per component. Linear bars saturate at 1/32 of the
/// samples so a few dominant bins do not flatten the rest.
#[expect(
    clippy::cast_possible_truncation,
    reason = "part count and bar heights are bounded by the image height"
)]
fn draw_parts(out: &mut Image, parts: &[([u32; 256], u32, f64)], log_scale: bool) {
    let n = parts.len() as u32;
    if n == 0 {
        return;
    }
    let (w, h) = (out.width(), out.height());
    let part_h = h.saturating_sub(PART_GAP * (n - 1)) / n;
    if part_h == 0 {
        return;
    }
    for (i, (bins, color, samples)) in parts.iter().enumerate() {
        let top = i as u32 * (part_h + PART_GAP);
        let bottom = top + part_h;
        let max = bins.iter().copied().max().unwrap_or(0);
        for x in 0..w {
            let bin = bin_for(x, w);
            let v = f64::from(bins[bin]);
            let frac = if log_scale {
                if max == 0 {
                    0.0
                } else {
                    (1.0 + v).ln() / (1.0 + f64::from(max)).ln()
                }
            } else {
                v / (samples / 32.0).max(1.0)
            };
            let bar = (frac.clamp(0.0, 1.0) * f64::from(part_h)).round() as u32;
            paint::vline(out, x, bottom - bar, bottom, *color);
        }
    }
}

/// Spreads the 256 bins over `w` columns so both ends are always shown.
fn bin_for(x: u32, w: u32) -> usize {
    if w <= 1 {
        return 0;
    }
    (x as usize * 255) / (w as usize - 1)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kurbo::Size;
    use scopekit_core::config::MemoryConfig;
    use scopekit_core::image::pack_argb;

    use super::*;

    fn gray(v: u8) -> u32 {
        pack_argb(255, v, v, v)
    }

    #[test]
    fn counts_every_pixel_at_full_fidelity() {
        let mut frame = Image::filled(4, 2, gray(10));
        frame.set_pixel(3, 1, gray(200));
        let bins = Bins::count(&frame, 1, LumaStandard::Rec709);
        assert_eq!(bins.samples, 8);
        assert_eq!(bins.r[10], 7);
        assert_eq!(bins.r[200], 1);
        assert_eq!(bins.y[10], 7);
    }

    #[test]
    fn accel_factor_is_a_pixel_stride() {
        let frame = Image::filled(8, 3, gray(0));
        let bins = Bins::count(&frame, 4, LumaStandard::Rec601);
        assert_eq!(bins.samples, 6);
    }

    #[test]
    fn white_frame_fills_the_rightmost_column() {
        let h = Histogram::new();
        h.set_settings(HistogramSettings {
            components: Components {
                y: true,
                sum: false,
                r: false,
                g: false,
                b: false,
            },
            ..HistogramSettings::default()
        });
        let frame = Arc::new(Image::filled(16, 16, gray(255)));
        let req = RenderRequest::new(Size::new(32.0, 20.0));
        let img = h.render_scope(&req, Some(&SignalInput::Frame(frame)));
        assert_eq!((img.width(), img.height()), (32, 20));
        assert_eq!(img.pixel(31, 19), Some(DARK_WHITE));
        assert_eq!(img.pixel(31, 0), Some(DARK_WHITE));
        assert_eq!(img.pixel(0, 19), Some(0));
    }

    #[test]
    fn no_input_renders_blank() {
        let h = Histogram::new();
        let img = h.render_scope(&RenderRequest::new(Size::new(4.0, 4.0)), None);
        assert!(img.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn settings_roundtrip_through_config() {
        let h = Histogram::new();
        let mut s = HistogramSettings::default();
        s.components.sum = true;
        s.standard = LumaStandard::Rec601;
        s.log_scale = true;
        h.set_settings(s);

        let mut store = MemoryConfig::new();
        h.write_config(&mut store, "Scope_Histogram");
        assert_eq!(store.read("Scope_Histogram", "rec601").as_deref(), Some("true"));

        let fresh = Histogram::new();
        fresh.read_config(&store, "Scope_Histogram");
        assert_eq!(fresh.settings(), s);
    }
}
