// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! RGB parade: red, green and blue waveforms side by side.

use std::sync::Mutex;

use scopekit_core::config::{ConfigStore, read_parsed};
use scopekit_core::image::{Image, SignalInput, unpack_argb};
use scopekit_core::layer::Layer;
use scopekit_core::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

use crate::lock;
use crate::paint::{self, BLUE, DARK_WHITE, GREEN, GRID, RED};
use crate::waveform::{draw_level_grid, plot_columns};

/// Horizontal gap between panels.
const PANEL_GAP: u32 = 4;

/// Parade display options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParadeSettings {
    /// Level grid behind each panel.
    pub axis: bool,
    /// Diagonal 0–255 reference ramp in each panel.
    pub gradient_ref: bool,
}

/// RGB parade scope.
#[derive(Debug, Default)]
pub struct RgbParade {
    settings: Mutex<ParadeSettings>,
}

impl RgbParade {
    /// Creates a parade with axis and reference ramp off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings.
    pub fn settings(&self) -> ParadeSettings {
        *lock(&self.settings)
    }

    /// Replaces the settings.
    pub fn set_settings(&self, settings: ParadeSettings) {
        *lock(&self.settings) = settings;
    }
}

/// `(x0, width)` of the three panels for a plot `w` pixels wide.
fn panels(w: u32) -> [(u32, u32); 3] {
    let pw = w.saturating_sub(2 * PANEL_GAP) / 3;
    core::array::from_fn(|i| {
        let i = u32::try_from(i).unwrap_or(0);
        (i * (pw + PANEL_GAP), pw)
    })
}

impl ScopeRenderer for RgbParade {
    fn kind(&self) -> ScopeKind {
        ScopeKind::RgbParade
    }

    fn depends_on_input(&self, layer: Layer) -> bool {
        layer == Layer::Scope
    }

    fn render_hud(&self, request: &RenderRequest) -> Image {
        let mut out = Image::with_size(request.size);
        if let Some(at) = request.mouse {
            let w = out.width();
            let y = paint::row_for(1.0 - at.y / request.size.height.max(1.0), out.height());
            paint::hline(&mut out, y, 0, w, DARK_WHITE);
        }
        out
    }

    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image {
        let mut out = Image::with_size(request.size);
        let Some(SignalInput::Frame(frame)) = input else {
            return out;
        };
        let stride = request.accel_factor;
        let [(rx, pw), (gx, _), (bx, _)] = panels(out.width());
        let channel = |i: usize| move |px: u32| f64::from(unpack_argb(px)[i]);
        plot_columns(&mut out, rx, pw, frame, stride, channel(1), RED);
        plot_columns(&mut out, gx, pw, frame, stride, channel(2), GREEN);
        plot_columns(&mut out, bx, pw, frame, stride, channel(3), BLUE);
        if self.settings().gradient_ref && pw > 1 {
            for (x0, _) in [(rx, pw), (gx, pw), (bx, pw)] {
                for x in 0..pw {
                    let y = paint::row_for(f64::from(x) / f64::from(pw - 1), out.height());
                    paint::blend(&mut out, x0 + x, y, GRID);
                }
            }
        }
        out
    }

    fn render_background(&self, request: &RenderRequest) -> Image {
        let mut out = Image::with_size(request.size);
        if self.settings().axis {
            for (x0, pw) in panels(out.width()) {
                draw_level_grid(&mut out, x0, pw);
            }
        }
        out
    }

    fn tracks_mouse(&self) -> bool {
        true
    }

    fn read_config(&self, store: &dyn ConfigStore, group: &str) {
        self.set_settings(ParadeSettings {
            axis: read_parsed(store, group, "axis", false),
            gradient_ref: read_parsed(store, group, "gradref", false),
        });
    }

    fn write_config(&self, store: &mut dyn ConfigStore, group: &str) {
        let s = self.settings();
        store.write(group, "axis", s.axis.to_string());
        store.write(group, "gradref", s.gradient_ref.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kurbo::Size;
    use scopekit_core::config::MemoryConfig;
    use scopekit_core::image::pack_argb;

    use super::*;

    #[test]
    fn panels_split_width_in_three() {
        assert_eq!(panels(38), [(0, 10), (14, 10), (28, 10)]);
        assert_eq!(panels(5), [(0, 0), (4, 0), (8, 0)]);
    }

    #[test]
    fn pure_red_frame_peaks_only_in_red_panel() {
        let frame = Arc::new(Image::filled(6, 6, pack_argb(255, 255, 0, 0)));
        let req = RenderRequest::new(Size::new(38.0, 9.0));
        let out = RgbParade::new().render_scope(&req, Some(&SignalInput::Frame(frame)));
        let top = |x: u32| out.pixel(x, 0).unwrap_or(0);
        let bottom = |x: u32| out.pixel(x, 8).unwrap_or(0);
        assert_ne!(top(0), 0, "red at full level");
        assert_eq!(top(14), 0);
        assert_ne!(bottom(14), 0, "green at zero");
        assert_ne!(bottom(28), 0, "blue at zero");
    }

    #[test]
    fn axis_setting_controls_background() {
        let parade = RgbParade::new();
        let req = RenderRequest::new(Size::new(38.0, 9.0));
        assert!(parade.render_background(&req).pixels().iter().all(|&p| p == 0));

        let mut store = MemoryConfig::new();
        store.write("Scope_RGB Parade", "axis", "true".into());
        parade.read_config(&store, "Scope_RGB Parade");
        assert!(parade.settings().axis);
        assert_eq!(parade.render_background(&req).pixel(0, 0), Some(GRID));
    }
}
