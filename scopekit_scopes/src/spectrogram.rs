// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spectrogram: recent spectra stacked over time, newest at the bottom.
//!
//! Each Scope render with a new audio block appends one spectrum to a
//! bounded history. Spectra are stored unscaled, so range changes and
//! resizes redraw the whole history without losing it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use scopekit_core::config::{ConfigStore, read_parsed};
use scopekit_core::gesture::DragEvent;
use scopekit_core::image::{AudioBlock, Image, SignalInput, pack_argb, pixel_dims};
use scopekit_core::layer::Layer;
use scopekit_core::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

use crate::fft::{self, SpectrumAnalyzer, WINDOW_SIZES};
use crate::lock;
use crate::paint::{self, DARK_WHITE, HIGHLIGHT};
use crate::spectrum::{SpectrumRange, read_window_index};

/// Spectra kept for redrawing.
pub const HISTORY_SIZE: usize = 1000;

/// Levels above this fraction of the range are highlighted.
const PEAK_LEVEL: f64 = 0.9;

/// Spectrogram parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpectrogramSettings {
    /// Visible range.
    pub range: SpectrumRange,
    /// Index into [`WINDOW_SIZES`].
    pub window_index: usize,
    /// Crosshair follows the pointer.
    pub track_mouse: bool,
    /// Frequency and level grid in the HUD.
    pub draw_grid: bool,
    /// Draw near-peak levels in the highlight colour.
    pub highlight_peaks: bool,
}

impl Default for SpectrogramSettings {
    fn default() -> Self {
        Self {
            range: SpectrumRange::DEFAULT,
            window_index: 0,
            track_mouse: true,
            draw_grid: true,
            highlight_peaks: true,
        }
    }
}

/// One analysed block.
#[derive(Clone, Debug)]
struct Row {
    bins: Vec<f32>,
    sample_rate: u32,
}

#[derive(Debug, Default)]
struct History {
    rows: VecDeque<Row>,
    last: Weak<AudioBlock>,
}

impl History {
    fn push(&mut self, block: &Arc<AudioBlock>, bins: Vec<f32>) {
        self.last = Arc::downgrade(block);
        self.rows.push_front(Row {
            bins,
            sample_rate: block.frequency,
        });
        self.rows.truncate(HISTORY_SIZE);
    }

    /// Whether `block` is the one appended last.
    fn is_current(&self, block: &Arc<AudioBlock>) -> bool {
        self.last.upgrade().is_some_and(|l| Arc::ptr_eq(&l, block))
    }
}

/// Dark blue through orange to white.
#[expect(
    clippy::cast_possible_truncation,
    reason = "channel values are clamped to 0..=255"
)]
fn heat(level: f64) -> u32 {
    let l = level.clamp(0.0, 1.0);
    let ch = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    pack_argb(255, ch(l * 1.6), ch(l * l * 1.2), ch(0.35 * (1.0 - l) + l * l * l))
}

/// Spectrogram scope.
#[derive(Debug, Default)]
pub struct Spectrogram {
    settings: Mutex<SpectrogramSettings>,
    analyzer: SpectrumAnalyzer,
    history: Mutex<History>,
}

impl Spectrogram {
    /// Creates a spectrogram with an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings.
    pub fn settings(&self) -> SpectrogramSettings {
        *lock(&self.settings)
    }

    /// Replaces the settings.
    pub fn set_settings(&self, settings: SpectrogramSettings) {
        *lock(&self.settings) = settings;
    }

    /// Number of spectra in the history.
    pub fn history_len(&self) -> usize {
        lock(&self.history).rows.len()
    }

    /// Drops the history.
    pub fn clear_history(&self) {
        let mut history = lock(&self.history);
        log::debug!("dropping {} spectrogram rows", history.rows.len());
        history.rows.clear();
        history.last = Weak::new();
    }
}

impl ScopeRenderer for Spectrogram {
    fn kind(&self) -> ScopeKind {
        ScopeKind::Spectrogram
    }

    fn depends_on_input(&self, layer: Layer) -> bool {
        layer == Layer::Scope
    }

    fn render_hud(&self, request: &RenderRequest) -> Image {
        let settings = self.settings();
        let mut out = Image::with_size(request.size);
        if settings.draw_grid {
            settings.range.draw_grid(&mut out);
        }
        if settings.track_mouse
            && let Some(at) = request.mouse
        {
            paint::crosshair(&mut out, at, DARK_WHITE);
        }
        out
    }

    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image {
        let mut out = Image::with_size(request.size);
        let settings = {
            let mut s = lock(&self.settings);
            if let Some(SignalInput::Audio(block)) = input {
                s.range.follow_sample_rate(block.frequency);
            }
            *s
        };
        let mut history = lock(&self.history);
        if let Some(SignalInput::Audio(block)) = input
            && !history.is_current(block)
            && block.samples.len() >= fft::MIN_WINDOW
        {
            let base = WINDOW_SIZES[settings.window_index.min(WINDOW_SIZES.len() - 1)];
            let window =
                fft::effective_window(base, block.available_per_channel(), request.accel_factor);
            let bins = self.analyzer.power_db(block, window);
            if !bins.is_empty() {
                history.push(block, bins);
            }
        }
        let (w, h) = (out.width(), out.height());
        let range = settings.range;
        for (row, y) in history.rows.iter().zip((0..h).rev()) {
            let right = range.visible_bins(row.bins.len(), row.sample_rate);
            for (x, db) in (0..w).zip(fft::columns(&row.bins, w, right)) {
                let level = range.level(db);
                if level <= 0.0 {
                    continue;
                }
                let color = if settings.highlight_peaks && level >= PEAK_LEVEL {
                    HIGHLIGHT
                } else {
                    heat(level)
                };
                out.set_pixel(x, y, color);
            }
        }
        out
    }

    fn render_background(&self, request: &RenderRequest) -> Image {
        let (w, h) = pixel_dims(request.size);
        Image::filled(w, h, heat(0.0))
    }

    fn handle_drag(&self, event: &DragEvent) -> bool {
        lock(&self.settings).range.apply_drag(event)
    }

    fn tracks_mouse(&self) -> bool {
        self.settings().track_mouse
    }

    fn read_config(&self, store: &dyn ConfigStore, group: &str) {
        self.set_settings(SpectrogramSettings {
            range: SpectrumRange::read(store, group),
            window_index: read_window_index(store, group),
            track_mouse: read_parsed(store, group, "trackMouse", true),
            draw_grid: read_parsed(store, group, "drawGrid", true),
            highlight_peaks: read_parsed(store, group, "highlightPeaks", true),
        });
    }

    fn write_config(&self, store: &mut dyn ConfigStore, group: &str) {
        let s = self.settings();
        s.range.write(store, group);
        store.write(group, "windowSize", s.window_index.to_string());
        store.write(group, "trackMouse", s.track_mouse.to_string());
        store.write(group, "drawGrid", s.draw_grid.to_string());
        store.write(group, "highlightPeaks", s.highlight_peaks.to_string());
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Size, Vec2};
    use scopekit_core::config::MemoryConfig;
    use scopekit_core::gesture::{Modifiers, RescaleDirection};

    use super::*;

    fn block(amplitude: i16, n: usize) -> Arc<AudioBlock> {
        // Alternating samples put all energy at the Nyquist bin.
        let samples = (0..n)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect();
        Arc::new(AudioBlock {
            samples,
            frequency: 8_000,
            channels: 1,
            samples_per_channel: n,
        })
    }

    #[test]
    fn each_new_block_adds_one_row() {
        let sg = Spectrogram::new();
        let req = RenderRequest::new(Size::new(16.0, 8.0));
        let a = SignalInput::Audio(block(20_000, 256));
        sg.render_scope(&req, Some(&a));
        assert_eq!(sg.history_len(), 1);
        // Forced re-render of the same block.
        sg.render_scope(&req, Some(&a));
        assert_eq!(sg.history_len(), 1);
        sg.render_scope(&req, Some(&SignalInput::Audio(block(20_000, 256))));
        assert_eq!(sg.history_len(), 2);
        sg.render_scope(&req, None);
        assert_eq!(sg.history_len(), 2);
    }

    #[test]
    fn newest_row_is_at_the_bottom() {
        let sg = Spectrogram::new();
        let req = RenderRequest::new(Size::new(16.0, 8.0));
        let out = sg.render_scope(&req, Some(&SignalInput::Audio(block(20_000, 256))));
        assert!((0..16).any(|x| out.pixel(x, 7) != Some(0)));
        assert!((0..16).all(|x| out.pixel(x, 6) == Some(0)));
    }

    #[test]
    fn history_is_bounded() {
        let sg = Spectrogram::new();
        let req = RenderRequest::new(Size::new(2.0, 2.0));
        for _ in 0..HISTORY_SIZE + 5 {
            sg.render_scope(&req, Some(&SignalInput::Audio(block(1_000, 64))));
        }
        assert_eq!(sg.history_len(), HISTORY_SIZE);
        sg.clear_history();
        assert_eq!(sg.history_len(), 0);
    }

    #[test]
    fn drag_rescales_range() {
        let sg = Spectrogram::new();
        let step = DragEvent {
            displacement: Vec2::new(-10.0, 0.0),
            direction: RescaleDirection::East,
            modifiers: Modifiers::NONE,
        };
        assert!(sg.handle_drag(&step));
        let range = sg.settings().range;
        assert!(range.custom_freq);
        assert_eq!(range.freq_max, 11_000);
    }

    #[test]
    fn settings_roundtrip_through_config() {
        let sg = Spectrogram::new();
        sg.set_settings(SpectrogramSettings {
            draw_grid: false,
            window_index: 3,
            ..SpectrogramSettings::default()
        });
        let mut store = MemoryConfig::new();
        sg.write_config(&mut store, "Scope_Spectrogram");
        let fresh = Spectrogram::new();
        fresh.read_config(&store, "Scope_Spectrogram");
        assert_eq!(fresh.settings(), sg.settings());
    }
}
