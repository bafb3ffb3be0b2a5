// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Audio spectrum: magnitude of the latest audio block over frequency.
//!
//! The displayed range is adjusted by dragging:
//!
//! - North/south changes the lower dB bound, or the upper one with Shift.
//!   The upper bound is capped at 0 dB, the lower at [`MIN_DB`], and the two
//!   stay at least [`MIN_DB_SPREAD`] apart.
//! - East/west changes the highest displayed frequency by 100 Hz per pixel,
//!   within [`MIN_FREQ`]..=[`MAX_FREQ`], and pins it so that it no longer
//!   follows the sample rate.

use std::sync::Mutex;

use scopekit_core::config::{ConfigStore, read_parsed};
use scopekit_core::gesture::{DragEvent, RescaleDirection};
use scopekit_core::image::{AudioBlock, Image, SignalInput};
use scopekit_core::layer::Layer;
use scopekit_core::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

use crate::fft::{self, SpectrumAnalyzer, WINDOW_SIZES};
use crate::lock;
use crate::paint::{self, DARK_WHITE, GRID, HIGHLIGHT};

/// Lowest selectable dB bound.
pub const MIN_DB: i32 = -120;
/// Smallest distance between the dB bounds.
pub const MIN_DB_SPREAD: i32 = 6;
/// Lowest selectable maximum frequency, in Hz.
pub const MIN_FREQ: u32 = 1000;
/// Highest selectable maximum frequency, in Hz.
pub const MAX_FREQ: u32 = 96_000;

/// Peak markers fall by this many dB per render.
const PEAK_DECAY: f32 = 1.0;

/// Visible level and frequency range of a spectrum display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpectrumRange {
    /// Level at the bottom edge, in dB.
    pub db_min: i32,
    /// Level at the top edge, in dB.
    pub db_max: i32,
    /// Frequency at the right edge, in Hz.
    pub freq_max: u32,
    /// `freq_max` was set by the user; otherwise it tracks the Nyquist
    /// frequency of the input.
    pub custom_freq: bool,
}

impl Default for SpectrumRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl SpectrumRange {
    /// -70..0 dB, 10 kHz until the first block arrives.
    pub const DEFAULT: Self = Self {
        db_min: -70,
        db_max: 0,
        freq_max: 10_000,
        custom_freq: false,
    };

    /// Applies one drag step. Returns `true` if the range changed.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "drag steps are a few pixels"
    )]
    pub fn apply_drag(&mut self, event: &DragEvent) -> bool {
        let before = *self;
        match event.direction {
            RescaleDirection::North => {
                let dy = event.displacement.y.round() as i32;
                let shift = event.modifiers.shift;
                if shift {
                    self.db_max = self.db_max.saturating_add(dy);
                } else {
                    self.db_min = self.db_min.saturating_add(dy);
                }
                self.db_max = self.db_max.clamp(MIN_DB, 0);
                self.db_min = self.db_min.clamp(MIN_DB, 0);
                if self.db_max - self.db_min < MIN_DB_SPREAD {
                    if shift {
                        self.db_min = self.db_max - MIN_DB_SPREAD;
                        if self.db_min < MIN_DB {
                            self.db_min = MIN_DB;
                            self.db_max = MIN_DB + MIN_DB_SPREAD;
                        }
                    } else {
                        self.db_max = self.db_min + MIN_DB_SPREAD;
                        if self.db_max > 0 {
                            self.db_max = 0;
                            self.db_min = -MIN_DB_SPREAD;
                        }
                    }
                }
            }
            RescaleDirection::East => {
                let dx = event.displacement.x.round() as i64;
                let freq = i64::from(self.freq_max).saturating_sub(dx.saturating_mul(100));
                let freq = freq.clamp(i64::from(MIN_FREQ), i64::from(MAX_FREQ));
                self.freq_max = u32::try_from(freq).unwrap_or(MAX_FREQ);
                self.custom_freq = true;
            }
            RescaleDirection::Northeast | RescaleDirection::Southeast => return false,
        }
        *self != before
    }

    /// Tracks the Nyquist frequency of `sample_rate` unless pinned.
    pub fn follow_sample_rate(&mut self, sample_rate: u32) {
        if !self.custom_freq && sample_rate > 0 && self.freq_max != sample_rate / 2 {
            log::debug!("spectrum range follows {sample_rate} Hz");
            self.freq_max = sample_rate / 2;
        }
    }

    /// Unpins the maximum frequency.
    pub fn reset_max_freq(&mut self) {
        self.custom_freq = false;
    }

    /// Position of `db` between the bounds, 0 at `db_min` and 1 at `db_max`.
    #[must_use]
    pub fn level(&self, db: f32) -> f64 {
        let span = f64::from(self.db_max - self.db_min);
        if span <= 0.0 {
            return 0.0;
        }
        ((f64::from(db) - f64::from(self.db_min)) / span).clamp(0.0, 1.0)
    }

    /// Number of leading FFT bins visible for a block at `sample_rate`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "bounded by the bin count"
    )]
    pub fn visible_bins(&self, bins: usize, sample_rate: u32) -> usize {
        if sample_rate == 0 || bins == 0 {
            return 0;
        }
        let nyquist = f64::from(sample_rate) / 2.0;
        let last = f64::from(self.freq_max) / nyquist * (bins - 1) as f64;
        (last.ceil() as usize + 1).min(bins)
    }

    /// Loads `dBmin`, `dBmax` and `freqMax` from `group`. A stored `freqMax`
    /// of 0 means the frequency follows the input.
    #[must_use]
    pub fn read(store: &dyn ConfigStore, group: &str) -> Self {
        let d = Self::DEFAULT;
        let freq: u32 = read_parsed(store, group, "freqMax", 0);
        Self {
            db_min: read_parsed(store, group, "dBmin", d.db_min),
            db_max: read_parsed(store, group, "dBmax", d.db_max),
            freq_max: if freq == 0 { d.freq_max } else { freq },
            custom_freq: freq != 0,
        }
    }

    /// Stores the range under `group`.
    pub fn write(&self, store: &mut dyn ConfigStore, group: &str) {
        store.write(group, "dBmax", self.db_max.to_string());
        store.write(group, "dBmin", self.db_min.to_string());
        let freq = if self.custom_freq { self.freq_max } else { 0 };
        store.write(group, "freqMax", freq.to_string());
    }

    /// Horizontal dB grid and vertical frequency grid.
    pub(crate) fn draw_grid(&self, out: &mut Image) {
        let (w, h) = (out.width(), out.height());
        let mut db = self.db_max;
        while db > self.db_min {
            let frac = f64::from(db - self.db_min) / f64::from(self.db_max - self.db_min);
            let y = paint::row_for(frac, h);
            paint::hline(out, y, 0, w, GRID);
            db -= 10;
        }
        let step = 1000 * self.freq_max.div_ceil(10_000).max(1);
        let mut hz = step;
        while hz < self.freq_max {
            let x = u64::from(hz) * u64::from(w) / u64::from(self.freq_max);
            paint::vline(out, u32::try_from(x).unwrap_or(w), 0, h, GRID);
            hz += step;
        }
    }
}

/// Audio spectrum parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpectrumSettings {
    /// Visible range.
    pub range: SpectrumRange,
    /// Index into [`WINDOW_SIZES`].
    pub window_index: usize,
    /// Crosshair follows the pointer.
    pub track_mouse: bool,
    /// Draw decaying peak markers.
    pub show_max: bool,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            range: SpectrumRange::DEFAULT,
            window_index: 0,
            track_mouse: true,
            show_max: true,
        }
    }
}

/// Loads the FFT window index shared by both spectrum scopes.
pub(crate) fn read_window_index(store: &dyn ConfigStore, group: &str) -> usize {
    read_parsed(store, group, "windowSize", 0_usize).min(WINDOW_SIZES.len() - 1)
}

/// FFT of `block` resampled to `width` columns of `range`, or `None` if the
/// block is too short.
pub(crate) fn spectrum_columns(
    analyzer: &SpectrumAnalyzer,
    block: &AudioBlock,
    window_index: usize,
    accel: u32,
    range: &SpectrumRange,
    width: u32,
) -> Option<Vec<f32>> {
    if block.samples.len() < fft::MIN_WINDOW {
        return None;
    }
    let base = WINDOW_SIZES[window_index.min(WINDOW_SIZES.len() - 1)];
    let window = fft::effective_window(base, block.available_per_channel(), accel);
    let bins = analyzer.power_db(block, window);
    if bins.is_empty() {
        return None;
    }
    let right = range.visible_bins(bins.len(), block.frequency);
    Some(fft::columns(&bins, width, right))
}

/// Audio spectrum scope.
#[derive(Debug, Default)]
pub struct AudioSpectrum {
    settings: Mutex<SpectrumSettings>,
    analyzer: SpectrumAnalyzer,
    peaks: Mutex<Vec<f32>>,
}

impl AudioSpectrum {
    /// Creates a spectrum with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings.
    pub fn settings(&self) -> SpectrumSettings {
        *lock(&self.settings)
    }

    /// Replaces the settings.
    pub fn set_settings(&self, settings: SpectrumSettings) {
        *lock(&self.settings) = settings;
    }

    /// Lets the maximum frequency follow the input again.
    pub fn reset_max_freq(&self) {
        lock(&self.settings).range.reset_max_freq();
    }
}

impl ScopeRenderer for AudioSpectrum {
    fn kind(&self) -> ScopeKind {
        ScopeKind::AudioSpectrum
    }

    fn depends_on_input(&self, layer: Layer) -> bool {
        layer == Layer::Scope
    }

    fn render_hud(&self, request: &RenderRequest) -> Image {
        let settings = self.settings();
        let mut out = Image::with_size(request.size);
        settings.range.draw_grid(&mut out);
        if settings.track_mouse
            && let Some(at) = request.mouse
        {
            paint::crosshair(&mut out, at, DARK_WHITE);
        }
        out
    }

    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image {
        let mut out = Image::with_size(request.size);
        let Some(SignalInput::Audio(block)) = input else {
            return out;
        };
        if out.is_empty() {
            return out;
        }
        let settings = {
            let mut s = lock(&self.settings);
            s.range.follow_sample_rate(block.frequency);
            *s
        };
        let (w, h) = (out.width(), out.height());
        let Some(cols) = spectrum_columns(
            &self.analyzer,
            block,
            settings.window_index,
            request.accel_factor,
            &settings.range,
            w,
        ) else {
            return out;
        };
        let range = settings.range;
        for (x, &db) in (0..w).zip(&cols) {
            let level = range.level(db);
            if level > 0.0 {
                paint::vline(&mut out, x, paint::row_for(level, h), h, DARK_WHITE);
            }
        }
        if settings.show_max {
            let mut peaks = lock(&self.peaks);
            if peaks.len() != cols.len() {
                peaks.clone_from(&cols);
            }
            for ((x, peak), &db) in (0..w).zip(peaks.iter_mut()).zip(&cols) {
                *peak = db.max(*peak - PEAK_DECAY);
                let level = range.level(*peak);
                if level > 0.0 {
                    paint::blend(&mut out, x, paint::row_for(level, h), HIGHLIGHT);
                }
            }
        }
        out
    }

    fn render_background(&self, request: &RenderRequest) -> Image {
        Image::with_size(request.size)
    }

    fn handle_drag(&self, event: &DragEvent) -> bool {
        lock(&self.settings).range.apply_drag(event)
    }

    fn tracks_mouse(&self) -> bool {
        self.settings().track_mouse
    }

    fn read_config(&self, store: &dyn ConfigStore, group: &str) {
        self.set_settings(SpectrumSettings {
            range: SpectrumRange::read(store, group),
            window_index: read_window_index(store, group),
            track_mouse: read_parsed(store, group, "trackMouse", true),
            show_max: read_parsed(store, group, "showMax", true),
        });
    }

    fn write_config(&self, store: &mut dyn ConfigStore, group: &str) {
        let s = self.settings();
        s.range.write(store, group);
        store.write(group, "windowSize", s.window_index.to_string());
        store.write(group, "trackMouse", s.track_mouse.to_string());
        store.write(group, "showMax", s.show_max.to_string());
    }
}
