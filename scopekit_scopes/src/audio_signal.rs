// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Peak level meter, one horizontal bar per channel on a dBFS scale.

use scopekit_core::image::{AudioBlock, Image, SignalInput};
use scopekit_core::layer::Layer;
use scopekit_core::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

use crate::paint::{self, GREEN, GRID, HIGHLIGHT, RED};

/// Lowest level shown, in dBFS.
pub const FLOOR_DB: f64 = -60.0;

/// Levels above this are drawn in the warning colour.
const WARN_DB: f64 = -6.0;

/// Peak level of `channel` in dBFS, reading every `stride`th sample.
///
/// Silence maps to [`FLOOR_DB`].
#[must_use]
pub fn peak_db(block: &AudioBlock, channel: u16, stride: u32) -> f64 {
    let peak = block
        .channel(channel)
        .step_by(stride.max(1) as usize)
        .map(|s| i32::from(s).unsigned_abs())
        .max()
        .unwrap_or(0);
    if peak == 0 {
        return FLOOR_DB;
    }
    (20.0 * (f64::from(peak) / 32768.0).log10()).max(FLOOR_DB)
}

/// Fraction of the bar length for `db`.
fn fraction(db: f64) -> f64 {
    ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0)
}

/// Audio level meter.
#[derive(Debug, Default)]
pub struct AudioSignal;

impl AudioSignal {
    /// Creates a level meter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScopeRenderer for AudioSignal {
    fn kind(&self) -> ScopeKind {
        ScopeKind::AudioSignal
    }

    fn depends_on_input(&self, layer: Layer) -> bool {
        layer == Layer::Scope
    }

    fn render_hud(&self, request: &RenderRequest) -> Image {
        Image::with_size(request.size)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "bar lengths are bounded by the image width"
    )]
    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image {
        let mut out = Image::with_size(request.size);
        let Some(SignalInput::Audio(block)) = input else {
            return out;
        };
        let channels = u32::from(block.channels);
        if channels == 0 || out.is_empty() {
            return out;
        }
        let (w, h) = (out.width(), out.height());
        let bar_h = h / channels;
        let warn_x = (fraction(WARN_DB) * f64::from(w)).round() as u32;
        for ch in 0..block.channels {
            let len = (fraction(peak_db(block, ch, request.accel_factor)) * f64::from(w)).round()
                as u32;
            let top = u32::from(ch) * bar_h;
            for y in top..top + bar_h.saturating_sub(1) {
                paint::hline(&mut out, y, 0, len.min(warn_x), GREEN);
                if len > warn_x {
                    paint::hline(&mut out, y, warn_x, len, RED);
                }
            }
        }
        out
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "tick positions are bounded by the image width"
    )]
    fn render_background(&self, request: &RenderRequest) -> Image {
        let mut out = Image::with_size(request.size);
        let (w, h) = (out.width(), out.height());
        let mut db = FLOOR_DB;
        while db <= 0.0 {
            let x = (fraction(db) * f64::from(w.saturating_sub(1))).round() as u32;
            let color = if db == 0.0 { HIGHLIGHT } else { GRID };
            paint::vline(&mut out, x, 0, h, color);
            db += 10.0;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kurbo::Size;

    use super::*;

    fn block(samples: Vec<i16>, channels: u16) -> AudioBlock {
        let per = samples.len() / usize::from(channels);
        AudioBlock {
            samples,
            frequency: 48_000,
            channels,
            samples_per_channel: per,
        }
    }

    #[test]
    fn peaks_are_per_channel() {
        let b = block(vec![16384, 0, -16384, 100, 0, -32768], 2);
        assert!((peak_db(&b, 0, 1) - 20.0 * 0.5_f64.log10()).abs() < 1e-9);
        assert!(peak_db(&b, 1, 1).abs() < 1e-9, "full scale is 0 dBFS");
        assert!((peak_db(&b, 5, 1) - FLOOR_DB).abs() < f64::EPSILON);
    }

    #[test]
    fn stride_skips_samples() {
        let b = block(vec![0, 32767, 0, 0], 1);
        assert!((peak_db(&b, 0, 2) - FLOOR_DB).abs() < f64::EPSILON);
        assert!(peak_db(&b, 0, 1) > -0.01);
    }

    #[test]
    fn loud_channel_draws_warning_segment() {
        let b = Arc::new(block(vec![32767, 64], 2));
        let req = RenderRequest::new(Size::new(60.0, 10.0));
        let out = AudioSignal.render_scope(&req, Some(&SignalInput::Audio(b)));
        assert_eq!(out.pixel(0, 0), Some(GREEN));
        assert_eq!(out.pixel(58, 0), Some(RED));
        assert_eq!(out.pixel(58, 5), Some(0), "second channel is quiet");
    }

    #[test]
    fn frames_are_ignored() {
        let frame = SignalInput::Frame(Arc::new(Image::filled(2, 2, 1)));
        let out = AudioSignal.render_scope(&RenderRequest::new(Size::new(4.0, 4.0)), Some(&frame));
        assert!(out.pixels().iter().all(|&p| p == 0));
    }
}
