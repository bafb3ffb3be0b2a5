// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer contract for scope implementations.
//!
//! Every scope kind provides one [`ScopeRenderer`]. The scheduling core never
//! looks at pixels: it decides *when* each of the three layers is recomputed
//! and calls the matching `render_*` method on a worker thread.
//!
//! Renderers are shared between the coordinating thread and workers, so they
//! are `Send + Sync`. Parameters that change through drag gestures or
//! configuration need interior mutability; a layer render must take a
//! consistent snapshot of them.
//!
//! # Acceleration factor
//!
//! [`RenderRequest::accel_factor`] is an opaque hint, at least 1. A renderer
//! receiving a factor of `n` should do roughly `1/n` of its full work, in
//! whatever way suits its algorithm (pixel stride, sample stride, smaller
//! transform window). It stays at 1 unless realtime mode is enabled.

use core::fmt;

use kurbo::{Point, Rect, Size};

use crate::config::ConfigStore;
use crate::gesture::DragEvent;
use crate::image::{Image, SignalInput};
use crate::layer::Layer;

/// What kind of signal a scope consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Video frames.
    Frame,
    /// Audio sample blocks.
    Audio,
}

/// Identifies a scope variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Chroma plot on the Cb/Cr plane.
    Vectorscope,
    /// Luma distribution.
    Histogram,
    /// Luma per column.
    Waveform,
    /// Per-channel waveform, side by side.
    RgbParade,
    /// Peak level per audio channel.
    AudioSignal,
    /// Frequency magnitude of the latest audio block.
    AudioSpectrum,
    /// Scrolling frequency magnitude history.
    Spectrogram,
}

impl ScopeKind {
    /// The signal this kind of scope consumes.
    #[must_use]
    pub const fn input_kind(self) -> InputKind {
        match self {
            Self::Vectorscope | Self::Histogram | Self::Waveform | Self::RgbParade => {
                InputKind::Frame
            }
            Self::AudioSignal | Self::AudioSpectrum | Self::Spectrogram => InputKind::Audio,
        }
    }

    /// Human-readable name, also used as the default widget name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vectorscope => "Vectorscope",
            Self::Histogram => "Histogram",
            Self::Waveform => "Waveform",
            Self::RgbParade => "RGB Parade",
            Self::AudioSignal => "Audio Signal",
            Self::AudioSpectrum => "AudioSpectrum",
            Self::Spectrogram => "Spectrogram",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of a single layer render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderRequest {
    /// Acceleration hint, at least 1.
    pub accel_factor: u32,
    /// Size of the scope rect; the returned image should match it.
    pub size: Size,
    /// Pointer position relative to the scope rect, if it is inside the
    /// widget.
    pub mouse: Option<Point>,
}

impl RenderRequest {
    /// A full-fidelity request without pointer information.
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self {
            accel_factor: 1,
            size,
            mouse: None,
        }
    }
}

/// Computes the images of one scope kind.
pub trait ScopeRenderer: Send + Sync {
    /// Which scope this renderer implements.
    fn kind(&self) -> ScopeKind;

    /// Unique widget name, used for lookups and settings groups.
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Area of a widget of size `widget` that the layers cover.
    ///
    /// Defaults to the whole widget. Renderers that reserve margins for
    /// labels inset it.
    fn scope_rect(&self, widget: Size) -> Rect {
        widget.to_rect()
    }

    /// Whether new input data invalidates `layer`.
    fn depends_on_input(&self, layer: Layer) -> bool;

    /// Renders the heads-up display.
    fn render_hud(&self, request: &RenderRequest) -> Image;

    /// Renders the measurement. `input` is `None` until the first delivery.
    fn render_scope(&self, request: &RenderRequest, input: Option<&SignalInput>) -> Image;

    /// Renders the backdrop.
    fn render_background(&self, request: &RenderRequest) -> Image;

    /// Applies one drag step. Returns `true` if a parameter changed.
    fn handle_drag(&self, event: &DragEvent) -> bool {
        _ = event;
        false
    }

    /// Whether the HUD follows the pointer and must be refreshed on motion.
    fn tracks_mouse(&self) -> bool {
        false
    }

    /// Loads renderer-specific settings from `group`.
    fn read_config(&self, store: &dyn ConfigStore, group: &str) {
        _ = (store, group);
    }

    /// Stores renderer-specific settings under `group`.
    fn write_config(&self, store: &mut dyn ConfigStore, group: &str) {
        _ = (store, group);
    }
}

/// Calls the `render_*` method matching `layer`.
pub fn render_layer(
    renderer: &dyn ScopeRenderer,
    layer: Layer,
    request: &RenderRequest,
    input: Option<&SignalInput>,
) -> Image {
    match layer {
        Layer::Background => renderer.render_background(request),
        Layer::Scope => renderer.render_scope(request, input),
        Layer::Hud => renderer.render_hud(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_kinds_split_video_and_audio() {
        assert_eq!(ScopeKind::Histogram.input_kind(), InputKind::Frame);
        assert_eq!(ScopeKind::RgbParade.input_kind(), InputKind::Frame);
        assert_eq!(ScopeKind::Spectrogram.input_kind(), InputKind::Audio);
        assert_eq!(ScopeKind::AudioSignal.input_kind(), InputKind::Audio);
    }

    #[test]
    fn render_layer_routes_by_layer() {
        struct Marker;
        impl ScopeRenderer for Marker {
            fn kind(&self) -> ScopeKind {
                ScopeKind::Waveform
            }
            fn depends_on_input(&self, layer: Layer) -> bool {
                layer == Layer::Scope
            }
            fn render_hud(&self, _: &RenderRequest) -> Image {
                Image::filled(1, 1, 3)
            }
            fn render_scope(&self, _: &RenderRequest, _: Option<&SignalInput>) -> Image {
                Image::filled(1, 1, 2)
            }
            fn render_background(&self, _: &RenderRequest) -> Image {
                Image::filled(1, 1, 1)
            }
        }

        let req = RenderRequest::new(Size::new(1.0, 1.0));
        for (layer, px) in [(Layer::Background, 1), (Layer::Scope, 2), (Layer::Hud, 3)] {
            let img = render_layer(&Marker, layer, &req, None);
            assert_eq!(img.pixel(0, 0), Some(px), "{layer} routed wrong");
        }
        assert_eq!(Marker.name(), "Waveform");
        assert_eq!(
            Marker.scope_rect(Size::new(4.0, 3.0)),
            Rect::new(0.0, 0.0, 4.0, 3.0)
        );
    }
}
