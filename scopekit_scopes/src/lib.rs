// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference scope renderers for `scopekit_core`.
//!
//! Each module implements [`ScopeRenderer`] for one [`ScopeKind`]:
//!
//! | Module            | Kind            | Input | Acceleration factor `n`          |
//! |-------------------|-----------------|-------|----------------------------------|
//! | [`histogram`]     | Histogram       | frame | every `n`th pixel of each row    |
//! | [`waveform`]      | Waveform        | frame | every `n`th row                  |
//! | [`rgb_parade`]    | RGB Parade      | frame | every `n`th row                  |
//! | [`vectorscope`]   | Vectorscope     | frame | every `n`th pixel                |
//! | [`audio_signal`]  | Audio Signal    | audio | every `n`th sample               |
//! | [`spectrum`]      | `AudioSpectrum` | audio | FFT window halved per doubling   |
//! | [`spectrogram`]   | Spectrogram     | audio | FFT window halved per doubling   |
//!
//! Renderers keep their parameters behind a mutex so that drag gestures and
//! settings changes on the coordinating thread are seen by the next render
//! on a worker.
//!
//! [`ScopeKind`]: scopekit_core::renderer::ScopeKind

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scopekit_core::renderer::ScopeRenderer;

pub mod audio_signal;
pub mod fft;
pub mod histogram;
pub mod rgb_parade;
pub mod spectrogram;
pub mod spectrum;
pub mod vectorscope;
pub mod waveform;

mod paint;

/// One renderer of every kind, with default settings.
#[must_use]
pub fn standard_scopes() -> Vec<Arc<dyn ScopeRenderer>> {
    vec![
        Arc::new(vectorscope::Vectorscope::new()),
        Arc::new(waveform::Waveform::new()),
        Arc::new(rgb_parade::RgbParade::new()),
        Arc::new(histogram::Histogram::new()),
        Arc::new(audio_signal::AudioSignal::new()),
        Arc::new(spectrum::AudioSpectrum::new()),
        Arc::new(spectrogram::Spectrogram::new()),
    ]
}

/// Locks renderer state. Settings are plain values, so a poisoned lock
/// still holds usable data.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn standard_set_covers_every_kind_once() {
        let scopes = standard_scopes();
        let names: HashSet<_> = scopes.iter().map(|s| s.name().to_owned()).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains("RGB Parade"));
        assert!(names.contains("AudioSpectrum"));
    }
}
