// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Acceleration factor feedback.
//!
//! In realtime mode every completed render reports how long it took. The
//! [`AccelerationController`] turns that latency into an integer hint handed
//! to the next render of the same layer: 1 means full fidelity, larger values
//! ask the renderer to cut corners so it keeps up with the target rate.
//!
//! The factor is `max(1, ceil(elapsed_ms * target_fps / 1000))`, i.e. the
//! number of target-rate frame intervals the last render consumed.

use std::time::Duration;

use crate::layer::{Layer, LayerSet};

/// Default target refresh rate for realtime mode.
pub const REALTIME_FPS: u32 = 30;

/// Computes the acceleration factor for a render that took `elapsed`.
///
/// Never returns less than 1, including for a zero `target_fps`.
#[must_use]
pub fn compute_factor(elapsed: Duration, target_fps: u32) -> u32 {
    factor_from_millis(elapsed.as_secs_f64() * 1000.0, target_fps)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is finite, positive and clamped to the u32 range"
)]
fn factor_from_millis(ms: f64, target_fps: u32) -> u32 {
    let frames = (ms * f64::from(target_fps) / 1000.0).ceil();
    if !frames.is_finite() || frames < 1.0 {
        return 1;
    }
    frames.min(f64::from(u32::MAX)) as u32
}

/// How elapsed times are turned into factors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AccelPolicy {
    /// Use the last elapsed time as-is.
    Direct,
    /// Run elapsed times through an exponential moving average first.
    ///
    /// Smaller `alpha` means more smoothing.
    Smoothed {
        /// EMA smoothing factor (0.0–1.0).
        alpha: f32,
    },
}

/// Configuration for the [`AccelerationController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccelerationConfig {
    /// Target refresh rate in frames per second.
    pub target_fps: u32,
    /// Policy for turning elapsed times into factors.
    pub policy: AccelPolicy,
}

impl AccelerationConfig {
    /// Direct feedback at [`REALTIME_FPS`].
    #[must_use]
    pub const fn realtime() -> Self {
        Self {
            target_fps: REALTIME_FPS,
            policy: AccelPolicy::Direct,
        }
    }

    /// EMA-smoothed feedback at [`REALTIME_FPS`], for renderers whose cost
    /// jitters a lot between frames.
    #[must_use]
    pub const fn smoothed() -> Self {
        Self {
            target_fps: REALTIME_FPS,
            policy: AccelPolicy::Smoothed { alpha: 0.3 },
        }
    }
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        Self::realtime()
    }
}

/// Exponential moving average over elapsed milliseconds.
#[derive(Clone, Copy, Debug)]
struct Ema {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl Ema {
    const fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha,
            initialized: false,
        }
    }

    fn update(&mut self, sample: f64) {
        if self.initialized {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        } else {
            self.value = sample;
            self.initialized = true;
        }
    }

    const fn get(&self) -> f64 {
        self.value
    }

    fn reset(&mut self) {
        *self = Self::new(self.alpha);
    }
}

/// Per-widget acceleration state, one track per layer.
#[derive(Clone, Debug)]
pub struct AccelerationController {
    config: AccelerationConfig,
    ema: LayerSet<Ema>,
}

impl AccelerationController {
    /// Creates a controller with the given configuration.
    #[must_use]
    pub fn new(config: AccelerationConfig) -> Self {
        let alpha = match config.policy {
            AccelPolicy::Direct => 1.0,
            AccelPolicy::Smoothed { alpha } => f64::from(alpha.clamp(0.0, 1.0)),
        };
        Self {
            config,
            ema: LayerSet::from_fn(|_| Ema::new(alpha)),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AccelerationConfig {
        &self.config
    }

    /// Feeds the elapsed time of a completed `layer` render and returns the
    /// factor to use for that layer's next render.
    pub fn next_factor(&mut self, layer: Layer, elapsed: Duration) -> u32 {
        let ms = elapsed.as_secs_f64() * 1000.0;
        match self.config.policy {
            AccelPolicy::Direct => factor_from_millis(ms, self.config.target_fps),
            AccelPolicy::Smoothed { .. } => {
                let ema = &mut self.ema[layer];
                ema.update(ms);
                factor_from_millis(ema.get(), self.config.target_fps)
            }
        }
    }

    /// Forgets smoothing history. Called when realtime mode is turned off.
    pub fn reset(&mut self) {
        for (_, ema) in self.ema.iter_mut() {
            ema.reset();
        }
    }
}

impl Default for AccelerationController {
    fn default() -> Self {
        Self::new(AccelerationConfig::default())
    }
}
