// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the scheduling loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! layer schedulers and the scope manager call at each decision point. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] is a cloneable handle shared by every widget of a manager. A
//! sink is installed once with [`Tracer::install`] and receives events from
//! all of them. When the `trace` feature is **off**, every `Tracer` method
//! compiles to nothing. When **on**, each method takes an uncontended lock and
//! checks for an installed sink before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kurbo::Vec2;

use crate::gesture::RescaleDirection;
use crate::job::{JobId, WidgetId};
use crate::layer::Layer;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why a dispatch attempt did not submit a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The widget is hidden or has a zero-area size.
    Hidden,
    /// A job for the same layer is still running.
    InFlight,
    /// New data arrived while auto-refresh is off.
    Deferred,
    /// The layer does not depend on input data.
    Ignored,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a render job is submitted.
#[derive(Clone, Copy, Debug)]
pub struct DispatchEvent {
    /// Widget owning the layer.
    pub widget: WidgetId,
    /// Layer being rendered.
    pub layer: Layer,
    /// Id of the submitted job.
    pub job: JobId,
    /// Acceleration factor handed to the renderer.
    pub accel_factor: u32,
    /// Number of triggers folded into this job.
    pub coalesced: u32,
    /// When the job was submitted.
    pub at: Instant,
}

/// Emitted when a trigger did not lead to a dispatch.
#[derive(Clone, Copy, Debug)]
pub struct SkipEvent {
    /// Widget owning the layer.
    pub widget: WidgetId,
    /// Layer that was not rendered.
    pub layer: Layer,
    /// Why nothing was submitted.
    pub reason: SkipReason,
    /// When the decision was made.
    pub at: Instant,
}

/// Emitted when a job completion has been handled on the coordinating thread.
#[derive(Clone, Copy, Debug)]
pub struct CompletionEvent {
    /// Widget owning the layer.
    pub widget: WidgetId,
    /// Layer that finished rendering.
    pub layer: Layer,
    /// Id of the completed job.
    pub job: JobId,
    /// Wall-clock render time measured by the job.
    pub elapsed: Duration,
    /// Acceleration factor in effect after the completion.
    pub accel_factor: u32,
    /// Whether a follow-up job was dispatched immediately.
    pub redispatched: bool,
    /// When the completion was handled.
    pub at: Instant,
}

/// Emitted after the manager recomputed what the signal source must deliver.
#[derive(Clone, Copy, Debug)]
pub struct DemandEvent {
    /// Whether any frame scope wants frames.
    pub frames: bool,
    /// Whether any audio scope wants audio.
    pub audio: bool,
    /// When the recomputation ran.
    pub at: Instant,
}

/// Emitted for every drag step delivered to a renderer.
#[derive(Clone, Copy, Debug)]
pub struct GestureEvent {
    /// Widget receiving the drag.
    pub widget: WidgetId,
    /// Locked direction of the gesture.
    pub direction: RescaleDirection,
    /// Displacement since the previous step.
    pub displacement: Vec2,
    /// Whether the renderer changed a parameter.
    pub handled: bool,
    /// When the step was processed.
    pub at: Instant,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the scheduling loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a render job is submitted.
    fn on_dispatch(&mut self, e: &DispatchEvent) {
        _ = e;
    }

    /// Called when a trigger was absorbed without a dispatch.
    fn on_skip(&mut self, e: &SkipEvent) {
        _ = e;
    }

    /// Called after a completion has been stored.
    fn on_completion(&mut self, e: &CompletionEvent) {
        _ = e;
    }

    /// Called after a source-demand recomputation.
    fn on_demand(&mut self, e: &DemandEvent) {
        _ = e;
    }

    /// Called for every drag step.
    fn on_gesture(&mut self, e: &GestureEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer handle
// ---------------------------------------------------------------------------

/// A sink shared between the tracer and whoever wants to inspect it later.
pub type SharedSink = Arc<Mutex<dyn TraceSink + Send>>;

/// Cloneable handle around an optional [`TraceSink`].
///
/// All clones share the same slot, so installing a sink on one handle makes
/// it visible to every widget that holds a clone.
#[derive(Clone, Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    slot: Arc<Mutex<Option<SharedSink>>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer with no sink installed.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Installs `sink`, replacing any previous one.
    ///
    /// Without the `trace` feature this is a no-op.
    pub fn install(&self, sink: SharedSink) {
        #[cfg(feature = "trace")]
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(sink);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
        }
    }

    /// Removes the installed sink, if any.
    pub fn uninstall(&self) {
        #[cfg(feature = "trace")]
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }

    #[cfg(feature = "trace")]
    fn with_sink(&self, f: impl FnOnce(&mut dyn TraceSink)) {
        let Ok(slot) = self.slot.lock() else {
            return;
        };
        if let Some(sink) = slot.as_ref()
            && let Ok(mut sink) = sink.lock()
        {
            f(&mut *sink);
        }
    }

    /// Emits a [`DispatchEvent`].
    #[inline]
    pub fn dispatch(&self, e: &DispatchEvent) {
        #[cfg(feature = "trace")]
        self.with_sink(|s| s.on_dispatch(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SkipEvent`].
    #[inline]
    pub fn skip(&self, e: &SkipEvent) {
        #[cfg(feature = "trace")]
        self.with_sink(|s| s.on_skip(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CompletionEvent`].
    #[inline]
    pub fn completion(&self, e: &CompletionEvent) {
        #[cfg(feature = "trace")]
        self.with_sink(|s| s.on_completion(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DemandEvent`].
    #[inline]
    pub fn demand(&self, e: &DemandEvent) {
        #[cfg(feature = "trace")]
        self.with_sink(|s| s.on_demand(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`GestureEvent`].
    #[inline]
    pub fn gesture(&self, e: &GestureEvent) {
        #[cfg(feature = "trace")]
        self.with_sink(|s| s.on_gesture(e));
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}
