// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer render scheduling with single-flight gating and coalescing.
//!
//! A [`LayerScheduler`] decides when one layer of one widget is recomputed.
//! Triggers ([`notify_new_data`](LayerScheduler::notify_new_data),
//! [`force_update`](LayerScheduler::force_update)) only bump counters and try
//! to dispatch. Dispatch succeeds only if the widget is showing and the
//! layer's [`Gate`] is free; it then resets both counters, so every trigger
//! that arrived since the previous dispatch is folded into one job.
//!
//! Triggers that arrive while a job is in flight stay counted. When the
//! completion is handled the scheduler stores the image, releases the gate,
//! updates the acceleration factor (realtime mode only) and immediately
//! dispatches one follow-up job if
//! `(pending_new_data > 0 && auto_refresh) || pending_forced > 0`.
//!
//! ```text
//!   trigger ──► counters += 1 ──► attempt_dispatch ──► gate busy? ──► stay counted
//!                                        │
//!                                        ▼
//!                           swap counters to 0, submit job
//!                                        │
//!                                        ▼
//!   on_job_completed: store image, release gate, factor, re-dispatch if pending
//! ```

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use kurbo::{Point, Size};

use crate::accel::AccelerationController;
use crate::gate::Gate;
use crate::image::{Image, SignalInput};
use crate::job::{Dispatcher, JobCompletion, JobId, WidgetId};
use crate::layer::Layer;
use crate::renderer::{RenderRequest, ScopeRenderer};
use crate::trace::{CompletionEvent, DispatchEvent, SkipEvent, SkipReason};

/// Result of a trigger or dispatch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// A job was submitted.
    Dispatched(JobId),
    /// The widget is hidden or has a zero-area size; work stays pending.
    Hidden,
    /// A job for this layer is running; work stays pending.
    InFlight,
    /// New data was counted but auto-refresh is off.
    Deferred,
    /// The layer does not depend on input data.
    Ignored,
}

impl DispatchOutcome {
    /// The submitted job, if any.
    #[must_use]
    pub const fn job(self) -> Option<JobId> {
        match self {
            Self::Dispatched(id) => Some(id),
            _ => None,
        }
    }

    const fn skip_reason(self) -> Option<SkipReason> {
        match self {
            Self::Dispatched(_) => None,
            Self::Hidden => Some(SkipReason::Hidden),
            Self::InFlight => Some(SkipReason::InFlight),
            Self::Deferred => Some(SkipReason::Deferred),
            Self::Ignored => Some(SkipReason::Ignored),
        }
    }
}

/// Widget state a scheduler needs to build and submit a job.
#[derive(Clone, Copy)]
pub struct DispatchContext<'a> {
    /// Owning widget.
    pub widget: WidgetId,
    /// Widget is visible and has a non-zero size.
    pub showing: bool,
    /// New data triggers renders.
    pub auto_refresh: bool,
    /// Size of the scope rect.
    pub size: Size,
    /// Pointer position relative to the scope rect.
    pub mouse: Option<Point>,
    /// Latest input snapshot.
    pub input: Option<&'a SignalInput>,
    /// Renderer of the widget.
    pub renderer: &'a Arc<dyn ScopeRenderer>,
    /// Submission handle.
    pub dispatcher: &'a Dispatcher,
}

impl core::fmt::Debug for DispatchContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("widget", &self.widget)
            .field("showing", &self.showing)
            .field("auto_refresh", &self.auto_refresh)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Scheduling state of one layer of one widget.
#[derive(Debug)]
pub struct LayerScheduler {
    layer: Layer,
    depends_on_input: bool,
    gate: Gate,
    pending_new_data: AtomicU32,
    pending_forced: AtomicU32,
    accel_factor: u32,
    cached: Image,
    in_flight: Option<JobId>,
    dispatched: u64,
}

impl LayerScheduler {
    /// Creates an idle scheduler with an empty cache and factor 1.
    #[must_use]
    pub fn new(layer: Layer, depends_on_input: bool) -> Self {
        Self {
            layer,
            depends_on_input,
            gate: Gate::new(),
            pending_new_data: AtomicU32::new(0),
            pending_forced: AtomicU32::new(0),
            accel_factor: 1,
            cached: Image::empty(),
            in_flight: None,
            dispatched: 0,
        }
    }

    /// The scheduled layer.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Whether new input invalidates this layer.
    #[must_use]
    pub const fn depends_on_input(&self) -> bool {
        self.depends_on_input
    }

    /// Last successfully rendered image.
    #[must_use]
    pub const fn cached_image(&self) -> &Image {
        &self.cached
    }

    /// Current acceleration factor.
    #[must_use]
    pub const fn accel_factor(&self) -> u32 {
        self.accel_factor
    }

    /// Sets the factor back to full fidelity.
    pub fn reset_accel(&mut self) {
        self.accel_factor = 1;
    }

    /// Data notifications since the last dispatch.
    #[must_use]
    pub fn pending_new_data(&self) -> u32 {
        self.pending_new_data.load(Ordering::Acquire)
    }

    /// Forced updates since the last dispatch.
    #[must_use]
    pub fn pending_forced(&self) -> u32 {
        self.pending_forced.load(Ordering::Acquire)
    }

    /// Job currently running for this layer.
    #[must_use]
    pub const fn in_flight(&self) -> Option<JobId> {
        self.in_flight
    }

    /// Total number of jobs submitted.
    #[must_use]
    pub const fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Whether a follow-up render is owed.
    #[must_use]
    pub fn has_pending(&self, auto_refresh: bool) -> bool {
        (self.pending_new_data() > 0 && auto_refresh) || self.pending_forced() > 0
    }

    /// Records that new input arrived.
    ///
    /// Layers that do not depend on input ignore it. Otherwise the trigger is
    /// counted and, with auto-refresh on, a dispatch is attempted.
    pub fn notify_new_data(&mut self, ctx: &DispatchContext<'_>) -> DispatchOutcome {
        let outcome = if !self.depends_on_input {
            DispatchOutcome::Ignored
        } else {
            let n = self.pending_new_data.fetch_add(1, Ordering::AcqRel) + 1;
            log::trace!("{}/{}: pending_new_data = {n}", ctx.widget, self.layer);
            if ctx.auto_refresh {
                return self.attempt_dispatch(ctx);
            }
            DispatchOutcome::Deferred
        };
        self.trace_skip(ctx, outcome);
        outcome
    }

    /// Requests a render regardless of auto-refresh and input dependency.
    pub fn force_update(&mut self, ctx: &DispatchContext<'_>) -> DispatchOutcome {
        let n = self.pending_forced.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!("{}/{}: pending_forced = {n}", ctx.widget, self.layer);
        self.attempt_dispatch(ctx)
    }

    /// Submits a job if the widget is showing and no job is in flight.
    ///
    /// On success both counters are reset to zero. On failure nothing
    /// changes.
    pub fn attempt_dispatch(&mut self, ctx: &DispatchContext<'_>) -> DispatchOutcome {
        let outcome = self.try_dispatch(ctx);
        self.trace_skip(ctx, outcome);
        outcome
    }

    fn try_dispatch(&mut self, ctx: &DispatchContext<'_>) -> DispatchOutcome {
        if !ctx.showing {
            return DispatchOutcome::Hidden;
        }
        if !self.gate.try_acquire() {
            return DispatchOutcome::InFlight;
        }
        let new_data = self.pending_new_data.swap(0, Ordering::AcqRel);
        let forced = self.pending_forced.swap(0, Ordering::AcqRel);

        let request = RenderRequest {
            accel_factor: self.accel_factor,
            size: ctx.size,
            mouse: ctx.mouse,
        };
        let id = ctx.dispatcher.submit(
            ctx.widget,
            self.layer,
            request,
            ctx.input.cloned(),
            Arc::clone(ctx.renderer),
        );
        // Inline executors may already have delivered the completion, but it
        // is only handled once control returns to the coordinating loop.
        self.in_flight = Some(id);
        self.dispatched += 1;

        log::debug!(
            "{}/{}: dispatched {id} (new_data={new_data}, forced={forced}, accel={})",
            ctx.widget,
            self.layer,
            self.accel_factor
        );
        ctx.dispatcher.tracer().dispatch(&DispatchEvent {
            widget: ctx.widget,
            layer: self.layer,
            job: id,
            accel_factor: self.accel_factor,
            coalesced: new_data + forced,
            at: Instant::now(),
        });
        DispatchOutcome::Dispatched(id)
    }

    /// Handles the completion of this layer's in-flight job.
    ///
    /// Stores the image, releases the gate, updates the acceleration factor
    /// when `realtime` is on and dispatches a follow-up job if work is
    /// pending. Returns the follow-up outcome, or
    /// [`DispatchOutcome::Ignored`] when nothing was owed.
    ///
    /// # Panics
    ///
    /// Panics if no job is in flight or `completion` belongs to a different
    /// job. Both indicate a routing bug.
    pub fn on_job_completed(
        &mut self,
        completion: JobCompletion,
        ctx: &DispatchContext<'_>,
        realtime: bool,
        accel: &mut AccelerationController,
    ) -> DispatchOutcome {
        assert_eq!(
            self.in_flight,
            Some(completion.id),
            "{}/{}: completion does not match the in-flight job",
            ctx.widget,
            self.layer
        );
        assert!(
            self.gate.release(),
            "{}/{}: completion without a held gate",
            ctx.widget,
            self.layer
        );
        self.in_flight = None;
        self.cached = completion.image;

        if realtime {
            self.accel_factor = accel.next_factor(self.layer, completion.elapsed);
        }

        let outcome = if self.has_pending(ctx.auto_refresh) {
            self.attempt_dispatch(ctx)
        } else {
            DispatchOutcome::Ignored
        };

        log::debug!(
            "{}/{}: completed {} in {:?}, accel={}",
            ctx.widget,
            self.layer,
            completion.id,
            completion.elapsed,
            self.accel_factor
        );
        ctx.dispatcher.tracer().completion(&CompletionEvent {
            widget: ctx.widget,
            layer: self.layer,
            job: completion.id,
            elapsed: completion.elapsed,
            accel_factor: self.accel_factor,
            redispatched: outcome.job().is_some(),
            at: Instant::now(),
        });
        outcome
    }

    /// Dispatches if work is pending, otherwise returns
    /// [`DispatchOutcome::Ignored`]. Used when a widget becomes showing or
    /// auto-refresh is switched on.
    pub fn redispatch_pending(&mut self, ctx: &DispatchContext<'_>) -> DispatchOutcome {
        if self.has_pending(ctx.auto_refresh) {
            self.attempt_dispatch(ctx)
        } else {
            DispatchOutcome::Ignored
        }
    }

    fn trace_skip(&self, ctx: &DispatchContext<'_>, outcome: DispatchOutcome) {
        let Some(reason) = outcome.skip_reason() else {
            return;
        };
        log::debug!("{}/{}: skipped ({reason:?})", ctx.widget, self.layer);
        ctx.dispatcher.tracer().skip(&SkipEvent {
            widget: ctx.widget,
            layer: self.layer,
            reason,
            at: Instant::now(),
        });
    }
}
