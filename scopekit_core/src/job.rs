// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render jobs and their submission.
//!
//! A [`RenderJob`] is one layer render: it captures everything the worker
//! needs (renderer, request, input snapshot) plus the channel its
//! [`JobCompletion`] goes back on. Workers never touch scheduler state; the
//! completion is routed to the owning widget on the coordinating thread.
//!
//! Submission goes through the [`JobExecutor`] trait so the same scheduling
//! code runs on a [`WorkerPool`](crate::pool::WorkerPool), inline on the
//! calling thread ([`InlineExecutor`]), or under manual control in tests
//! ([`ManualExecutor`]).

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::image::{Image, SignalInput, pixel_dims};
use crate::layer::Layer;
use crate::renderer::{RenderRequest, ScopeRenderer, render_layer};
use crate::trace::Tracer;

/// Identifies a widget within one [`Dispatcher`] family.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(pub u32);

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetId({})", self.0)
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Monotonic id of a submitted render job.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a finished render job.
#[derive(Clone, Debug)]
pub struct JobCompletion {
    /// Id of the finished job.
    pub id: JobId,
    /// Widget that submitted it.
    pub widget: WidgetId,
    /// Rendered layer.
    pub layer: Layer,
    /// Rendered image.
    pub image: Image,
    /// Wall-clock time spent rendering.
    pub elapsed: Duration,
    /// Acceleration factor the job ran with.
    pub accel_factor: u32,
}

/// One layer render, ready to run on any thread.
pub struct RenderJob {
    id: JobId,
    widget: WidgetId,
    layer: Layer,
    request: RenderRequest,
    input: Option<SignalInput>,
    renderer: Arc<dyn ScopeRenderer>,
    reply: Sender<JobCompletion>,
}

impl fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderJob")
            .field("id", &self.id)
            .field("widget", &self.widget)
            .field("layer", &self.layer)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl RenderJob {
    /// Job id.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Submitting widget.
    #[must_use]
    pub const fn widget(&self) -> WidgetId {
        self.widget
    }

    /// Layer to render.
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Render parameters.
    #[must_use]
    pub const fn request(&self) -> &RenderRequest {
        &self.request
    }

    /// Renders the layer and sends the completion.
    ///
    /// A zero-area request produces an empty image without calling the
    /// renderer. If the completion receiver is gone the result is dropped.
    pub fn run(self) {
        let start = Instant::now();
        let (w, h) = pixel_dims(self.request.size);
        let image = if w == 0 || h == 0 {
            Image::empty()
        } else {
            render_layer(
                &*self.renderer,
                self.layer,
                &self.request,
                self.input.as_ref(),
            )
        };
        let completion = JobCompletion {
            id: self.id,
            widget: self.widget,
            layer: self.layer,
            image,
            elapsed: start.elapsed(),
            accel_factor: self.request.accel_factor,
        };
        if self.reply.send(completion).is_err() {
            log::debug!(
                "dropping completion {} for {}/{}: receiver closed",
                self.id,
                self.widget,
                self.layer
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

/// Runs render jobs somewhere.
///
/// The worker pool, the inline executor and test doubles implement this,
/// so scheduling logic is independent of threading.
pub trait JobExecutor: Send + Sync {
    /// Takes ownership of `job` and eventually runs it.
    fn execute(&self, job: RenderJob);
}

/// Runs every job immediately on the submitting thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl JobExecutor for InlineExecutor {
    fn execute(&self, job: RenderJob) {
        job.run();
    }
}

/// Holds jobs until the caller runs them.
///
/// Useful for deterministic tests of in-flight behaviour.
#[derive(Debug, Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<RenderJob>>,
}

impl ManualExecutor {
    /// Creates an empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning must not drop jobs; a dropped job keeps its layer in flight.
    fn queue(&self) -> MutexGuard<'_, VecDeque<RenderJob>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of queued jobs.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    /// Layers of the queued jobs, oldest first.
    #[must_use]
    pub fn pending_jobs(&self) -> Vec<(WidgetId, Layer)> {
        self.queue().iter().map(|j| (j.widget, j.layer)).collect()
    }

    /// Runs the oldest queued job. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        let job = self.queue().pop_front();
        match job {
            Some(job) => {
                job.run();
                true
            }
            None => false,
        }
    }

    /// Runs every queued job, returning how many ran.
    ///
    /// Jobs submitted while draining are left for the next call.
    pub fn run_all(&self) -> usize {
        let jobs: Vec<_> = self.queue().drain(..).collect();
        let n = jobs.len();
        for job in jobs {
            job.run();
        }
        n
    }
}

impl JobExecutor for ManualExecutor {
    fn execute(&self, job: RenderJob) {
        self.queue().push_back(job);
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Shared submission handle for a family of widgets.
///
/// Allocates widget and job ids, wraps requests into [`RenderJob`]s wired to
/// the family's completion channel and hands them to the executor. Cloning
/// is cheap; all clones share ids, executor, channel and tracer.
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn JobExecutor>,
    completions: Sender<JobCompletion>,
    next_widget: Arc<AtomicU32>,
    next_job: Arc<AtomicU64>,
    tracer: Tracer,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("next_job", &self.next_job.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher and the receiving end of its completion channel.
    #[must_use]
    pub fn new(executor: Arc<dyn JobExecutor>) -> (Self, Receiver<JobCompletion>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let dispatcher = Self {
            executor,
            completions: tx,
            next_widget: Arc::new(AtomicU32::new(0)),
            next_job: Arc::new(AtomicU64::new(0)),
            tracer: Tracer::none(),
        };
        (dispatcher, rx)
    }

    /// Returns the shared tracer.
    #[must_use]
    pub const fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Allocates a fresh widget id.
    pub fn next_widget_id(&self) -> WidgetId {
        WidgetId(self.next_widget.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a layer render into a job and submits it.
    pub fn submit(
        &self,
        widget: WidgetId,
        layer: Layer,
        request: RenderRequest,
        input: Option<SignalInput>,
        renderer: Arc<dyn ScopeRenderer>,
    ) -> JobId {
        let id = JobId(self.next_job.fetch_add(1, Ordering::Relaxed));
        self.executor.execute(RenderJob {
            id,
            widget,
            layer,
            request,
            input,
            renderer,
            reply: self.completions.clone(),
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ScopeKind;
    use kurbo::Size;

    struct Solid;

    impl ScopeRenderer for Solid {
        fn kind(&self) -> ScopeKind {
            ScopeKind::Histogram
        }
        fn depends_on_input(&self, layer: Layer) -> bool {
            layer == Layer::Scope
        }
        fn render_hud(&self, r: &RenderRequest) -> Image {
            Image::with_size(r.size)
        }
        fn render_scope(&self, r: &RenderRequest, _: Option<&SignalInput>) -> Image {
            Image::with_size(r.size)
        }
        fn render_background(&self, r: &RenderRequest) -> Image {
            Image::with_size(r.size)
        }
    }

    #[test]
    fn inline_executor_completes_immediately() {
        let (d, rx) = Dispatcher::new(Arc::new(InlineExecutor));
        let w = d.next_widget_id();
        let mut req = RenderRequest::new(Size::new(8.0, 4.0));
        req.accel_factor = 3;
        let id = d.submit(w, Layer::Scope, req, None, Arc::new(Solid));
        let c = rx.try_recv().unwrap();
        assert_eq!(c.id, id);
        assert_eq!(c.widget, w);
        assert_eq!(c.accel_factor, 3);
        assert_eq!((c.image.width(), c.image.height()), (8, 4));
    }

    #[test]
    fn zero_area_short_circuits_to_empty_image() {
        struct Panicky;
        impl ScopeRenderer for Panicky {
            fn kind(&self) -> ScopeKind {
                ScopeKind::Waveform
            }
            fn depends_on_input(&self, _: Layer) -> bool {
                false
            }
            fn render_hud(&self, _: &RenderRequest) -> Image {
                unreachable!("renderer must not be called for an empty rect")
            }
            fn render_scope(&self, _: &RenderRequest, _: Option<&SignalInput>) -> Image {
                unreachable!("renderer must not be called for an empty rect")
            }
            fn render_background(&self, _: &RenderRequest) -> Image {
                unreachable!("renderer must not be called for an empty rect")
            }
        }

        let (d, rx) = Dispatcher::new(Arc::new(InlineExecutor));
        let req = RenderRequest::new(Size::new(0.0, 10.0));
        d.submit(WidgetId(0), Layer::Hud, req, None, Arc::new(Panicky));
        assert!(rx.try_recv().unwrap().image.is_empty());
    }

    #[test]
    fn manual_executor_defers_until_run() {
        let exec = Arc::new(ManualExecutor::new());
        let (d, rx) = Dispatcher::new(exec.clone());
        let req = RenderRequest::new(Size::new(2.0, 2.0));
        let a = d.submit(WidgetId(1), Layer::Background, req, None, Arc::new(Solid));
        let b = d.submit(WidgetId(1), Layer::Hud, req, None, Arc::new(Solid));
        assert!(a < b, "job ids are monotonic");
        assert_eq!(exec.pending(), 2);
        assert!(rx.try_recv().is_err());

        assert!(exec.run_next());
        assert_eq!(rx.try_recv().unwrap().id, a);
        assert_eq!(exec.run_all(), 1);
        assert_eq!(rx.try_recv().unwrap().id, b);
        assert!(!exec.run_next());
    }

    #[test]
    fn manual_executor_survives_a_poisoned_queue() {
        let exec = Arc::new(ManualExecutor::new());
        let holder = exec.clone();
        let poisoned = std::thread::spawn(move || {
            let _queue = holder.queue.lock().unwrap();
            panic!("panic while holding the queue");
        })
        .join();
        assert!(poisoned.is_err());
        assert!(exec.queue.is_poisoned());

        let (d, rx) = Dispatcher::new(exec.clone());
        let req = RenderRequest::new(Size::new(2.0, 2.0));
        let id = d.submit(WidgetId(3), Layer::Scope, req, None, Arc::new(Solid));
        assert_eq!(exec.pending_jobs(), vec![(WidgetId(3), Layer::Scope)]);
        assert_eq!(exec.run_all(), 1);
        assert_eq!(rx.try_recv().unwrap().id, id);
    }

    #[test]
    fn widget_ids_are_shared_between_clones() {
        let (d, _rx) = Dispatcher::new(Arc::new(InlineExecutor));
        let d2 = d.clone();
        assert_eq!(d.next_widget_id(), WidgetId(0));
        assert_eq!(d2.next_widget_id(), WidgetId(1));
    }
}
