// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-size worker pool.
//!
//! Jobs are fed through an unbounded `crossbeam-channel` queue to a fixed set
//! of named threads. Each job runs to completion and reports back on its own
//! completion channel. Dropping the pool closes the queue; workers finish the
//! jobs already queued and exit, and the drop joins them.
//!
//! A job whose renderer panics is logged and reports nothing back, so its
//! layer stays in flight. The worker carries on with the next job.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;

use crate::job::{JobExecutor, RenderJob};

/// A fixed set of render threads.
pub struct WorkerPool {
    queue: Option<Sender<RenderJob>>,
    threads: Vec<JoinHandle<()>>,
}

impl core::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads.len())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Spawns `threads` workers (at least one).
    ///
    /// # Errors
    ///
    /// Returns the OS error if a thread cannot be spawned. Workers spawned
    /// before the failure are shut down.
    pub fn new(threads: usize) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<RenderJob>();
        let mut pool = Self {
            queue: Some(tx),
            threads: Vec::with_capacity(threads.max(1)),
        };
        for i in 0..threads.max(1) {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("scopekit-worker-{i}"))
                .spawn(move || {
                    for job in rx.iter() {
                        run_guarded(job);
                    }
                })?;
            pool.threads.push(handle);
        }
        log::debug!("worker pool started with {} threads", pool.threads.len());
        Ok(pool)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Always `false`; a pool has at least one thread.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

fn run_guarded(job: RenderJob) {
    let (id, widget, layer) = (job.id(), job.widget(), job.layer());
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
        log::error!(
            "render job {id} for {widget}/{layer} panicked: {}",
            panic_message(&*payload)
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

impl JobExecutor for WorkerPool {
    fn execute(&self, job: RenderJob) {
        let Some(queue) = &self.queue else {
            return;
        };
        if let Err(err) = queue.send(job) {
            let job = err.into_inner();
            log::warn!(
                "worker queue closed, dropping job {} for {}/{}",
                job.id(),
                job.widget(),
                job.layer()
            );
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue ends each worker's receive loop.
        self.queue = None;
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::warn!("a scopekit worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kurbo::Size;

    use super::*;
    use crate::image::{Image, SignalInput};
    use crate::job::{Dispatcher, WidgetId};
    use crate::layer::Layer;
    use crate::renderer::{RenderRequest, ScopeKind, ScopeRenderer};

    struct Slow(Duration);

    /// Panics on every scope render of widget 0.
    struct FailsFirstWidget;

    impl ScopeRenderer for FailsFirstWidget {
        fn kind(&self) -> ScopeKind {
            ScopeKind::Histogram
        }
        fn depends_on_input(&self, _: Layer) -> bool {
            true
        }
        fn render_hud(&self, r: &RenderRequest) -> Image {
            Image::with_size(r.size)
        }
        fn render_scope(&self, r: &RenderRequest, _: Option<&SignalInput>) -> Image {
            if r.size.width < 2.0 {
                panic!("scope render failed");
            }
            Image::with_size(r.size)
        }
        fn render_background(&self, r: &RenderRequest) -> Image {
            Image::with_size(r.size)
        }
    }

    impl ScopeRenderer for Slow {
        fn kind(&self) -> ScopeKind {
            ScopeKind::Vectorscope
        }
        fn depends_on_input(&self, _: Layer) -> bool {
            true
        }
        fn render_hud(&self, r: &RenderRequest) -> Image {
            thread::sleep(self.0);
            Image::with_size(r.size)
        }
        fn render_scope(&self, r: &RenderRequest, _: Option<&SignalInput>) -> Image {
            thread::sleep(self.0);
            Image::with_size(r.size)
        }
        fn render_background(&self, r: &RenderRequest) -> Image {
            thread::sleep(self.0);
            Image::with_size(r.size)
        }
    }

    #[test]
    fn zero_threads_rounds_up_to_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn jobs_run_on_workers_and_report_elapsed() {
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let (d, rx) = Dispatcher::new(pool.clone());
        let renderer: Arc<dyn ScopeRenderer> = Arc::new(Slow(Duration::from_millis(5)));
        let req = RenderRequest::new(Size::new(4.0, 4.0));
        for layer in Layer::ALL {
            d.submit(WidgetId(0), layer, req, None, renderer.clone());
        }
        let mut seen = Vec::new();
        for _ in 0..3 {
            let c = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(c.elapsed >= Duration::from_millis(5), "elapsed covers the render");
            seen.push(c.layer);
        }
        seen.sort();
        assert_eq!(seen, Layer::ALL.to_vec());
    }

    #[test]
    fn panicking_render_keeps_the_worker_alive() {
        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let (d, rx) = Dispatcher::new(pool.clone());
        let renderer: Arc<dyn ScopeRenderer> = Arc::new(FailsFirstWidget);
        let failing = RenderRequest::new(Size::new(1.0, 1.0));
        let healthy = RenderRequest::new(Size::new(4.0, 4.0));
        d.submit(WidgetId(0), Layer::Scope, failing, None, renderer.clone());
        let id = d.submit(WidgetId(1), Layer::Scope, healthy, None, renderer.clone());

        let c = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!((c.id, c.widget), (id, WidgetId(1)));
        assert!(rx.try_recv().is_err(), "the failed render reports nothing");

        // The same worker keeps serving later jobs.
        d.submit(WidgetId(1), Layer::Hud, healthy, None, renderer);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap().layer,
            Layer::Hud
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn panic_payloads_are_described() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("lost")), "lost");
        assert_eq!(panic_message(&7_u8), "unknown panic");
    }

    #[test]
    fn drop_drains_queue_and_joins() {
        let pool = WorkerPool::new(1).unwrap();
        let pool: Arc<dyn JobExecutor> = Arc::new(pool);
        let (d, rx) = Dispatcher::new(pool);
        let renderer: Arc<dyn ScopeRenderer> = Arc::new(Slow(Duration::from_millis(1)));
        let req = RenderRequest::new(Size::new(1.0, 1.0));
        d.submit(WidgetId(0), Layer::Hud, req, None, renderer.clone());
        d.submit(WidgetId(0), Layer::Scope, req, None, renderer);
        // Dropping the last executor handle closes the queue and joins.
        drop(d);
        assert_eq!(rx.iter().count(), 2);
    }
}
