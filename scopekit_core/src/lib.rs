// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduling core for real-time measurement scopes.
//!
//! `scopekit_core` keeps a set of scope widgets (vectorscope, histogram,
//! waveform, audio spectrum, ...) up to date with a live video or audio
//! signal without ever blocking the coordinating thread. Each widget paints
//! three independently rendered layers; each layer is rendered off-thread,
//! at most one job at a time, and bursts of triggers are folded into a
//! single follow-up render.
//!
//! # Architecture
//!
//! ```text
//!   SignalSource ──► ScopeManager::distribute_*() ──► ScopeWidget::receive_input()
//!        ▲                                                   │
//!        │ set_*_demand()                                    ▼
//!   ScopeManager::poll()                   LayerScheduler::notify_new_data()
//!                                                            │ (gate acquired)
//!                                                            ▼
//!                        Dispatcher::submit() ──► JobExecutor (WorkerPool)
//!                                                            │
//!                 ┌──────────────────────────────────────────┘
//!                 ▼
//!   JobCompletion ──► ScopeManager::process_completions()
//!                         ──► LayerScheduler::on_job_completed()
//!                         ──► LayerCompositor::compose()
//! ```
//!
//! **[`scheduler`]**: Per-layer single-flight gating and trigger coalescing.
//!
//! **[`accel`]**: Maps render durations to the acceleration factor handed
//! to the next render in realtime mode.
//!
//! **[`gesture`]**: Drag-to-rescale state machine: press, lock to a
//! direction, emit normalised steps.
//!
//! **[`compositor`]**: Paints the cached layer images bottom to top.
//!
//! **[`widget`]**: A [`ScopeWidget`](widget::ScopeWidget) ties a renderer,
//! three schedulers, a compositor and a gesture recogniser together.
//!
//! **[`manager`]**: Widget registry, input fan-out and debounced
//! source-demand recomputation.
//!
//! **[`job`]** / **[`pool`]**: Render jobs, the executor seam and a
//! fixed-size worker pool.
//!
//! **[`renderer`]**: The [`ScopeRenderer`](renderer::ScopeRenderer) trait
//! implemented by concrete scopes.
//!
//! **[`config`]**: Persistence of per-scope flags through a key/value store.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! scheduling instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod accel;
pub mod compositor;
pub mod config;
pub mod gate;
pub mod gesture;
pub mod image;
pub mod job;
pub mod layer;
pub mod manager;
pub mod pool;
pub mod renderer;
pub mod scheduler;
pub mod trace;
pub mod widget;
