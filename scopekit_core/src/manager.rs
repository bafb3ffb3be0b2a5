// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry and fan-out for all scope widgets.
//!
//! The [`ScopeManager`] owns every [`ScopeWidget`], delivers frames and audio
//! blocks from the active [`SignalSource`] to them, routes render
//! completions back, and tells the source which signals are needed at all.
//!
//! # Coordinating loop
//!
//! The manager never blocks. An embedder drives it from one thread:
//!
//! ```rust,ignore
//! loop {
//!     // Deliveries from the source.
//!     manager.distribute_frame(frame);
//!     // Completions from the workers.
//!     manager.process_completions();
//!     // Debounced source-demand recomputation.
//!     manager.poll();
//! }
//! ```
//!
//! # Source demand
//!
//! Visibility changes, auto-refresh toggles and source (dis)connections only
//! arm a deadline `now + demand_debounce`. The first [`poll`](ScopeManager::poll)
//! at or after the deadline recomputes `frames` / `audio` demand once for
//! the whole burst and pushes both flags to the source.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use kurbo::Size;

use crate::config::ConfigStore;
use crate::image::{AudioBlock, Image, SignalInput};
use crate::job::{Dispatcher, JobCompletion, JobExecutor, WidgetId};
use crate::layer::Layer;
use crate::pool::WorkerPool;
use crate::renderer::{InputKind, ScopeRenderer};
use crate::trace::{DemandEvent, Tracer};
use crate::widget::{ScopeWidget, WidgetConfig};

/// Default debounce window for source-demand recomputation.
pub const DEMAND_DEBOUNCE: Duration = Duration::from_millis(50);

/// Configuration for the [`ScopeManager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Number of render threads.
    pub workers: usize,
    /// How long demand triggers are collected before recomputing.
    pub demand_debounce: Duration,
}

impl ManagerConfig {
    /// One worker per available core and the default debounce.
    #[must_use]
    pub fn standard() -> Self {
        Self::with_workers(
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        )
    }

    /// `workers` threads (at least one) and the default debounce.
    #[must_use]
    pub const fn with_workers(workers: usize) -> Self {
        Self {
            workers: if workers == 0 { 1 } else { workers },
            demand_debounce: DEMAND_DEBOUNCE,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Errors returned by [`ScopeManager`] operations.
#[derive(Debug)]
pub enum ManagerError {
    /// A widget with this name is already registered.
    DuplicateName(String),
    /// No widget with this name is registered.
    UnknownWidget(String),
    /// No widget with this id is registered.
    UnknownId(WidgetId),
    /// No signal source is connected.
    NoSource,
    /// The worker pool could not be started.
    WorkerSpawn(io::Error),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "a scope named {name:?} is already registered"),
            Self::UnknownWidget(name) => write!(f, "no scope named {name:?} is registered"),
            Self::UnknownId(id) => write!(f, "no scope with id {id} is registered"),
            Self::NoSource => f.write_str("no signal source is connected"),
            Self::WorkerSpawn(err) => write!(f, "failed to start render workers: {err}"),
        }
    }
}

impl core::error::Error for ManagerError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::WorkerSpawn(err) => Some(err),
            _ => None,
        }
    }
}

/// The producer of frames and audio blocks.
///
/// Deliveries enter through [`ScopeManager::distribute_frame`] and
/// [`ScopeManager::distribute_audio`]; this trait is the manager's way of
/// talking back.
pub trait SignalSource {
    /// Whether frames should be delivered continuously.
    fn set_frame_demand(&mut self, wanted: bool);

    /// Whether audio should be delivered continuously.
    fn set_audio_demand(&mut self, wanted: bool);

    /// Asks for one frame to be delivered as soon as possible.
    fn request_frame(&mut self);
}

/// What the source has to deliver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceDemand {
    /// Some visible frame scope has auto-refresh on.
    pub frames: bool,
    /// Some visible audio scope has auto-refresh on.
    pub audio: bool,
}

struct Registration {
    widget: ScopeWidget,
    single_frame_requested: bool,
}

/// Owns every scope widget and connects them to the signal source.
pub struct ScopeManager {
    config: ManagerConfig,
    dispatcher: Dispatcher,
    completions: Receiver<JobCompletion>,
    widgets: BTreeMap<WidgetId, Registration>,
    source: Option<Box<dyn SignalSource + Send>>,
    demand_deadline: Option<Instant>,
    last_demand: Option<SourceDemand>,
}

impl fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeManager")
            .field("config", &self.config)
            .field("widgets", &self.widgets.len())
            .field("has_source", &self.source.is_some())
            .field("last_demand", &self.last_demand)
            .finish_non_exhaustive()
    }
}

impl ScopeManager {
    /// Creates a manager backed by a [`WorkerPool`] of `config.workers`
    /// threads.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::WorkerSpawn`] if the pool cannot be started.
    pub fn new(config: ManagerConfig) -> Result<Self, ManagerError> {
        let pool = WorkerPool::new(config.workers).map_err(ManagerError::WorkerSpawn)?;
        Ok(Self::with_executor(config, Arc::new(pool)))
    }

    /// Creates a manager that submits render jobs to `executor`.
    #[must_use]
    pub fn with_executor(config: ManagerConfig, executor: Arc<dyn JobExecutor>) -> Self {
        let (dispatcher, completions) = Dispatcher::new(executor);
        Self {
            config,
            dispatcher,
            completions,
            widgets: BTreeMap::new(),
            source: None,
            demand_deadline: None,
            last_demand: None,
        }
    }

    /// The manager's configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Submission handle shared by all widgets of this manager.
    ///
    /// Widgets passed to [`register`](Self::register) must be built with a
    /// clone of it, or their completions never come back here.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Tracer shared by all widgets of this manager.
    #[must_use]
    pub const fn tracer(&self) -> &Tracer {
        self.dispatcher.tracer()
    }

    // -- registry ---------------------------------------------------------

    /// Builds a widget around `renderer` and registers it.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::DuplicateName`] if the renderer's name is
    /// taken.
    pub fn create_widget(
        &mut self,
        renderer: Arc<dyn ScopeRenderer>,
        config: WidgetConfig,
    ) -> Result<WidgetId, ManagerError> {
        if self.find(renderer.name()).is_some() {
            return Err(ManagerError::DuplicateName(renderer.name().to_owned()));
        }
        self.register(ScopeWidget::new(renderer, self.dispatcher.clone(), config))
    }

    /// Registers a widget built with [`dispatcher`](Self::dispatcher).
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::DuplicateName`] if a widget of the same name
    /// is registered.
    pub fn register(&mut self, widget: ScopeWidget) -> Result<WidgetId, ManagerError> {
        if self.find(widget.name()).is_some() {
            return Err(ManagerError::DuplicateName(widget.name().to_owned()));
        }
        let id = widget.id();
        log::debug!("registered scope {:?} as {id}", widget.name());
        self.widgets.insert(
            id,
            Registration {
                widget,
                single_frame_requested: false,
            },
        );
        self.recompute_source_demand();
        Ok(id)
    }

    /// Removes a widget and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownId`] if `id` is not registered.
    pub fn unregister(&mut self, id: WidgetId) -> Result<ScopeWidget, ManagerError> {
        let reg = self
            .widgets
            .remove(&id)
            .ok_or(ManagerError::UnknownId(id))?;
        log::debug!("unregistered scope {:?} ({id})", reg.widget.name());
        self.recompute_source_demand();
        Ok(reg.widget)
    }

    /// Number of registered widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Returns `true` if no widget is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Registered widgets in id order.
    pub fn widgets(&self) -> impl Iterator<Item = &ScopeWidget> {
        self.widgets.values().map(|r| &r.widget)
    }

    /// Looks up a widget by id.
    #[must_use]
    pub fn widget(&self, id: WidgetId) -> Option<&ScopeWidget> {
        self.widgets.get(&id).map(|r| &r.widget)
    }

    /// Mutable lookup by id.
    ///
    /// Flag changes made through this reference do not arm a demand
    /// recomputation; prefer the manager's setters.
    pub fn widget_mut(&mut self, id: WidgetId) -> Option<&mut ScopeWidget> {
        self.widgets.get_mut(&id).map(|r| &mut r.widget)
    }

    /// Looks up a widget by name.
    #[must_use]
    pub fn widget_by_name(&self, name: &str) -> Option<&ScopeWidget> {
        self.find(name).and_then(|id| self.widget(id))
    }

    /// Id of the widget called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownWidget`] if there is none.
    pub fn id_of(&self, name: &str) -> Result<WidgetId, ManagerError> {
        self.find(name)
            .ok_or_else(|| ManagerError::UnknownWidget(name.to_owned()))
    }

    fn find(&self, name: &str) -> Option<WidgetId> {
        self.widgets
            .iter()
            .find(|(_, r)| r.widget.name() == name)
            .map(|(id, _)| *id)
    }

    fn registration(&mut self, id: WidgetId) -> Result<&mut Registration, ManagerError> {
        self.widgets.get_mut(&id).ok_or(ManagerError::UnknownId(id))
    }

    // -- widget state -----------------------------------------------------

    /// Shows or hides a widget.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownId`] if `id` is not registered.
    pub fn set_visible(&mut self, id: WidgetId, visible: bool) -> Result<(), ManagerError> {
        if self.registration(id)?.widget.set_visible(visible) {
            self.recompute_source_demand();
        }
        Ok(())
    }

    /// Toggles a widget's auto-refresh.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownId`] if `id` is not registered.
    pub fn set_auto_refresh(&mut self, id: WidgetId, on: bool) -> Result<(), ManagerError> {
        if self.registration(id)?.widget.set_auto_refresh(on) {
            self.recompute_source_demand();
        }
        Ok(())
    }

    /// Toggles a widget's realtime mode.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownId`] if `id` is not registered.
    pub fn set_realtime(&mut self, id: WidgetId, on: bool) -> Result<(), ManagerError> {
        self.registration(id)?.widget.set_realtime(on);
        Ok(())
    }

    /// Resizes a widget.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownId`] if `id` is not registered.
    pub fn resize(&mut self, id: WidgetId, size: Size) -> Result<(), ManagerError> {
        self.registration(id)?.widget.resize(size);
        Ok(())
    }

    // -- fan-out ----------------------------------------------------------

    /// Delivers a frame to every showing frame scope.
    ///
    /// Returns the number of widgets that received it.
    pub fn distribute_frame(&mut self, frame: Arc<Image>) -> usize {
        self.distribute(InputKind::Frame, &SignalInput::Frame(frame))
    }

    /// Delivers an interleaved audio block to every showing audio scope.
    ///
    /// A `samples_per_channel` larger than `samples` holds is clamped to the
    /// complete frames present. Returns the number of widgets that received
    /// the block.
    pub fn distribute_audio(
        &mut self,
        samples: Vec<i16>,
        frequency: u32,
        channels: u16,
        samples_per_channel: usize,
    ) -> usize {
        let mut block = AudioBlock {
            samples,
            frequency,
            channels,
            samples_per_channel,
        };
        let available = block.available_per_channel();
        if available != samples_per_channel {
            log::warn!(
                "audio block claims {samples_per_channel} samples per channel, holds {available}"
            );
            block.samples_per_channel = available;
        }
        self.distribute(InputKind::Audio, &SignalInput::Audio(Arc::new(block)))
    }

    fn distribute(&mut self, kind: InputKind, input: &SignalInput) -> usize {
        let mut delivered = 0;
        for reg in self.widgets.values_mut() {
            let widget = &mut reg.widget;
            if widget.input_kind() != kind || !widget.is_showing() {
                continue;
            }
            if widget.auto_refresh() {
                widget.receive_input(input.clone());
                delivered += 1;
            } else if reg.single_frame_requested {
                reg.single_frame_requested = false;
                widget.receive_input(input.clone());
                widget.force_update(Layer::Scope);
                delivered += 1;
            }
        }
        self.recompute_source_demand();
        delivered
    }

    /// Asks for one fresh delivery to the widget called `name`, even if its
    /// auto-refresh is off.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownWidget`] if there is no such widget,
    /// and [`ManagerError::NoSource`] if no source is connected. In the
    /// latter case the request stays armed for the next delivery.
    pub fn request_single_frame(&mut self, name: &str) -> Result<(), ManagerError> {
        let id = self.id_of(name)?;
        self.registration(id)?.single_frame_requested = true;
        log::debug!("single frame requested for {name:?}");
        let source = self.source.as_mut().ok_or(ManagerError::NoSource)?;
        source.request_frame();
        Ok(())
    }

    // -- source -----------------------------------------------------------

    /// Makes `source` the active signal source, returning the previous one.
    ///
    /// If a frame scope currently accepts frames, the new source is asked
    /// for a frame right away.
    pub fn connect_source(
        &mut self,
        mut source: Box<dyn SignalSource + Send>,
    ) -> Option<Box<dyn SignalSource + Send>> {
        let wants_frame = self
            .widgets()
            .any(|w| w.input_kind() == InputKind::Frame && w.accepts_input());
        if wants_frame {
            source.request_frame();
        }
        log::debug!("signal source connected");
        let previous = self.source.replace(source);
        self.recompute_source_demand();
        previous
    }

    /// Detaches the active source and returns it.
    pub fn disconnect_source(&mut self) -> Option<Box<dyn SignalSource + Send>> {
        let previous = self.source.take();
        if previous.is_some() {
            log::debug!("signal source disconnected");
            self.recompute_source_demand();
        }
        previous
    }

    /// Returns `true` if a source is connected.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    // -- completions ------------------------------------------------------

    /// Routes every finished render to its widget.
    ///
    /// Completions for widgets that were unregistered meanwhile are dropped.
    /// Returns the number of completions handled.
    pub fn process_completions(&mut self) -> usize {
        let mut handled = 0;
        for completion in self.completions.try_iter() {
            match self.widgets.get_mut(&completion.widget) {
                Some(reg) => {
                    reg.widget.on_job_completed(completion);
                    handled += 1;
                }
                None => log::debug!(
                    "dropping completion {} for unregistered {}",
                    completion.id,
                    completion.widget
                ),
            }
        }
        handled
    }

    // -- source demand ----------------------------------------------------

    /// Arms a debounced demand recomputation.
    ///
    /// The deadline is not extended by later triggers, so a steady stream of
    /// triggers still recomputes once per debounce window.
    pub fn recompute_source_demand(&mut self) {
        if self.demand_deadline.is_none() {
            self.demand_deadline = Some(Instant::now() + self.config.demand_debounce);
        }
    }

    /// Pending recomputation deadline, if armed.
    #[must_use]
    pub const fn demand_deadline(&self) -> Option<Instant> {
        self.demand_deadline
    }

    /// Last demand pushed to the source.
    #[must_use]
    pub const fn last_demand(&self) -> Option<SourceDemand> {
        self.last_demand
    }

    /// Runs the armed recomputation if its deadline is at or before `now`.
    pub fn poll_at(&mut self, now: Instant) -> Option<SourceDemand> {
        match self.demand_deadline {
            Some(deadline) if deadline <= now => Some(self.recompute_source_demand_now()),
            _ => None,
        }
    }

    /// [`poll_at`](Self::poll_at) with the current time.
    pub fn poll(&mut self) -> Option<SourceDemand> {
        self.poll_at(Instant::now())
    }

    /// Recomputes and pushes demand immediately, disarming any deadline.
    pub fn recompute_source_demand_now(&mut self) -> SourceDemand {
        self.demand_deadline = None;
        let mut demand = SourceDemand::default();
        for w in self.widgets().filter(|w| w.accepts_input()) {
            match w.input_kind() {
                InputKind::Frame => demand.frames = true,
                InputKind::Audio => demand.audio = true,
            }
        }
        if let Some(source) = self.source.as_mut() {
            source.set_frame_demand(demand.frames);
            source.set_audio_demand(demand.audio);
        }
        log::debug!(
            "source demand: frames={} audio={}",
            demand.frames,
            demand.audio
        );
        self.dispatcher.tracer().demand(&DemandEvent {
            frames: demand.frames,
            audio: demand.audio,
            at: Instant::now(),
        });
        self.last_demand = Some(demand);
        demand
    }

    // -- settings ---------------------------------------------------------

    /// Loads settings for every widget.
    pub fn read_configs(&mut self, store: &dyn ConfigStore) {
        for reg in self.widgets.values_mut() {
            reg.widget.read_config(store);
        }
        self.recompute_source_demand();
    }

    /// Stores settings of every widget.
    pub fn write_configs(&self, store: &mut dyn ConfigStore) {
        for w in self.widgets() {
            w.write_config(store);
        }
    }
}
