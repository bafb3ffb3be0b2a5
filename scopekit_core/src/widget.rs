// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scope widget: three scheduled layers around one renderer.
//!
//! A [`ScopeWidget`] is the unit the [`ScopeManager`](crate::manager::ScopeManager)
//! fans data out to. It owns one [`LayerScheduler`] per layer, the renderer,
//! the visibility/auto-refresh/realtime flags, the latest input snapshot, the
//! drag-gesture state and the compositor.
//!
//! All methods run on the coordinating thread. Renders happen wherever the
//! dispatcher's executor puts them; their completions come back through
//! [`ScopeWidget::on_job_completed`].

use std::sync::Arc;
use std::time::Instant;

use kurbo::{Point, Rect, Size};

use crate::accel::{AccelerationConfig, AccelerationController};
use crate::compositor::LayerCompositor;
use crate::config::{ConfigStore, KEY_AUTO_REFRESH, KEY_REALTIME, group_name, read_parsed};
use crate::gesture::{GestureRescaler, Modifiers, MouseButton, RescaleConfig};
use crate::image::{Image, SignalInput, pixel_dims};
use crate::job::{Dispatcher, JobCompletion, WidgetId};
use crate::layer::{Layer, LayerSet};
use crate::renderer::{InputKind, ScopeKind, ScopeRenderer};
use crate::scheduler::{DispatchContext, DispatchOutcome, LayerScheduler};
use crate::trace::GestureEvent;

/// Per-widget settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WidgetConfig {
    /// Whether new input triggers renders.
    pub auto_refresh: bool,
    /// Whether render latency feeds back into the acceleration factor.
    pub realtime: bool,
    /// Acceleration feedback settings.
    pub acceleration: AccelerationConfig,
    /// Drag-gesture thresholds.
    pub rescale: RescaleConfig,
    /// Surface colour behind the background layer.
    pub clear_color: u32,
}

impl WidgetConfig {
    /// Auto-refresh on, realtime off, default thresholds, transparent surface.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            auto_refresh: true,
            realtime: false,
            acceleration: AccelerationConfig::realtime(),
            rescale: RescaleConfig::standard(),
            clear_color: 0,
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Widget state the layer schedulers read when dispatching.
struct Env {
    id: WidgetId,
    name: String,
    renderer: Arc<dyn ScopeRenderer>,
    dispatcher: Dispatcher,
    size: Size,
    scope_rect: Rect,
    visible: bool,
    auto_refresh: bool,
    realtime: bool,
    input: Option<SignalInput>,
    mouse: Option<Point>,
}

impl Env {
    fn is_showing(&self) -> bool {
        let (w, h) = pixel_dims(self.scope_rect.size());
        self.visible && w > 0 && h > 0
    }

    fn ctx(&self) -> DispatchContext<'_> {
        let origin = self.scope_rect.origin().to_vec2();
        DispatchContext {
            widget: self.id,
            showing: self.is_showing(),
            auto_refresh: self.auto_refresh,
            size: self.scope_rect.size(),
            mouse: self.mouse.map(|p| p - origin),
            input: self.input.as_ref(),
            renderer: &self.renderer,
            dispatcher: &self.dispatcher,
        }
    }
}

/// One scope instance.
pub struct ScopeWidget {
    env: Env,
    layers: LayerSet<LayerScheduler>,
    accel: AccelerationController,
    gesture: GestureRescaler,
    compositor: LayerCompositor,
}

impl core::fmt::Debug for ScopeWidget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopeWidget")
            .field("id", &self.env.id)
            .field("name", &self.env.name)
            .field("visible", &self.env.visible)
            .field("auto_refresh", &self.env.auto_refresh)
            .field("realtime", &self.env.realtime)
            .field("size", &self.env.size)
            .finish_non_exhaustive()
    }
}

impl ScopeWidget {
    /// Creates a hidden, zero-sized widget around `renderer`.
    ///
    /// The widget id is allocated from `dispatcher`, and its name is the
    /// renderer's name.
    pub fn new(
        renderer: Arc<dyn ScopeRenderer>,
        dispatcher: Dispatcher,
        config: WidgetConfig,
    ) -> Self {
        let layers = LayerSet::from_fn(|l| LayerScheduler::new(l, renderer.depends_on_input(l)));
        Self {
            env: Env {
                id: dispatcher.next_widget_id(),
                name: renderer.name().to_owned(),
                renderer,
                dispatcher,
                size: Size::ZERO,
                scope_rect: Rect::ZERO,
                visible: false,
                auto_refresh: config.auto_refresh,
                realtime: config.realtime,
                input: None,
                mouse: None,
            },
            layers,
            accel: AccelerationController::new(config.acceleration),
            gesture: GestureRescaler::new(config.rescale),
            compositor: LayerCompositor::new(config.clear_color),
        }
    }

    // -- identity ---------------------------------------------------------

    /// Widget id.
    #[must_use]
    pub const fn id(&self) -> WidgetId {
        self.env.id
    }

    /// Widget name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.env.name
    }

    /// Scope kind of the renderer.
    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        self.env.renderer.kind()
    }

    /// Signal the widget consumes.
    #[must_use]
    pub fn input_kind(&self) -> InputKind {
        self.kind().input_kind()
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &Arc<dyn ScopeRenderer> {
        &self.env.renderer
    }

    // -- state ------------------------------------------------------------

    /// Whether the widget is shown on screen.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.env.visible
    }

    /// Visible with a non-empty scope rect. Only showing widgets dispatch.
    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.env.is_showing()
    }

    /// Whether new input triggers renders.
    #[must_use]
    pub const fn auto_refresh(&self) -> bool {
        self.env.auto_refresh
    }

    /// Whether realtime acceleration is on.
    #[must_use]
    pub const fn realtime(&self) -> bool {
        self.env.realtime
    }

    /// Whether the widget currently wants a continuous input stream.
    #[must_use]
    pub const fn accepts_input(&self) -> bool {
        self.env.visible && self.env.auto_refresh
    }

    /// Widget size.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.env.size
    }

    /// Area covered by the layers.
    #[must_use]
    pub const fn scope_rect(&self) -> Rect {
        self.env.scope_rect
    }

    /// Latest input snapshot.
    #[must_use]
    pub const fn input(&self) -> Option<&SignalInput> {
        self.env.input.as_ref()
    }

    /// Scheduler of `layer`.
    #[must_use]
    pub fn layer(&self, layer: Layer) -> &LayerScheduler {
        &self.layers[layer]
    }

    /// Cached image of `layer`.
    #[must_use]
    pub fn cached_image(&self, layer: Layer) -> &Image {
        self.layers[layer].cached_image()
    }

    /// Acceleration factor of `layer`.
    #[must_use]
    pub fn accel_factor(&self, layer: Layer) -> u32 {
        self.layers[layer].accel_factor()
    }

    /// Last composed surface.
    #[must_use]
    pub const fn surface(&self) -> &Image {
        self.compositor.surface()
    }

    /// Gesture recogniser state.
    #[must_use]
    pub const fn gesture(&self) -> &GestureRescaler {
        &self.gesture
    }

    // -- triggers ---------------------------------------------------------

    /// Stores a new input snapshot and notifies every layer.
    pub fn receive_input(&mut self, input: SignalInput) -> LayerSet<DispatchOutcome> {
        self.env.input = Some(input);
        let ctx = self.env.ctx();
        let mut out = LayerSet::from_fn(|_| DispatchOutcome::Ignored);
        for (layer, sched) in self.layers.iter_mut() {
            out[layer] = sched.notify_new_data(&ctx);
        }
        out
    }

    /// Forces a render of `layer`.
    pub fn force_update(&mut self, layer: Layer) -> DispatchOutcome {
        let ctx = self.env.ctx();
        self.layers[layer].force_update(&ctx)
    }

    /// Forces a render of every layer.
    pub fn force_update_all(&mut self) -> LayerSet<DispatchOutcome> {
        let ctx = self.env.ctx();
        let mut out = LayerSet::from_fn(|_| DispatchOutcome::Ignored);
        for (layer, sched) in self.layers.iter_mut() {
            out[layer] = sched.force_update(&ctx);
        }
        out
    }

    fn redispatch_pending(&mut self) {
        let ctx = self.env.ctx();
        for (_, sched) in self.layers.iter_mut() {
            sched.redispatch_pending(&ctx);
        }
    }

    // -- flags ------------------------------------------------------------

    /// Shows or hides the widget. Returns `true` if the flag changed.
    ///
    /// Becoming visible dispatches work that piled up while hidden and
    /// repaints the surface from the caches.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        if self.env.visible == visible {
            return false;
        }
        self.env.visible = visible;
        if visible {
            self.compose();
            self.redispatch_pending();
        }
        true
    }

    /// Toggles auto-refresh. Returns `true` if the flag changed.
    ///
    /// Switching it on dispatches layers with deferred new data.
    pub fn set_auto_refresh(&mut self, auto_refresh: bool) -> bool {
        if self.env.auto_refresh == auto_refresh {
            return false;
        }
        self.env.auto_refresh = auto_refresh;
        if auto_refresh {
            self.redispatch_pending();
        }
        true
    }

    /// Toggles realtime mode. Switching it off resets every factor to 1.
    pub fn set_realtime(&mut self, realtime: bool) {
        self.env.realtime = realtime;
        if !realtime {
            for (_, sched) in self.layers.iter_mut() {
                sched.reset_accel();
            }
            self.accel.reset();
        }
    }

    /// Applies a new widget size.
    ///
    /// Recomputes the scope rect, reallocates the surface and forces every
    /// layer.
    pub fn resize(&mut self, size: Size) {
        self.env.size = size;
        self.env.scope_rect = self.env.renderer.scope_rect(size);
        self.compositor.resize(size);
        self.force_update_all();
        self.compose();
    }

    // -- pointer ----------------------------------------------------------

    /// Handles a button press at `at` (widget coordinates).
    pub fn mouse_down(&mut self, at: Point, button: MouseButton, modifiers: Modifiers) {
        self.env.mouse = Some(at);
        self.gesture.press(at, button, modifiers);
    }

    /// Handles pointer motion.
    ///
    /// During a drag, locked steps go to the renderer; if it changes a
    /// parameter, HUD and Scope are forced. Outside a drag the HUD follows
    /// the pointer for renderers that track it.
    pub fn mouse_move(&mut self, to: Point) {
        self.env.mouse = Some(to);
        if self.gesture.is_active() {
            let Some(step) = self.gesture.drag(to) else {
                return;
            };
            let handled = self.env.renderer.handle_drag(&step);
            self.env.dispatcher.tracer().gesture(&GestureEvent {
                widget: self.env.id,
                direction: step.direction,
                displacement: step.displacement,
                handled,
                at: Instant::now(),
            });
            if handled {
                self.force_update(Layer::Hud);
                self.force_update(Layer::Scope);
            }
        } else if self.env.renderer.tracks_mouse() {
            self.force_update(Layer::Hud);
        }
    }

    /// Handles a button release, ending any gesture and forcing every layer.
    pub fn mouse_up(&mut self) {
        if self.gesture.release() {
            log::debug!("{}: gesture finished", self.env.id);
        }
        self.force_update_all();
    }

    /// Handles the pointer leaving the widget.
    pub fn mouse_leave(&mut self) {
        self.env.mouse = None;
        if self.env.renderer.tracks_mouse() {
            self.force_update(Layer::Hud);
        }
    }

    // -- completions ------------------------------------------------------

    /// Handles a finished render of this widget and recomposes the surface.
    ///
    /// # Panics
    ///
    /// Panics if the completion does not belong to the layer's in-flight
    /// job.
    pub fn on_job_completed(&mut self, completion: JobCompletion) -> DispatchOutcome {
        let layer = completion.layer;
        let ctx = self.env.ctx();
        let outcome =
            self.layers[layer].on_job_completed(completion, &ctx, self.env.realtime, &mut self.accel);
        self.compose();
        outcome
    }

    fn compose(&mut self) {
        self.compositor.compose(
            self.env.scope_rect,
            self.layers.iter().map(|(l, s)| (l, s.cached_image())),
        );
    }

    // -- settings ---------------------------------------------------------

    /// Loads flags and renderer settings from the widget's group.
    ///
    /// Returns `true` if auto-refresh changed.
    pub fn read_config(&mut self, store: &dyn ConfigStore) -> bool {
        let group = group_name(&self.env.name);
        let auto_refresh = read_parsed(store, &group, KEY_AUTO_REFRESH, true);
        let realtime = read_parsed(store, &group, KEY_REALTIME, false);
        self.env.renderer.read_config(store, &group);
        self.set_realtime(realtime);
        self.set_auto_refresh(auto_refresh)
    }

    /// Stores flags and renderer settings in the widget's group.
    pub fn write_config(&self, store: &mut dyn ConfigStore) {
        let group = group_name(&self.env.name);
        store.write(&group, KEY_AUTO_REFRESH, self.env.auto_refresh.to_string());
        store.write(&group, KEY_REALTIME, self.env.realtime.to_string());
        self.env.renderer.write_config(store, &group);
    }
}
