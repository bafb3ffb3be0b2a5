// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for scopekit
//! diagnostics.
//!
//! This crate provides [`TraceSink`](scopekit_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! Sinks are installed on a manager's tracer behind an `Arc<Mutex<_>>`:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use scopekit_core::manager::{ManagerConfig, ScopeManager};
//! use scopekit_core::trace::SharedSink;
//! use scopekit_debug::recorder::RecorderSink;
//!
//! let manager = ScopeManager::new(ManagerConfig::with_workers(1)).unwrap();
//! let recorder = Arc::new(Mutex::new(RecorderSink::new()));
//! let shared: SharedSink = recorder.clone();
//! manager.tracer().install(shared);
//! ```

pub mod chrome;
pub mod pretty;
pub mod recorder;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use kurbo::Size;
    use scopekit_core::image::{Image, pack_argb};
    use scopekit_core::job::InlineExecutor;
    use scopekit_core::layer::Layer;
    use scopekit_core::manager::{ManagerConfig, ScopeManager};
    use scopekit_core::renderer::ScopeKind;
    use scopekit_core::trace::SharedSink;
    use scopekit_core::widget::WidgetConfig;

    use crate::recorder::{RecordedEvent, RecorderSink, decode};

    #[test]
    fn manager_activity_is_recorded() {
        let mut manager =
            ScopeManager::with_executor(ManagerConfig::with_workers(1), Arc::new(InlineExecutor));
        let recorder = Arc::new(Mutex::new(RecorderSink::new()));
        let shared: SharedSink = recorder.clone();
        manager.tracer().install(shared);

        for renderer in scopekit_scopes::standard_scopes() {
            manager
                .create_widget(renderer, WidgetConfig::standard())
                .unwrap();
        }
        let histogram = manager
            .widgets()
            .find(|w| w.kind() == ScopeKind::Histogram)
            .map(|w| w.id())
            .unwrap();
        manager.resize(histogram, Size::new(64.0, 32.0)).unwrap();
        manager.set_visible(histogram, true).unwrap();
        manager.process_completions();

        let frame = Arc::new(Image::filled(4, 4, pack_argb(255, 200, 100, 50)));
        assert_eq!(manager.distribute_frame(frame), 1);
        manager.process_completions();
        let demand = manager.recompute_source_demand_now();
        assert!(demand.frames);
        assert!(!demand.audio);

        let bytes = recorder.lock().unwrap().as_bytes().to_vec();
        let events: Vec<_> = decode(&bytes).collect();
        let scope_dispatches = events
            .iter()
            .filter(|e| {
                matches!(e, RecordedEvent::Dispatch { widget, layer: Layer::Scope, .. }
                    if *widget == histogram)
            })
            .count();
        let completions = events
            .iter()
            .filter(|e| matches!(e, RecordedEvent::Completion { .. }))
            .count();
        assert!(scope_dispatches >= 1, "{events:?}");
        assert!(completions >= 1, "{events:?}");
        assert!(matches!(
            events.last(),
            Some(RecordedEvent::Demand {
                frames: true,
                audio: false,
                ..
            })
        ));

        let mut json = Vec::new();
        crate::chrome::export(&bytes, &mut json).unwrap();
        assert!(!json.is_empty());
    }
}
